//! Change notifications for remote tables.
//!
//! A `ChangeEvent` says that *something* changed in a table. Consumers never
//! apply it as a patch: they treat it as a signal to drop cached state and
//! read the table again. Delivery is at-least-once and unordered across rows.

use crate::{RecordId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new event ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What kind of write produced the notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        };
        f.write_str(s)
    }
}

/// A single change notification for a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Unique event ID.
    pub id: EventId,
    /// The table the change happened in.
    pub table: String,
    /// Insert, update or delete.
    pub kind: ChangeKind,
    /// The affected row, when the backend reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<RecordId>,
    /// When the notification was produced.
    pub at: Timestamp,
}

impl ChangeEvent {
    /// Creates a notification stamped with the current time.
    #[must_use]
    pub fn new(table: impl Into<String>, kind: ChangeKind, record_id: Option<RecordId>) -> Self {
        Self {
            id: EventId::new(),
            table: table.into(),
            kind,
            record_id,
            at: Timestamp::now(),
        }
    }

    /// Serializes the event to JSON.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserializes an event from JSON.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

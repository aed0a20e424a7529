//! In-memory [`RemoteStore`] with change notifications and fault injection.
//!
//! Every write publishes a [`ChangeEvent`] to the table's listeners, the way
//! a hosted backend's realtime channel would. Tests use [`MemoryStore::fail_next`]
//! and [`MemoryStore::set_offline`] to exercise rollback and error paths, and
//! the per-table operation counters to assert cache behavior.

use crate::error::{StoreError, StoreResult};
use crate::feed::{lock, ChangeFeed, Channel, Listener};
use crate::query::{Query, Row};
use crate::store::RemoteStore;
use async_trait::async_trait;
use folio_types::{ChangeEvent, ChangeKind, RecordId, Timestamp};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// A store operation, for counting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Select,
    Insert,
    Update,
    Delete,
    Subscribe,
}

/// Tables held in memory, keyed by name. Rows keep insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, Vec<Row>>>,
    feed: ChangeFeed,
    offline: AtomicBool,
    failures: Mutex<HashMap<Op, usize>>,
    calls: Mutex<HashMap<(String, Op), usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts rows directly, without notifications. Missing ids and
    /// timestamps are filled in.
    pub fn seed(&self, table: &str, rows: impl IntoIterator<Item = Row>) {
        let mut tables = lock(&self.tables);
        let stored = tables.entry(table.to_string()).or_default();
        for mut row in rows {
            fill_server_columns(&mut row);
            stored.push(row);
        }
    }

    /// Every row of `table`, including rows hidden by soft deletion.
    pub fn rows(&self, table: &str) -> Vec<Row> {
        lock(&self.tables).get(table).cloned().unwrap_or_default()
    }

    /// The raw row with `id`, if any.
    pub fn row(&self, table: &str, id: &str) -> Option<Row> {
        lock(&self.tables)
            .get(table)?
            .iter()
            .find(|r| row_id(r) == Some(id))
            .cloned()
    }

    /// While offline every operation fails with [`StoreError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Makes the next call of `op` (on any table) fail once.
    pub fn fail_next(&self, op: Op) {
        *lock(&self.failures).entry(op).or_default() += 1;
    }

    /// How many times `op` was attempted on `table`, including failed attempts.
    pub fn op_count(&self, table: &str, op: Op) -> usize {
        lock(&self.calls)
            .get(&(table.to_string(), op))
            .copied()
            .unwrap_or(0)
    }

    pub fn select_count(&self, table: &str) -> usize {
        self.op_count(table, Op::Select)
    }

    /// Number of open change channels on `table`.
    pub fn open_channels(&self, table: &str) -> usize {
        self.feed.listener_count(table)
    }

    /// Publishes a notification as if another client had written `table`.
    pub fn notify(&self, table: &str, kind: ChangeKind, id: Option<&str>) {
        let record_id = id.and_then(|id| RecordId::new(id).ok());
        self.feed.publish(&ChangeEvent::new(table, kind, record_id));
    }

    fn begin(&self, table: &str, op: Op) -> StoreResult<()> {
        *lock(&self.calls).entry((table.to_string(), op)).or_default() += 1;

        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store is offline".into()));
        }
        let mut failures = lock(&self.failures);
        if let Some(pending) = failures.get_mut(&op).filter(|n| **n > 0) {
            *pending -= 1;
            debug!("Injected {:?} failure on {}", op, table);
            return Err(StoreError::Unavailable(format!("injected {op:?} failure")));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn select(&self, table: &str, query: &Query) -> StoreResult<Vec<Row>> {
        self.begin(table, Op::Select)?;
        let mut rows: Vec<Row> = lock(&self.tables)
            .get(table)
            .map(|rows| rows.iter().filter(|r| query.matches(r)).cloned().collect())
            .unwrap_or_default();
        query.sort(&mut rows);
        Ok(rows)
    }

    async fn insert(&self, table: &str, mut row: Row) -> StoreResult<Row> {
        self.begin(table, Op::Insert)?;
        fill_server_columns(&mut row);
        let id = row_id(&row).map(str::to_string);
        lock(&self.tables)
            .entry(table.to_string())
            .or_default()
            .push(row.clone());

        self.notify(table, ChangeKind::Insert, id.as_deref());
        Ok(row)
    }

    async fn update(&self, table: &str, id: &str, patch: Row) -> StoreResult<Row> {
        self.begin(table, Op::Update)?;
        let updated = {
            let mut tables = lock(&self.tables);
            let row = tables
                .get_mut(table)
                .and_then(|rows| rows.iter_mut().find(|r| row_id(r) == Some(id)))
                .ok_or_else(|| StoreError::not_found(table, id))?;
            let stamped = patch.get("updated_at").is_some_and(|v| !v.is_null());
            for (key, value) in patch {
                if key != "id" && key != "created_at" {
                    row.insert(key, value);
                }
            }
            if !stamped {
                row.insert("updated_at".into(), now());
            }
            row.clone()
        };

        self.notify(table, ChangeKind::Update, Some(id));
        Ok(updated)
    }

    async fn delete(&self, table: &str, id: &str) -> StoreResult<bool> {
        self.begin(table, Op::Delete)?;
        let removed = {
            let mut tables = lock(&self.tables);
            match tables.get_mut(table) {
                Some(rows) => {
                    let before = rows.len();
                    rows.retain(|r| row_id(r) != Some(id));
                    rows.len() != before
                }
                None => false,
            }
        };

        if removed {
            self.notify(table, ChangeKind::Delete, Some(id));
        }
        Ok(removed)
    }

    fn subscribe(&self, table: &str, listener: Listener) -> StoreResult<Channel> {
        self.begin(table, Op::Subscribe)?;
        Ok(self.feed.listen(table, listener))
    }
}

fn row_id(row: &Row) -> Option<&str> {
    row.get("id").and_then(Value::as_str)
}

fn now() -> Value {
    Value::String(Timestamp::now().to_rfc3339())
}

fn fill_server_columns(row: &mut Row) {
    let needs_id = row_id(row).is_none_or(|id| id.trim().is_empty());
    if needs_id {
        row.insert("id".into(), Value::String(RecordId::generate().into_inner()));
    }
    let stamp = now();
    for column in ["created_at", "updated_at"] {
        if row.get(column).is_none_or(Value::is_null) {
            row.insert(column.into(), stamp.clone());
        }
    }
}

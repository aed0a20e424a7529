//! Core type definitions for Folio.
//!
//! This crate defines the entity-agnostic types shared by every layer of the
//! content sync core:
//! - Record identifiers (server-assigned strings, UUID v7 when generated locally)
//! - Server timestamps (`created_at` / `updated_at`)
//! - Table change notifications delivered by the remote store
//!
//! Entity shapes (hero, blog posts, skills, ...) live in `folio-model`.

mod event;
mod ids;
mod timestamp;

pub use event::{ChangeEvent, ChangeKind, EventId};
pub use ids::RecordId;
pub use timestamp::Timestamp;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid record id: {0:?}")]
    InvalidId(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

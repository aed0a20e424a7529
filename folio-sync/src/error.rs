//! Error types for the sync layer.

use folio_model::ValidationError;
use folio_store::StoreError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The draft or patch was rejected before any remote call.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The remote store failed.
    #[error("remote store error: {0}")]
    Remote(StoreError),

    /// A mutation targeted an id that does not exist.
    #[error("{table} record not found: {id}")]
    NotFound { table: String, id: String },

    /// A row returned by the store could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The entity does not support the operation (reordering a singleton, ...).
    #[error("{operation} is not supported for {table}")]
    Unsupported {
        table: &'static str,
        operation: &'static str,
    },

    /// A push channel needs a running tokio runtime.
    #[error("no tokio runtime available")]
    NoRuntime,
}

impl SyncError {
    pub fn not_found(table: &str, id: &str) -> Self {
        Self::NotFound {
            table: table.to_string(),
            id: id.to_string(),
        }
    }

    /// Whether the error came from the remote store.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}

impl From<StoreError> for SyncError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { table, id } => Self::NotFound { table, id },
            other => Self::Remote(other),
        }
    }
}

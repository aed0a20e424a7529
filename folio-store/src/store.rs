use crate::error::StoreResult;
use crate::feed::{Channel, Listener};
use crate::query::{Query, Row};
use async_trait::async_trait;

/// A remote relational store holding one table per entity type.
///
/// Rows are JSON objects keyed by column name. Every row has a string `id`
/// column.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Human-readable backend name, for logs.
    fn name(&self) -> &'static str;

    /// Reads every row of `table` matching `query`, in the query's order.
    async fn select(&self, table: &str, query: &Query) -> StoreResult<Vec<Row>>;

    /// Inserts a row and returns it with server-assigned columns filled in.
    async fn insert(&self, table: &str, row: Row) -> StoreResult<Row>;

    /// Applies a partial update to the row with `id` and returns the result.
    /// Fails with [`crate::StoreError::NotFound`] when no row matched.
    async fn update(&self, table: &str, id: &str, patch: Row) -> StoreResult<Row>;

    /// Removes the row with `id`. Returns whether a row was removed.
    async fn delete(&self, table: &str, id: &str) -> StoreResult<bool>;

    /// Registers `listener` for change notifications on `table`.
    ///
    /// Delivery is at-least-once and best effort. The listener stays attached
    /// until the returned [`Channel`] is closed or dropped.
    fn subscribe(&self, table: &str, listener: Listener) -> StoreResult<Channel>;
}

//! Remote store capability for Folio.
//!
//! The sync layer never talks to a database directly. It depends on the
//! [`RemoteStore`] trait: `select / insert / update / delete` over JSON rows
//! plus `subscribe`, which registers a change listener for a table.
//!
//! Two implementations ship with the crate:
//! - [`MemoryStore`] keeps tables in memory and notifies listeners on every
//!   write. Tests use its counters and failure injection.
//! - [`RestStore`] speaks the PostgREST dialect used by hosted Postgres
//!   backends. Its change notifications echo writes made through the same
//!   client; writes from elsewhere are picked up by polling.
//!
//! Both fan out notifications through a [`ChangeFeed`], and every
//! subscription is represented by a [`Channel`] that detaches its listener
//! when closed or dropped.

mod error;
mod feed;
pub mod memory;
mod query;
pub mod rest;
mod store;

pub use error::{StoreError, StoreResult};
pub use feed::{ChangeFeed, Channel, Listener};
pub use memory::{MemoryStore, Op};
pub use query::{Filter, Order, Query, Row, TextSearch};
pub use rest::{RestConfig, RestStore};
pub use store::RemoteStore;

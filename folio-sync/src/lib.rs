//! Client-side sync core for Folio.
//!
//! Every entity (hero, about, skills, projects, categories, certifications,
//! blog posts, contact) goes through the same machinery:
//!
//! - **[`CachedCollection`]** owns the in-memory snapshot of one table. Reads
//!   are served from cache for the configured TTL; every mutation validates,
//!   writes through the [`folio_store::RemoteStore`] and invalidates the cache.
//! - **Push channel**: the first [`CachedCollection::subscribe`] opens one
//!   change listener on the table. Notifications mark the cache stale and a
//!   background task refetches and fans the new snapshot out to every
//!   registered callback. The last released [`Subscription`] closes it.
//! - **[`EntityHook`]** binds a collection to a view: it holds a
//!   [`ViewState`], applies optimistic edits, rolls back on failure and polls
//!   as a fallback when the push channel stays silent.
//! - **[`Portfolio`]** is the registry holding one collection per entity.
//!
//! The cache is never patched in place. A write invalidates, and the next read
//! replaces the snapshot wholesale. Concurrent writers resolve as
//! last-write-wins at the store.
//!
//! # Example
//!
//! ```no_run
//! use folio_model::Skill;
//! use folio_store::MemoryStore;
//! use folio_sync::{Portfolio, SyncConfig};
//! use std::sync::Arc;
//!
//! # async fn demo() -> folio_sync::SyncResult<()> {
//! let portfolio = Portfolio::init(Arc::new(MemoryStore::new()), SyncConfig::default());
//! portfolio.skills().create(&Skill::new("Rust", "Languages", 90)).await?;
//!
//! let hook = portfolio.hook::<Skill>().await;
//! assert_eq!(hook.data().len(), 1);
//! # Ok(())
//! # }
//! ```

mod cache;
mod collection;
mod config;
mod error;
mod hook;
mod portfolio;
mod subscription;

pub use cache::CacheEntry;
pub use collection::{CachedCollection, Direction, Fetched, SearchQuery};
pub use config::SyncConfig;
pub use error::{SyncError, SyncResult};
pub use hook::{EntityHook, ViewState};
pub use portfolio::{Portfolio, Provides};
pub use subscription::Subscription;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

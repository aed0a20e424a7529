use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// The cached snapshot of one table.
///
/// `records` is either empty and never fetched, or the complete set of active
/// rows as of `fetched_at`. Invalidation only marks the entry stale so that
/// reads can still fall back to the last good snapshot.
///
/// Each invalidation bumps `generation`. A read that started under an older
/// generation never marks the entry fresh, and a read older than the stored
/// snapshot is discarded.
#[derive(Debug)]
pub struct CacheEntry<T> {
    records: Arc<Vec<T>>,
    fetched_at: Option<Instant>,
    stale: bool,
    generation: u64,
    /// Generation the current records were read under.
    stored_generation: Option<u64>,
}

impl<T> Default for CacheEntry<T> {
    fn default() -> Self {
        Self {
            records: Arc::new(Vec::new()),
            fetched_at: None,
            stale: false,
            generation: 0,
            stored_generation: None,
        }
    }
}

impl<T> CacheEntry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current snapshot.
    pub fn records(&self) -> Arc<Vec<T>> {
        Arc::clone(&self.records)
    }

    pub fn fetched_at(&self) -> Option<Instant> {
        self.fetched_at
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether a fetch ever succeeded.
    pub fn is_populated(&self) -> bool {
        self.fetched_at.is_some()
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Whether the snapshot may be served without a remote read.
    pub fn is_fresh(&self, ttl: Duration, now: Instant) -> bool {
        !self.stale
            && self
                .fetched_at
                .is_some_and(|at| now.saturating_duration_since(at) < ttl)
    }

    pub fn invalidate(&mut self) {
        self.stale = true;
        self.generation += 1;
    }

    /// Replaces the snapshot with rows read under `generation`.
    ///
    /// Returns the snapshot now held. Rows read under a generation older than
    /// the stored one are dropped and the current snapshot is returned.
    pub fn store(&mut self, records: Vec<T>, generation: u64, now: Instant) -> Arc<Vec<T>> {
        if self.stored_generation.is_some_and(|stored| generation < stored) {
            return self.records();
        }
        let records = Arc::new(records);
        self.records = Arc::clone(&records);
        self.fetched_at = Some(now);
        self.stored_generation = Some(generation);
        if generation == self.generation {
            self.stale = false;
        }
        records
    }
}

//! In-process fan-out of table change notifications.

use folio_types::ChangeEvent;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Callback invoked for every change notification on a table.
pub type Listener = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct FeedInner {
    next_id: u64,
    tables: HashMap<String, BTreeMap<u64, Listener>>,
}

/// A set of listeners per table.
///
/// Cloning yields another handle to the same set.
#[derive(Clone, Default)]
pub struct ChangeFeed {
    inner: Arc<Mutex<FeedInner>>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a listener to `table`.
    pub fn listen(&self, table: &str, listener: Listener) -> Channel {
        let id = {
            let mut inner = lock(&self.inner);
            let id = inner.next_id;
            inner.next_id += 1;
            inner
                .tables
                .entry(table.to_string())
                .or_default()
                .insert(id, listener);
            id
        };
        debug!("Opened change channel {} on {}", id, table);

        let weak = Arc::downgrade(&self.inner);
        let key = table.to_string();
        Channel::new(table, move || {
            if let Some(inner) = weak.upgrade() {
                let mut inner = lock(&inner);
                if let Some(listeners) = inner.tables.get_mut(&key) {
                    listeners.remove(&id);
                    if listeners.is_empty() {
                        inner.tables.remove(&key);
                    }
                }
                debug!("Closed change channel {} on {}", id, key);
            }
        })
    }

    /// Delivers `event` to every listener on its table.
    ///
    /// Listeners run after the internal lock is released, so they may open or
    /// close channels themselves.
    pub fn publish(&self, event: &ChangeEvent) {
        let listeners: Vec<Listener> = lock(&self.inner)
            .tables
            .get(&event.table)
            .map(|l| l.values().cloned().collect())
            .unwrap_or_default();
        for listener in listeners {
            listener(event);
        }
    }

    /// Number of open channels on `table`.
    pub fn listener_count(&self, table: &str) -> usize {
        lock(&self.inner).tables.get(table).map_or(0, BTreeMap::len)
    }
}

impl fmt::Debug for ChangeFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = lock(&self.inner);
        f.debug_struct("ChangeFeed")
            .field("tables", &inner.tables.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A live change subscription on one table.
///
/// Closing the channel (or dropping it) detaches the listener. Closing is
/// idempotent.
pub struct Channel {
    table: String,
    close: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Channel {
    /// Wraps a transport-specific teardown action.
    pub fn new(table: impl Into<String>, close: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            table: table.into(),
            close: Some(Box::new(close)),
        }
    }

    /// The table this channel listens to.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Whether the channel is still attached.
    pub fn is_open(&self) -> bool {
        self.close.is_some()
    }

    /// Detaches the listener.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(close) = self.close.take() {
            close();
        }
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("table", &self.table)
            .field("open", &self.is_open())
            .finish()
    }
}

//! `EntityHook`: binds a cached collection to one mounted view.
//!
//! The hook owns a [`ViewState`] published through a `tokio::sync::watch`
//! channel. Snapshots are replaced wholesale and identical snapshots are not
//! re-published, so watchers only wake for real changes.
//!
//! Mutations are optimistic: the view is patched first, then the collection
//! writes through. On success the push channel (or, without one, a refresh)
//! reconciles the view with the store. On failure the hook re-reads with
//! `force_refresh` and surfaces the error in the view state.

use crate::collection::{position_patch, CachedCollection, Direction, Fetched};
use crate::error::SyncResult;
use crate::lock;
use crate::subscription::Subscription;
use folio_model::{to_fields, Entity};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, warn};

/// What a view renders.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState<T> {
    pub data: Arc<Vec<T>>,
    /// True until the first read settles, and while a refresh is in flight.
    pub is_loading: bool,
    /// Message of the last failed read or mutation.
    pub error: Option<String>,
    /// False after a read failed against the store.
    pub is_online: bool,
}

impl<T> Default for ViewState<T> {
    fn default() -> Self {
        Self {
            data: Arc::new(Vec::new()),
            is_loading: true,
            error: None,
            is_online: true,
        }
    }
}

/// A mounted view of one entity collection.
///
/// Dropping the hook unmounts it.
pub struct EntityHook<T: Entity> {
    collection: CachedCollection<T>,
    state: Arc<watch::Sender<ViewState<T>>>,
    mounted: Arc<AtomicBool>,
    subscription: Mutex<Option<Subscription>>,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Entity> EntityHook<T> {
    /// Loads the collection, registers for pushed snapshots and starts the
    /// fallback poller.
    ///
    /// Outside a Tokio runtime neither push nor polling is available and the
    /// view only changes through [`Self::refresh`] and mutations.
    pub async fn mount(collection: CachedCollection<T>) -> Self {
        let (state, _) = watch::channel(ViewState::default());
        let hook = Self {
            collection,
            state: Arc::new(state),
            mounted: Arc::new(AtomicBool::new(true)),
            subscription: Mutex::new(None),
            poller: Mutex::new(None),
        };

        let fetched = hook.collection.fetch(false).await;
        apply_fetched(&hook.state, fetched);
        hook.attach();
        hook.start_polling();
        debug!("Mounted {} hook", hook.collection.table());
        hook
    }

    /// Snapshot of the current view state.
    pub fn state(&self) -> ViewState<T> {
        self.state.borrow().clone()
    }

    /// The records currently shown.
    pub fn data(&self) -> Arc<Vec<T>> {
        Arc::clone(&self.state.borrow().data)
    }

    /// A receiver that wakes on every view change.
    pub fn watch(&self) -> watch::Receiver<ViewState<T>> {
        self.state.subscribe()
    }

    pub fn collection(&self) -> &CachedCollection<T> {
        &self.collection
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    /// Re-reads the collection and updates the view.
    pub async fn refresh(&self, force_refresh: bool) -> Arc<Vec<T>> {
        if self.is_mounted() {
            self.state.send_if_modified(|s| !std::mem::replace(&mut s.is_loading, true));
        }
        let fetched = self.collection.fetch(force_refresh).await;
        let records = Arc::clone(&fetched.records);
        if self.is_mounted() {
            apply_fetched(&self.state, fetched);
        }
        records
    }

    // ── Mutations ────────────────────────────────────────────────

    pub async fn create(&self, draft: &T) -> SyncResult<T> {
        let singleton = T::schema().is_singleton();
        self.optimistic(|data| {
            if singleton {
                data.clear();
            }
            data.push(draft.clone());
        });
        let result = self.collection.create(draft).await;
        self.settle(result).await
    }

    pub async fn update<P>(&self, id: &str, patch: &P) -> SyncResult<T>
    where
        P: Serialize + ?Sized + Sync,
    {
        let fields = to_fields(patch)?;
        self.optimistic(|data| {
            if let Some(slot) = data.iter_mut().find(|r| r.id() == id) {
                match slot.patched(&fields) {
                    Ok(next) => *slot = next,
                    Err(e) => debug!("No optimistic patch for {}: {}", id, e),
                }
            }
        });
        let result = self.collection.update(id, &fields).await;
        self.settle(result).await
    }

    pub async fn delete(&self, id: &str) -> SyncResult<bool> {
        self.optimistic(|data| data.retain(|r| r.id() != id));
        let result = self.collection.delete(id).await;
        self.settle(result).await
    }

    pub async fn reorder(&self, id: &str, direction: Direction) -> SyncResult<bool> {
        self.optimistic(|data| {
            let Some(index) = data.iter().position(|r| r.id() == id) else {
                return;
            };
            let Some(other) = direction.neighbour(index, data.len()) else {
                return;
            };
            if let Some(column) = T::schema().position {
                let (a, b) = (data[index].position(), data[other].position());
                let moved = data[index].patched(&position_patch(column, b));
                let displaced = data[other].patched(&position_patch(column, a));
                if let (Ok(moved), Ok(displaced)) = (moved, displaced) {
                    data[index] = moved;
                    data[other] = displaced;
                }
            }
            data.swap(index, other);
        });
        let result = self.collection.reorder(id, direction).await;
        self.settle(result).await
    }

    /// Releases the subscription and stops polling. Idempotent.
    pub fn unmount(&self) {
        if !self.mounted.swap(false, Ordering::SeqCst) {
            return;
        }
        let subscription = lock(&self.subscription).take();
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
        }
        let poller = lock(&self.poller).take();
        if let Some(poller) = poller {
            poller.abort();
        }
        debug!("Unmounted {} hook", self.collection.table());
    }

    fn attach(&self) {
        let state = Arc::clone(&self.state);
        let mounted = Arc::clone(&self.mounted);
        let subscribed = self.collection.subscribe(move |records| {
            if mounted.load(Ordering::SeqCst) {
                state.send_if_modified(|s| replace_if_different(&mut s.data, records));
            }
        });
        match subscribed {
            Ok(subscription) => *lock(&self.subscription) = Some(subscription),
            Err(e) => warn!(
                "Live updates for {} unavailable: {}",
                self.collection.table(),
                e
            ),
        }
    }

    fn start_polling(&self) {
        let Ok(runtime) = Handle::try_current() else {
            warn!(
                "No Tokio runtime, {} hook only updates on refresh",
                self.collection.table()
            );
            return;
        };
        let period = self.collection.config().poll_interval();
        let collection = self.collection.clone();
        let state = Arc::clone(&self.state);
        let mounted = Arc::clone(&self.mounted);

        let poller = runtime.spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !mounted.load(Ordering::SeqCst) {
                    break;
                }
                let fetched = collection.fetch(false).await;
                if !mounted.load(Ordering::SeqCst) {
                    break;
                }
                apply_fetched(&state, fetched);
            }
        });
        *lock(&self.poller) = Some(poller);
    }

    fn optimistic(&self, apply: impl FnOnce(&mut Vec<T>)) {
        if !self.is_mounted() {
            return;
        }
        self.state.send_modify(|s| {
            let mut data = (*s.data).clone();
            apply(&mut data);
            s.data = Arc::new(data);
        });
    }

    async fn settle<R>(&self, result: SyncResult<R>) -> SyncResult<R> {
        match result {
            Ok(value) => {
                if !self.collection.has_live_channel() {
                    self.refresh(false).await;
                }
                Ok(value)
            }
            Err(e) => {
                warn!(
                    "{} mutation failed, rolling back: {}",
                    self.collection.table(),
                    e
                );
                self.refresh(true).await;
                if self.is_mounted() {
                    let message = e.to_string();
                    self.state.send_modify(|s| s.error = Some(message));
                }
                Err(e)
            }
        }
    }
}

impl<T: Entity> Drop for EntityHook<T> {
    fn drop(&mut self) {
        self.unmount();
    }
}

fn replace_if_different<T: PartialEq>(slot: &mut Arc<Vec<T>>, next: Arc<Vec<T>>) -> bool {
    if Arc::ptr_eq(slot, &next) || **slot == *next {
        return false;
    }
    *slot = next;
    true
}

fn apply_fetched<T: Entity>(state: &watch::Sender<ViewState<T>>, fetched: Fetched<T>) {
    let error = fetched.error.map(|e| e.to_string());
    state.send_if_modified(|s| {
        let mut changed = replace_if_different(&mut s.data, fetched.records);
        let online = error.is_none();
        if s.is_loading {
            s.is_loading = false;
            changed = true;
        }
        if s.is_online != online {
            s.is_online = online;
            changed = true;
        }
        if s.error != error {
            s.error = error;
            changed = true;
        }
        changed
    });
}

//! `CachedCollection`: the per-entity data manager.

use crate::cache::CacheEntry;
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::lock;
use crate::subscription::Subscription;
use folio_model::{
    from_fields, slugify, to_fields, unique_slug, Entity, EntitySchema, Fields, SlugRule,
    ValidationMode, SERVER_FIELDS,
};
use folio_store::{Channel, Listener, Query, RemoteStore, Row, StoreError, TextSearch};
use folio_types::{ChangeEvent, Timestamp};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, Weak};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

type Callback<T> = Arc<dyn Fn(Arc<Vec<T>>) + Send + Sync>;

/// Result of a read that never fails.
///
/// `records` is the fresh snapshot on success. On a remote failure it is the
/// last good snapshot (empty if there never was one) and `error` says why.
#[derive(Debug)]
pub struct Fetched<T> {
    pub records: Arc<Vec<T>>,
    pub error: Option<SyncError>,
}

/// Which neighbour a record swaps places with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// Index of the neighbour of `index` in a list of `len`, if there is one.
    pub fn neighbour(self, index: usize, len: usize) -> Option<usize> {
        match self {
            Self::Up => index.checked_sub(1),
            Self::Down => Some(index + 1).filter(|&i| i < len),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Up => "up",
            Self::Down => "down",
        })
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            other => Err(format!("unknown direction {other:?}, expected up or down")),
        }
    }
}

/// A live search: free-text term plus equality filters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchQuery {
    pub term: String,
    pub filters: Vec<(String, Value)>,
}

impl SearchQuery {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            filters: Vec::new(),
        }
    }

    /// Published blog posts.
    pub fn published() -> Self {
        Self::default().filter("published", true)
    }

    /// Featured records.
    pub fn featured() -> Self {
        Self::default().filter("featured", true)
    }

    #[must_use]
    pub fn filter(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    #[must_use]
    pub fn term(mut self, term: impl Into<String>) -> Self {
        self.term = term.into();
        self
    }
}

struct PushState<T> {
    next_id: u64,
    callbacks: BTreeMap<u64, Callback<T>>,
    channel: Option<Channel>,
    task: Option<JoinHandle<()>>,
}

impl<T> Default for PushState<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            callbacks: BTreeMap::new(),
            channel: None,
            task: None,
        }
    }
}

struct Inner<T> {
    store: Arc<dyn RemoteStore>,
    config: SyncConfig,
    cache: Mutex<CacheEntry<T>>,
    /// Message of the last failed refresh, cleared by the next success.
    last_error: Mutex<Option<String>>,
    push: Mutex<PushState<T>>,
}

/// Cached view of one entity table.
///
/// Cloning yields another handle to the same cache and push channel.
pub struct CachedCollection<T: Entity> {
    inner: Arc<Inner<T>>,
}

impl<T: Entity> Clone for CachedCollection<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Entity> fmt::Debug for CachedCollection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedCollection")
            .field("table", &self.table())
            .field("store", &self.inner.store.name())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl<T: Entity> CachedCollection<T> {
    pub fn new(store: Arc<dyn RemoteStore>, config: SyncConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                config,
                cache: Mutex::new(CacheEntry::new()),
                last_error: Mutex::new(None),
                push: Mutex::new(PushState::default()),
            }),
        }
    }

    pub fn schema(&self) -> &'static EntitySchema {
        T::schema()
    }

    pub fn table(&self) -> &'static str {
        T::schema().table
    }

    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    // ── Reads ────────────────────────────────────────────────────

    /// All active records, from cache when fresh. Never fails: on a remote
    /// error the last good snapshot (or an empty list) is returned and the
    /// failure is kept in [`Self::last_error`].
    pub async fn get_all(&self, force_refresh: bool) -> Arc<Vec<T>> {
        self.fetch(force_refresh).await.records
    }

    /// Like [`Self::get_all`], but also reports a remote failure.
    pub async fn fetch(&self, force_refresh: bool) -> Fetched<T> {
        let table = self.table();
        let generation = {
            let cache = lock(&self.inner.cache);
            if !force_refresh && cache.is_fresh(self.inner.config.cache_ttl(), Instant::now()) {
                debug!("Cache hit for {}", table);
                return Fetched {
                    records: cache.records(),
                    error: None,
                };
            }
            cache.generation()
        };

        match self.read_remote().await {
            Ok(records) => {
                debug!("Fetched {} {} records", records.len(), table);
                *lock(&self.inner.last_error) = None;
                let records = lock(&self.inner.cache).store(records, generation, Instant::now());
                Fetched {
                    records,
                    error: None,
                }
            }
            Err(e) => {
                warn!("Failed to refresh {}, serving cached snapshot: {}", table, e);
                *lock(&self.inner.last_error) = Some(e.to_string());
                Fetched {
                    records: self.cached(),
                    error: Some(e),
                }
            }
        }
    }

    /// The current snapshot without any I/O.
    pub fn cached(&self) -> Arc<Vec<T>> {
        lock(&self.inner.cache).records()
    }

    /// Why the most recent remote read failed, if it did.
    pub fn last_error(&self) -> Option<String> {
        lock(&self.inner.last_error).clone()
    }

    /// Whether the next [`Self::get_all`] would be served from cache.
    pub fn is_fresh(&self) -> bool {
        lock(&self.inner.cache).is_fresh(self.inner.config.cache_ttl(), Instant::now())
    }

    /// Looks a record up in the (possibly refreshed) snapshot.
    pub async fn find(&self, id: &str) -> Option<T> {
        self.get_all(false).await.iter().find(|r| r.id() == id).cloned()
    }

    /// The row of a singleton entity, or the first record of a collection.
    pub async fn get(&self) -> Option<T> {
        self.get_all(false).await.first().cloned()
    }

    /// Live search over active records. Bypasses the cache.
    pub async fn search(&self, query: &SearchQuery) -> SyncResult<Vec<T>> {
        let schema = T::schema();
        let mut remote = read_query(schema);
        for (field, value) in &query.filters {
            remote = remote.eq(field.clone(), value.clone());
        }

        let term = query.term.trim();
        if !term.is_empty() {
            if schema.search.is_empty() {
                return Err(SyncError::Unsupported {
                    table: schema.table,
                    operation: "text search",
                });
            }
            let mut search = TextSearch::new(term);
            for field in schema.text_search_fields() {
                search = search.text(field);
            }
            for field in schema.tag_search_fields() {
                search = search.tags(field);
            }
            remote = remote.search(search);
        }

        let rows = self.inner.store.select(schema.table, &remote).await?;
        Ok(decode_rows(rows))
    }

    // ── Writes ───────────────────────────────────────────────────

    /// Validates and inserts a draft, returning the stored record.
    ///
    /// Server columns in the draft are ignored. The slug (if the entity has
    /// one) is made unique with a numeric suffix and the record is placed
    /// after every existing one. Singletons are written with [`Self::set`].
    pub async fn create(&self, draft: &T) -> SyncResult<T> {
        let schema = T::schema();
        if schema.is_singleton() {
            return self.set(draft).await;
        }

        let mut fields = prepare::<T, _>(draft, ValidationMode::Create)?;
        if schema.slug.is_some() || schema.position.is_some() {
            let rows = self.inner.store.select(schema.table, &Query::new()).await?;
            if let Some(rule) = schema.slug {
                assign_slug(rule, &mut fields, None, &rows, None);
            }
            if let Some(column) = schema.position {
                let next = next_position(column, schema.active_flag(), &rows);
                fields.insert(column.to_string(), Value::from(next));
            }
        }

        let row = self.inner.store.insert(schema.table, fields).await?;
        self.invalidate();
        let record: T = from_fields(row)?;
        info!("Created {} {}", schema.table, record.id());
        Ok(record)
    }

    /// Writes the single row of a singleton entity, inserting it if absent.
    pub async fn set(&self, draft: &T) -> SyncResult<T> {
        let schema = T::schema();
        let mut fields = prepare::<T, _>(draft, ValidationMode::Create)?;
        let existing = self
            .inner
            .store
            .select(schema.table, &read_query(schema))
            .await?
            .first()
            .and_then(row_id)
            .map(str::to_string);

        let row = match existing {
            Some(id) => {
                stamp(&mut fields);
                self.inner.store.update(schema.table, &id, fields).await?
            }
            None => self.inner.store.insert(schema.table, fields).await?,
        };
        self.invalidate();
        let record: T = from_fields(row)?;
        info!("Set {} {}", schema.table, record.id());
        Ok(record)
    }

    /// Applies a partial update.
    ///
    /// A changed slug source regenerates the slug, unique among every other
    /// row. Derived fields are recomputed and `updated_at` is bumped.
    pub async fn update<P>(&self, id: &str, patch: &P) -> SyncResult<T>
    where
        P: Serialize + ?Sized + Sync,
    {
        let schema = T::schema();
        let mut fields = prepare::<T, _>(patch, ValidationMode::Patch)?;

        if let Some(rule) = schema.slug {
            let rows = self.inner.store.select(schema.table, &Query::new()).await?;
            let current = rows
                .iter()
                .find(|r| row_id(r) == Some(id))
                .ok_or_else(|| SyncError::not_found(schema.table, id))?;
            let source_changed = fields
                .get(rule.source)
                .is_some_and(|v| current.get(rule.source) != Some(v));
            if source_changed || fields.contains_key(rule.field) {
                assign_slug(rule, &mut fields, Some(current), &rows, Some(id));
            }
        }

        stamp(&mut fields);
        let row = self.inner.store.update(schema.table, id, fields).await?;
        self.invalidate();
        debug!("Updated {} {}", schema.table, id);
        Ok(from_fields(row)?)
    }

    /// Deletes a record: soft for collections with an active flag, hard
    /// otherwise. Returns whether a row was affected.
    pub async fn delete(&self, id: &str) -> SyncResult<bool> {
        let schema = T::schema();
        let affected = match schema.active_flag().filter(|_| !schema.is_singleton()) {
            Some(flag) => {
                let mut patch = Fields::new();
                patch.insert(flag.to_string(), Value::Bool(false));
                stamp(&mut patch);
                match self.inner.store.update(schema.table, id, patch).await {
                    Ok(_) => true,
                    Err(StoreError::NotFound { .. }) => false,
                    Err(e) => return Err(e.into()),
                }
            }
            None => self.inner.store.delete(schema.table, id).await?,
        };

        if affected {
            self.invalidate();
            info!("Deleted {} {}", schema.table, id);
        }
        Ok(affected)
    }

    /// Swaps the manual position of `id` with its neighbour.
    ///
    /// Returns `false` without writing when the record is already first
    /// (`Up`) or last (`Down`). The swap is two single-row updates; if the
    /// second fails the first is not undone.
    pub async fn reorder(&self, id: &str, direction: Direction) -> SyncResult<bool> {
        let schema = T::schema();
        let Some(column) = schema.position.filter(|_| !schema.is_singleton()) else {
            return Err(SyncError::Unsupported {
                table: schema.table,
                operation: "reorder",
            });
        };

        let records = self.read_remote().await?;
        let index = records
            .iter()
            .position(|r| r.id() == id)
            .ok_or_else(|| SyncError::not_found(schema.table, id))?;
        let Some(other) = direction.neighbour(index, records.len()) else {
            debug!("{} {} is already at the boundary", schema.table, id);
            return Ok(false);
        };

        let (moved_id, moved_pos) = (records[index].id().to_string(), records[index].position());
        let (other_id, other_pos) = (records[other].id().to_string(), records[other].position());

        self.inner
            .store
            .update(schema.table, &moved_id, position_patch(column, other_pos))
            .await?;
        let second = self
            .inner
            .store
            .update(schema.table, &other_id, position_patch(column, moved_pos))
            .await;
        self.invalidate();
        second?;

        info!("Moved {} {} {}", schema.table, id, direction);
        Ok(true)
    }

    /// Marks the snapshot stale. The next read goes to the store.
    pub fn invalidate(&self) {
        lock(&self.inner.cache).invalidate();
        debug!("Invalidated {} cache", self.table());
    }

    // ── Push ─────────────────────────────────────────────────────

    /// Registers `callback` for fresh snapshots pushed after remote changes.
    ///
    /// The first registration opens the table's change channel; later ones
    /// share it.
    pub fn subscribe(
        &self,
        callback: impl Fn(Arc<Vec<T>>) + Send + Sync + 'static,
    ) -> SyncResult<Subscription> {
        let table = self.table();
        let mut push = lock(&self.inner.push);
        if push.channel.is_none() {
            let runtime = Handle::try_current().map_err(|_| SyncError::NoRuntime)?;
            let (events, receiver) = mpsc::unbounded_channel();
            let weak = Arc::downgrade(&self.inner);
            let listener: Listener = Arc::new(move |event: &ChangeEvent| {
                if let Some(inner) = weak.upgrade() {
                    lock(&inner.cache).invalidate();
                }
                if events.send(event.clone()).is_err() {
                    debug!("Push task for {} is gone, dropping notification", event.table);
                }
            });

            let channel = self.inner.store.subscribe(table, listener)?;
            push.task = Some(runtime.spawn(push_loop(Arc::downgrade(&self.inner), receiver)));
            push.channel = Some(channel);
            info!("Opened push channel for {}", table);
        }

        let id = push.next_id;
        push.next_id += 1;
        push.callbacks.insert(id, Arc::new(callback));
        drop(push);

        let weak = Arc::downgrade(&self.inner);
        Ok(Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                release(&inner, id);
            }
        }))
    }

    /// Number of registered callbacks.
    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner.push).callbacks.len()
    }

    /// Whether the table's change channel is open.
    pub fn has_live_channel(&self) -> bool {
        lock(&self.inner.push).channel.is_some()
    }

    /// Drops every callback and closes the change channel.
    pub fn shutdown(&self) {
        let (channel, task) = {
            let mut push = lock(&self.inner.push);
            push.callbacks.clear();
            (push.channel.take(), push.task.take())
        };
        close_channel::<T>(channel, task);
    }

    fn notify(&self, records: &Arc<Vec<T>>) {
        let callbacks: Vec<Callback<T>> =
            lock(&self.inner.push).callbacks.values().cloned().collect();
        for callback in callbacks {
            callback(Arc::clone(records));
        }
    }

    async fn read_remote(&self) -> SyncResult<Vec<T>> {
        let schema = T::schema();
        let rows = self.inner.store.select(schema.table, &read_query(schema)).await?;
        Ok(decode_rows(rows))
    }
}

async fn push_loop<T: Entity>(
    weak: Weak<Inner<T>>,
    mut events: mpsc::UnboundedReceiver<ChangeEvent>,
) {
    while let Some(event) = events.recv().await {
        let mut burst = 1;
        while events.try_recv().is_ok() {
            burst += 1;
        }
        let Some(inner) = weak.upgrade() else { break };
        let collection = CachedCollection { inner };
        debug!(
            "{} on {} ({} notifications), refreshing",
            event.kind, event.table, burst
        );

        let fetched = collection.fetch(true).await;
        match fetched.error {
            Some(e) => warn!("Push refresh of {} failed: {}", event.table, e),
            None => collection.notify(&fetched.records),
        }
    }
}

fn release<T: Entity>(inner: &Inner<T>, id: u64) {
    let (channel, task) = {
        let mut push = lock(&inner.push);
        push.callbacks.remove(&id);
        if !push.callbacks.is_empty() {
            return;
        }
        (push.channel.take(), push.task.take())
    };
    close_channel::<T>(channel, task);
}

fn close_channel<T: Entity>(channel: Option<Channel>, task: Option<JoinHandle<()>>) {
    if let Some(task) = task {
        task.abort();
    }
    if let Some(channel) = channel {
        channel.close();
        info!("Closed push channel for {}", T::schema().table);
    }
}

/// Full read of active rows in display order.
fn read_query(schema: &EntitySchema) -> Query {
    let mut query = Query::new();
    if let Some(flag) = schema.active_flag() {
        query = query.eq(flag, true);
    }
    for key in schema.order_by {
        query = query.order_by(key.field, key.descending);
    }
    query
}

fn decode_rows<T: Entity>(rows: Vec<Row>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match from_fields::<T>(row) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping malformed {} row: {}", T::schema().table, e);
                None
            }
        })
        .collect()
}

/// Serializes, strips server columns, validates and derives.
fn prepare<T: Entity, S: Serialize + ?Sized>(
    value: &S,
    mode: ValidationMode,
) -> SyncResult<Fields> {
    let mut fields = to_fields(value)?;
    for column in SERVER_FIELDS {
        fields.remove(*column);
    }
    T::schema().check_required(&fields, mode)?;
    T::validate(&fields)?;
    T::derive(&mut fields);
    Ok(fields)
}

fn stamp(fields: &mut Fields) {
    fields.insert(
        "updated_at".to_string(),
        Value::String(Timestamp::now().to_rfc3339()),
    );
}

fn row_id(row: &Row) -> Option<&str> {
    row.get("id").and_then(Value::as_str)
}

/// Sets the slug column from an explicit slug or the source column, unique
/// among every row except `except`.
fn assign_slug(
    rule: SlugRule,
    fields: &mut Fields,
    current: Option<&Row>,
    rows: &[Row],
    except: Option<&str>,
) {
    let explicit = fields
        .get(rule.field)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(slugify);
    let base = explicit.unwrap_or_else(|| {
        let source = fields
            .get(rule.source)
            .or_else(|| current.and_then(|row| row.get(rule.source)))
            .and_then(Value::as_str)
            .unwrap_or_default();
        slugify(source)
    });

    let taken: HashSet<String> = rows
        .iter()
        .filter(|row| except.is_none_or(|id| row_id(row) != Some(id)))
        .filter_map(|row| row.get(rule.field).and_then(Value::as_str))
        .map(str::to_string)
        .collect();
    fields.insert(rule.field.to_string(), Value::String(unique_slug(&base, &taken)));
}

/// One past the highest position among active rows.
fn next_position(column: &str, active_flag: Option<&str>, rows: &[Row]) -> i64 {
    rows.iter()
        .filter(|row| active_flag.is_none_or(|flag| row.get(flag) != Some(&Value::Bool(false))))
        .filter_map(|row| row.get(column).and_then(Value::as_i64))
        .max()
        .map_or(0, |max| max + 1)
}

pub(crate) fn position_patch(column: &str, position: i64) -> Fields {
    let mut patch = Fields::new();
    patch.insert(column.to_string(), Value::from(position));
    stamp(&mut patch);
    patch
}

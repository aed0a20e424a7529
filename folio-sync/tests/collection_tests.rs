use async_trait::async_trait;
use folio_model::{About, BlogPost, Hero, Project, Skill};
use folio_store::{Channel, Listener, MemoryStore, Op, Query, RemoteStore, Row, StoreResult};
use folio_sync::{CachedCollection, Direction, SearchQuery, SyncConfig, SyncError};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

fn collection<T: folio_model::Entity>() -> (Arc<MemoryStore>, CachedCollection<T>) {
    let store = Arc::new(MemoryStore::new());
    let collection = CachedCollection::new(store.clone(), SyncConfig::default());
    (store, collection)
}

fn words(n: usize) -> String {
    vec!["word"; n].join(" ")
}

async fn seed_skills(skills: &CachedCollection<Skill>) -> Vec<Skill> {
    let mut created = Vec::new();
    for name in ["Rust", "Go", "SQL"] {
        created.push(skills.create(&Skill::new(name, "Languages", 80)).await.unwrap());
    }
    created
}

fn ids(records: &[Skill]) -> Vec<&str> {
    records.iter().map(|r| r.id.as_str()).collect()
}

// ── Cache TTL ───────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn reads_within_ttl_share_one_snapshot() {
    let (store, skills) = collection::<Skill>();

    let first = skills.get_all(false).await;
    let second = skills.get_all(false).await;
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(store.select_count("skills"), 1);
    assert!(skills.is_fresh());
}

#[tokio::test(start_paused = true)]
async fn expired_cache_reads_remotely() {
    let (store, skills) = collection::<Skill>();

    skills.get_all(false).await;
    tokio::time::advance(Duration::from_secs(299)).await;
    skills.get_all(false).await;
    assert_eq!(store.select_count("skills"), 1);

    tokio::time::advance(Duration::from_secs(2)).await;
    skills.get_all(false).await;
    assert_eq!(store.select_count("skills"), 2);
}

#[tokio::test(start_paused = true)]
async fn forced_refresh_bypasses_cache() {
    let (store, skills) = collection::<Skill>();

    skills.get_all(false).await;
    skills.get_all(true).await;
    assert_eq!(store.select_count("skills"), 2);
}

#[tokio::test]
async fn custom_ttl_is_honored() {
    let store = Arc::new(MemoryStore::new());
    let skills: CachedCollection<Skill> = CachedCollection::new(
        store.clone(),
        SyncConfig {
            cache_ttl_secs: 0,
            ..Default::default()
        },
    );

    skills.get_all(false).await;
    skills.get_all(false).await;
    assert_eq!(store.select_count("skills"), 2);
}

// ── Invalidation ────────────────────────────────────────────────

#[tokio::test]
async fn every_mutation_invalidates() {
    let (store, skills) = collection::<Skill>();
    let created = seed_skills(&skills).await;
    skills.get_all(false).await;
    assert!(skills.is_fresh());

    skills.update(&created[0].id, &json!({ "level": 95 })).await.unwrap();
    assert!(!skills.is_fresh());
    skills.get_all(false).await;

    skills.reorder(&created[1].id, Direction::Up).await.unwrap();
    assert!(!skills.is_fresh());
    skills.get_all(false).await;

    skills.delete(&created[2].id).await.unwrap();
    assert!(!skills.is_fresh());

    let before = store.select_count("skills");
    let after_delete = skills.get_all(false).await;
    assert_eq!(store.select_count("skills"), before + 1);
    assert_eq!(after_delete.len(), 2);
}

#[tokio::test]
async fn explicit_invalidate_forces_next_read() {
    let (store, skills) = collection::<Skill>();
    skills.get_all(false).await;
    skills.invalidate();
    skills.get_all(false).await;
    assert_eq!(store.select_count("skills"), 2);
}

// ── Overlapping reads ───────────────────────────────────────────

/// Delegates to a [`MemoryStore`], optionally holding one select open after
/// it has read its rows.
struct StallingStore {
    inner: Arc<MemoryStore>,
    stall: Mutex<Option<(oneshot::Sender<()>, oneshot::Receiver<()>)>>,
}

impl StallingStore {
    fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            stall: Mutex::new(None),
        }
    }

    /// Holds the next select until `release` fires; `reached` fires once its
    /// rows are read.
    fn stall_next_select(&self, reached: oneshot::Sender<()>, release: oneshot::Receiver<()>) {
        *self.stall.lock().unwrap() = Some((reached, release));
    }
}

#[async_trait]
impl RemoteStore for StallingStore {
    fn name(&self) -> &'static str {
        "stalling"
    }

    async fn select(&self, table: &str, query: &Query) -> StoreResult<Vec<Row>> {
        let rows = self.inner.select(table, query).await?;
        let stall = self.stall.lock().unwrap().take();
        if let Some((reached, release)) = stall {
            let _ = reached.send(());
            let _ = release.await;
        }
        Ok(rows)
    }

    async fn insert(&self, table: &str, row: Row) -> StoreResult<Row> {
        self.inner.insert(table, row).await
    }

    async fn update(&self, table: &str, id: &str, patch: Row) -> StoreResult<Row> {
        self.inner.update(table, id, patch).await
    }

    async fn delete(&self, table: &str, id: &str) -> StoreResult<bool> {
        self.inner.delete(table, id).await
    }

    fn subscribe(&self, table: &str, listener: Listener) -> StoreResult<Channel> {
        self.inner.subscribe(table, listener)
    }
}

#[tokio::test(start_paused = true)]
async fn read_finishing_after_a_newer_one_is_discarded() {
    let memory = Arc::new(MemoryStore::new());
    let store = Arc::new(StallingStore::new(memory.clone()));
    let skills = CachedCollection::<Skill>::new(store.clone(), SyncConfig::default());
    skills.create(&Skill::new("Rust", "Languages", 90)).await.unwrap();

    let (reached_tx, reached_rx) = oneshot::channel();
    let (release_tx, release_rx) = oneshot::channel();
    store.stall_next_select(reached_tx, release_rx);
    let slow = tokio::spawn({
        let skills = skills.clone();
        async move { skills.fetch(true).await }
    });
    reached_rx.await.unwrap();

    skills.create(&Skill::new("Go", "Languages", 70)).await.unwrap();
    assert_eq!(skills.get_all(false).await.len(), 2);

    release_tx.send(()).unwrap();
    let slow = slow.await.unwrap();
    assert!(slow.error.is_none());
    assert_eq!(slow.records.len(), 2);

    let reads = memory.select_count("skills");
    let served = skills.get_all(false).await;
    assert_eq!(served.len(), 2);
    assert_eq!(memory.select_count("skills"), reads);
    assert!(skills.is_fresh());
}

// ── Degraded reads ──────────────────────────────────────────────

#[tokio::test]
async fn failed_read_serves_last_good_snapshot() {
    let (store, skills) = collection::<Skill>();
    seed_skills(&skills).await;
    let good = skills.get_all(false).await;
    assert_eq!(good.len(), 3);

    store.set_offline(true);
    let fetched = skills.fetch(true).await;
    assert!(matches!(fetched.error, Some(SyncError::Remote(_))));
    assert!(Arc::ptr_eq(&fetched.records, &good));
}

#[tokio::test]
async fn failed_first_read_is_empty_with_error() {
    let (store, skills) = collection::<Skill>();
    store.fail_next(Op::Select);

    let fetched = skills.fetch(false).await;
    assert!(fetched.records.is_empty());
    assert!(fetched.error.is_some());
    assert!(skills.get_all(false).await.is_empty());
}

#[tokio::test]
async fn get_all_keeps_the_last_read_failure() {
    let (store, skills) = collection::<Skill>();
    store.set_offline(true);

    assert!(skills.get_all(false).await.is_empty());
    let error = skills.last_error().expect("failure should be recorded");
    assert!(error.contains("offline"), "unexpected error: {error}");

    store.set_offline(false);
    skills.get_all(false).await;
    assert_eq!(skills.last_error(), None);
}

// ── Create ──────────────────────────────────────────────────────

#[tokio::test]
async fn create_assigns_id_and_next_position() {
    let (_, skills) = collection::<Skill>();
    let created = seed_skills(&skills).await;

    assert!(created.iter().all(|s| !s.id.is_empty()));
    let positions: Vec<_> = created.iter().map(|s| s.display_order).collect();
    assert_eq!(positions, [0, 1, 2]);
    assert!(created.iter().all(|s| s.created_at.is_some()));
}

#[tokio::test]
async fn create_ignores_draft_server_columns() {
    let (store, skills) = collection::<Skill>();
    let mut draft = Skill::new("Rust", "Languages", 90);
    draft.id = "draft-123".to_string();
    draft.display_order = 42;

    let created = skills.create(&draft).await.unwrap();
    assert_ne!(created.id, "draft-123");
    assert_eq!(created.display_order, 0);
    assert_eq!(store.rows("skills").len(), 1);
}

#[tokio::test]
async fn create_rejects_invalid_draft_before_writing() {
    let (store, skills) = collection::<Skill>();

    let err = skills.create(&Skill::new("", "Languages", 50)).await.unwrap_err();
    assert!(matches!(err, SyncError::Validation(_)));

    let err = skills.create(&Skill::new("Rust", "Languages", 150)).await.unwrap_err();
    assert!(matches!(err, SyncError::Validation(_)));

    assert_eq!(store.op_count("skills", Op::Insert), 0);
}

#[tokio::test]
async fn create_surfaces_remote_failure() {
    let (store, skills) = collection::<Skill>();
    store.fail_next(Op::Insert);

    let err = skills.create(&Skill::new("Rust", "Languages", 90)).await.unwrap_err();
    assert!(err.is_remote());
    assert!(store.rows("skills").is_empty());
}

// ── Slugs and read time ─────────────────────────────────────────

#[tokio::test]
async fn same_title_gets_suffixed_slug() {
    let (_, blog) = collection::<BlogPost>();
    let draft = BlogPost::new("My First Post!", words(400), "Ada", "Rust");

    let first = blog.create(&draft).await.unwrap();
    let second = blog.create(&draft).await.unwrap();
    assert_eq!(first.slug, "my-first-post");
    assert_eq!(second.slug, "my-first-post-1");
    assert_eq!(first.read_time, 2);
    assert_ne!(first.id, second.id);
}

#[tokio::test]
async fn explicit_slug_is_normalized_and_deduplicated() {
    let (_, blog) = collection::<BlogPost>();
    let mut draft = BlogPost::new("Anything", "body", "Ada", "Rust");
    draft.slug = "Custom Slug".to_string();

    let first = blog.create(&draft).await.unwrap();
    let second = blog.create(&draft).await.unwrap();
    assert_eq!(first.slug, "custom-slug");
    assert_eq!(second.slug, "custom-slug-1");
}

#[tokio::test]
async fn soft_deleted_posts_still_reserve_their_slug() {
    let (_, blog) = collection::<BlogPost>();
    let draft = BlogPost::new("Hello", "body", "Ada", "Rust");

    let first = blog.create(&draft).await.unwrap();
    blog.delete(&first.id).await.unwrap();
    let second = blog.create(&draft).await.unwrap();
    assert_eq!(second.slug, "hello-1");
}

#[tokio::test]
async fn title_change_regenerates_slug_excluding_self() {
    let (_, blog) = collection::<BlogPost>();
    let first = blog.create(&BlogPost::new("My First Post", "a", "Ada", "Rust")).await.unwrap();
    let second = blog.create(&BlogPost::new("Second", "b", "Ada", "Rust")).await.unwrap();

    let renamed = blog
        .update(&first.id, &json!({ "title": "My first post!" }))
        .await
        .unwrap();
    assert_eq!(renamed.slug, "my-first-post");

    let clashing = blog
        .update(&second.id, &json!({ "title": "My First Post" }))
        .await
        .unwrap();
    assert_eq!(clashing.slug, "my-first-post-1");
}

#[tokio::test]
async fn unrelated_update_keeps_slug() {
    let (_, blog) = collection::<BlogPost>();
    let post = blog.create(&BlogPost::new("Stable", "a", "Ada", "Rust")).await.unwrap();

    let updated = blog.update(&post.id, &json!({ "published": true })).await.unwrap();
    assert_eq!(updated.slug, "stable");
    assert!(updated.published);
}

#[tokio::test]
async fn content_update_recomputes_read_time() {
    let (_, blog) = collection::<BlogPost>();
    let post = blog.create(&BlogPost::new("Long", "short", "Ada", "Rust")).await.unwrap();
    assert_eq!(post.read_time, 1);

    let updated = blog
        .update(&post.id, &json!({ "content": words(401) }))
        .await
        .unwrap();
    assert_eq!(updated.read_time, 3);
}

// ── Update ──────────────────────────────────────────────────────

#[tokio::test]
async fn update_bumps_updated_at() {
    let (_, skills) = collection::<Skill>();
    let skill = skills.create(&Skill::new("Rust", "Languages", 80)).await.unwrap();

    tokio::time::sleep(Duration::from_millis(5)).await;
    let updated = skills.update(&skill.id, &json!({ "level": 90 })).await.unwrap();
    assert_eq!(updated.level, 90);
    assert!(updated.updated_at.unwrap().is_after(&skill.updated_at.unwrap()));
}

#[tokio::test]
async fn update_missing_id_is_not_found() {
    let (_, skills) = collection::<Skill>();
    let err = skills.update("ghost", &json!({ "level": 10 })).await.unwrap_err();
    assert!(matches!(err, SyncError::NotFound { ref id, .. } if id == "ghost"));

    let (_, blog) = collection::<BlogPost>();
    let err = blog.update("ghost", &json!({ "title": "x" })).await.unwrap_err();
    assert!(matches!(err, SyncError::NotFound { .. }));
}

#[tokio::test]
async fn update_rejects_blank_required_field() {
    let (store, skills) = collection::<Skill>();
    let skill = skills.create(&Skill::new("Rust", "Languages", 80)).await.unwrap();

    let err = skills.update(&skill.id, &json!({ "name": "  " })).await.unwrap_err();
    assert!(matches!(err, SyncError::Validation(_)));
    assert_eq!(store.op_count("skills", Op::Update), 0);
}

// ── Delete ──────────────────────────────────────────────────────

#[tokio::test]
async fn soft_deleted_record_disappears_but_row_remains() {
    let (store, skills) = collection::<Skill>();
    let created = seed_skills(&skills).await;

    assert!(skills.delete(&created[1].id).await.unwrap());
    let visible = skills.get_all(false).await;
    assert_eq!(ids(&visible), [created[0].id.as_str(), created[2].id.as_str()]);

    let row = store.row("skills", &created[1].id).unwrap();
    assert_eq!(row["is_active"], json!(false));
}

#[tokio::test]
async fn delete_missing_id_returns_false() {
    let (_, skills) = collection::<Skill>();
    assert!(!skills.delete("ghost").await.unwrap());
}

#[tokio::test]
async fn singleton_delete_is_hard() {
    let (store, hero) = collection::<Hero>();
    let saved = hero.create(&Hero::new("Ada", "Engineer")).await.unwrap();

    assert!(hero.delete(&saved.id).await.unwrap());
    assert!(store.rows("hero").is_empty());
    assert!(hero.get().await.is_none());
}

// ── Singletons ──────────────────────────────────────────────────

#[tokio::test]
async fn singleton_set_upserts_one_row() {
    let (store, about) = collection::<About>();

    let first = about.set(&About::new("About me", "Hello")).await.unwrap();
    let second = about.create(&About::new("About me, again", "Hi")).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(store.rows("about").len(), 1);
    assert_eq!(about.get().await.unwrap().title, "About me, again");
}

#[tokio::test]
async fn singleton_cannot_be_reordered() {
    let (_, hero) = collection::<Hero>();
    let saved = hero.set(&Hero::new("Ada", "Engineer")).await.unwrap();

    let err = hero.reorder(&saved.id, Direction::Down).await.unwrap_err();
    assert!(matches!(err, SyncError::Unsupported { operation: "reorder", .. }));
}

// ── Reorder ─────────────────────────────────────────────────────

#[tokio::test]
async fn reorder_swaps_exactly_two_positions() {
    let (store, skills) = collection::<Skill>();
    let created = seed_skills(&skills).await;
    let updates_before = store.op_count("skills", Op::Update);

    assert!(skills.reorder(&created[2].id, Direction::Up).await.unwrap());
    assert_eq!(store.op_count("skills", Op::Update), updates_before + 2);

    let after = skills.get_all(false).await;
    assert_eq!(
        ids(&after),
        [created[0].id.as_str(), created[2].id.as_str(), created[1].id.as_str()]
    );
    let positions: Vec<_> = after.iter().map(|s| s.display_order).collect();
    assert_eq!(positions, [0, 1, 2]);
}

#[tokio::test]
async fn reorder_at_boundary_is_a_noop() {
    let (store, skills) = collection::<Skill>();
    let created = seed_skills(&skills).await;
    let updates_before = store.op_count("skills", Op::Update);

    assert!(!skills.reorder(&created[0].id, Direction::Up).await.unwrap());
    assert!(!skills.reorder(&created[2].id, Direction::Down).await.unwrap());
    assert_eq!(store.op_count("skills", Op::Update), updates_before);
}

#[tokio::test]
async fn reorder_unknown_id_is_not_found() {
    let (_, skills) = collection::<Skill>();
    seed_skills(&skills).await;
    let err = skills.reorder("ghost", Direction::Down).await.unwrap_err();
    assert!(matches!(err, SyncError::NotFound { .. }));
}

#[test]
fn direction_parses_and_finds_neighbours() {
    assert_eq!("UP".parse::<Direction>().unwrap(), Direction::Up);
    assert_eq!("down".parse::<Direction>().unwrap(), Direction::Down);
    assert!("sideways".parse::<Direction>().is_err());

    assert_eq!(Direction::Up.neighbour(0, 3), None);
    assert_eq!(Direction::Up.neighbour(2, 3), Some(1));
    assert_eq!(Direction::Down.neighbour(2, 3), None);
    assert_eq!(Direction::Down.neighbour(0, 3), Some(1));
}

// ── Search ──────────────────────────────────────────────────────

#[tokio::test]
async fn search_matches_text_and_tags_and_skips_cache() {
    let (store, projects) = collection::<Project>();
    let mut api = Project::new("Realtime API", "backend");
    api.technologies = vec!["Rust".into(), "Tokio".into()];
    let mut site = Project::new("Portfolio site", "frontend");
    site.description = "Built with rust and wasm".into();
    let other = Project::new("Mobile app", "mobile");
    for p in [&api, &site, &other] {
        projects.create(p).await.unwrap();
    }
    let selects = store.select_count("projects");

    let hits = projects.search(&SearchQuery::new("RUST")).await.unwrap();
    let titles: Vec<_> = hits.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, ["Realtime API", "Portfolio site"]);

    let hits = projects.search(&SearchQuery::new("tokio")).await.unwrap();
    assert_eq!(hits.len(), 1);

    let hits = projects
        .search(&SearchQuery::new("rust").filter("category", "frontend"))
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title, "Portfolio site");

    assert_eq!(store.select_count("projects"), selects + 3);
}

#[tokio::test]
async fn search_hides_soft_deleted_records() {
    let (_, projects) = collection::<Project>();
    let p = projects.create(&Project::new("Rust CLI", "tools")).await.unwrap();
    projects.delete(&p.id).await.unwrap();

    assert!(projects.search(&SearchQuery::new("rust")).await.unwrap().is_empty());
}

#[tokio::test]
async fn published_filter_selects_published_posts() {
    let (_, blog) = collection::<BlogPost>();
    let mut live = BlogPost::new("Live", "a", "Ada", "Rust");
    live.published = true;
    blog.create(&live).await.unwrap();
    blog.create(&BlogPost::new("Draft", "b", "Ada", "Rust")).await.unwrap();

    let hits = blog.search(&SearchQuery::published()).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title, "Live");
}

#[tokio::test]
async fn search_failure_is_an_error() {
    let (store, projects) = collection::<Project>();
    store.set_offline(true);
    assert!(projects.search(&SearchQuery::new("x")).await.is_err());
}

#[tokio::test]
async fn find_serves_from_cache() {
    let (store, skills) = collection::<Skill>();
    let created = seed_skills(&skills).await;

    let found = skills.find(&created[1].id).await.unwrap();
    assert_eq!(found.name, "Go");
    assert!(skills.find("ghost").await.is_none());
    assert_eq!(store.select_count("skills"), 4);
}

#[tokio::test]
async fn store_rows_are_used_verbatim() {
    let (store, skills) = collection::<Skill>();
    let inserted = store
        .insert(
            "skills",
            serde_json::from_value(json!({
                "name": "Seeded", "category": "Tools", "level": 40,
                "display_order": 0, "is_active": true
            }))
            .unwrap(),
        )
        .await
        .unwrap();

    let all = skills.get_all(false).await;
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, inserted["id"].as_str().unwrap());
}

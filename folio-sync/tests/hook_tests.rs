use folio_model::{Hero, Skill};
use folio_store::{MemoryStore, Op, Row};
use folio_sync::{CachedCollection, Direction, EntityHook, SyncConfig, SyncError};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::future::Future;
use std::pin::pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use std::time::Duration;

fn collection<T: folio_model::Entity>(
    config: SyncConfig,
) -> (Arc<MemoryStore>, CachedCollection<T>) {
    let store = Arc::new(MemoryStore::new());
    let collection = CachedCollection::new(store.clone(), config);
    (store, collection)
}

fn fast_expiry() -> SyncConfig {
    SyncConfig {
        cache_ttl_secs: 5,
        poll_interval_secs: 10,
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

fn row(value: serde_json::Value) -> Row {
    serde_json::from_value(value).unwrap()
}

fn names(records: &[Skill]) -> Vec<&str> {
    records.iter().map(|s| s.name.as_str()).collect()
}

async fn with_skills(skills: &CachedCollection<Skill>) -> Vec<Skill> {
    let mut created = Vec::new();
    for (name, level) in [("Rust", 90), ("Go", 70)] {
        created.push(skills.create(&Skill::new(name, "Languages", level)).await.unwrap());
    }
    created
}

// ── Mount ───────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn mount_loads_current_records() {
    let (_, skills) = collection::<Skill>(SyncConfig::default());
    with_skills(&skills).await;

    let hook = EntityHook::mount(skills.clone()).await;
    let state = hook.state();
    assert_eq!(names(&state.data), ["Rust", "Go"]);
    assert!(!state.is_loading);
    assert!(state.is_online);
    assert_eq!(state.error, None);
    assert!(hook.is_mounted());
}

#[tokio::test(start_paused = true)]
async fn mount_against_offline_store_reports_error() {
    let (store, skills) = collection::<Skill>(SyncConfig::default());
    store.set_offline(true);

    let hook = EntityHook::mount(skills).await;
    let state = hook.state();
    assert!(state.data.is_empty());
    assert!(!state.is_loading);
    assert!(!state.is_online);
    assert!(state.error.is_some());
}

#[test]
fn mount_outside_a_runtime_skips_push_and_polling() {
    let (store, skills) = collection::<Skill>(SyncConfig::default());
    store.seed("skills", [row(json!({ "name": "Rust", "is_active": true }))]);

    let mut mount = pin!(EntityHook::mount(skills.clone()));
    let mut cx = Context::from_waker(Waker::noop());
    let Poll::Ready(hook) = mount.as_mut().poll(&mut cx) else {
        panic!("mounting over a memory store never waits");
    };

    assert_eq!(names(&hook.data()), ["Rust"]);
    assert!(!hook.state().is_loading);
    assert!(!skills.has_live_channel());
    assert_eq!(skills.subscriber_count(), 0);
    assert_eq!(store.open_channels("skills"), 0);

    hook.unmount();
    assert!(!hook.is_mounted());
}

// ── Subscription lifecycle ──────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn hooks_share_one_channel_until_all_unmount() {
    let (store, skills) = collection::<Skill>(SyncConfig::default());

    let a = EntityHook::mount(skills.clone()).await;
    let b = EntityHook::mount(skills.clone()).await;
    let c = EntityHook::mount(skills.clone()).await;
    assert_eq!(store.open_channels("skills"), 1);
    assert_eq!(skills.subscriber_count(), 3);

    a.unmount();
    a.unmount();
    assert_eq!(skills.subscriber_count(), 2);
    drop(b);
    assert_eq!(store.open_channels("skills"), 1);

    c.unmount();
    assert_eq!(store.open_channels("skills"), 0);
    assert!(!skills.has_live_channel());
}

#[tokio::test(start_paused = true)]
async fn pushed_changes_replace_the_view() {
    let (_, skills) = collection::<Skill>(SyncConfig::default());
    let hook = EntityHook::mount(skills.clone()).await;
    let mut changes = hook.watch();
    changes.borrow_and_update();

    skills.create(&Skill::new("Rust", "Languages", 90)).await.unwrap();
    changes.changed().await.unwrap();

    assert_eq!(names(&hook.data()), ["Rust"]);
}

#[tokio::test(start_paused = true)]
async fn unmounted_hook_ignores_pushes() {
    let (_, skills) = collection::<Skill>(SyncConfig::default());
    let hook = EntityHook::mount(skills.clone()).await;
    let other = EntityHook::mount(skills.clone()).await;

    hook.unmount();
    skills.create(&Skill::new("Rust", "Languages", 90)).await.unwrap();
    settle().await;

    assert!(hook.data().is_empty());
    assert_eq!(other.data().len(), 1);
}

// ── Optimistic updates ──────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn update_is_visible_before_the_push_arrives() {
    let (_, skills) = collection::<Skill>(SyncConfig::default());
    let created = with_skills(&skills).await;
    let hook = EntityHook::mount(skills.clone()).await;

    let saved = hook.update(&created[1].id, &json!({ "name": "Golang" })).await.unwrap();
    assert_eq!(names(&hook.data()), ["Rust", "Golang"]);

    settle().await;
    let data = hook.data();
    assert_eq!(names(&data), ["Rust", "Golang"]);
    assert_eq!(data[1].updated_at, saved.updated_at);
}

#[tokio::test(start_paused = true)]
async fn failed_update_rolls_back_to_previous_snapshot() {
    let (store, skills) = collection::<Skill>(SyncConfig::default());
    let created = with_skills(&skills).await;
    let hook = EntityHook::mount(skills.clone()).await;
    let before = hook.data();

    store.fail_next(Op::Update);
    let err = hook
        .update(&created[0].id, &json!({ "name": "Rusty" }))
        .await
        .unwrap_err();
    assert!(err.is_remote());

    assert_eq!(*hook.data(), *before);
    assert!(hook.state().error.is_some());
    assert_eq!(store.row("skills", &created[0].id).unwrap()["name"], "Rust");
}

#[tokio::test(start_paused = true)]
async fn invalid_update_rolls_back_without_writing() {
    let (store, skills) = collection::<Skill>(SyncConfig::default());
    let created = with_skills(&skills).await;
    let hook = EntityHook::mount(skills.clone()).await;
    let before = hook.data();

    let err = hook
        .update(&created[0].id, &json!({ "level": 250 }))
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Validation(_)));
    assert_eq!(*hook.data(), *before);
    assert_eq!(store.op_count("skills", Op::Update), 0);
}

#[tokio::test(start_paused = true)]
async fn offline_delete_restores_cached_snapshot() {
    let (store, skills) = collection::<Skill>(SyncConfig::default());
    let created = with_skills(&skills).await;
    let hook = EntityHook::mount(skills.clone()).await;
    let before = hook.data();

    store.set_offline(true);
    assert!(hook.delete(&created[0].id).await.is_err());

    let state = hook.state();
    assert_eq!(*state.data, *before);
    assert!(!state.is_online);
}

#[tokio::test(start_paused = true)]
async fn reorder_swaps_in_view_immediately() {
    let (_, skills) = collection::<Skill>(SyncConfig::default());
    let created = with_skills(&skills).await;
    let hook = EntityHook::mount(skills.clone()).await;

    assert!(hook.reorder(&created[1].id, Direction::Up).await.unwrap());
    let data = hook.data();
    assert_eq!(names(&data), ["Go", "Rust"]);
    assert_eq!(data[0].display_order, 0);
    assert_eq!(data[1].display_order, 1);

    settle().await;
    assert_eq!(names(&hook.data()), ["Go", "Rust"]);
}

#[tokio::test(start_paused = true)]
async fn delete_and_create_through_hook() {
    let (_, skills) = collection::<Skill>(SyncConfig::default());
    let created = with_skills(&skills).await;
    let hook = EntityHook::mount(skills.clone()).await;

    assert!(hook.delete(&created[0].id).await.unwrap());
    assert_eq!(names(&hook.data()), ["Go"]);

    hook.create(&Skill::new("SQL", "Data", 60)).await.unwrap();
    assert_eq!(names(&hook.data()), ["Go", "SQL"]);

    settle().await;
    let data = hook.data();
    assert_eq!(names(&data), ["Go", "SQL"]);
    assert!(data.iter().all(|s| !s.id.is_empty()));
}

#[tokio::test(start_paused = true)]
async fn singleton_create_replaces_view() {
    let (store, hero) = collection::<Hero>(SyncConfig::default());
    let hook = EntityHook::mount(hero.clone()).await;

    hook.create(&Hero::new("Ada", "Engineer")).await.unwrap();
    hook.create(&Hero::new("Ada Lovelace", "Engineer")).await.unwrap();
    assert_eq!(hook.data().len(), 1);

    settle().await;
    assert_eq!(hook.data()[0].name, "Ada Lovelace");
    assert_eq!(store.rows("hero").len(), 1);
}

// ── Polling fallback ────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn polling_picks_up_changes_without_a_channel() {
    let (store, skills) = collection::<Skill>(fast_expiry());
    store.fail_next(Op::Subscribe);
    let hook = EntityHook::mount(skills.clone()).await;
    assert!(!skills.has_live_channel());
    assert!(hook.data().is_empty());

    store.seed("skills", [row(json!({ "name": "Rust", "is_active": true }))]);
    tokio::time::sleep(Duration::from_secs(11)).await;

    assert_eq!(names(&hook.data()), ["Rust"]);
}

#[tokio::test(start_paused = true)]
async fn mutation_without_channel_refreshes_view() {
    let (store, skills) = collection::<Skill>(SyncConfig::default());
    store.fail_next(Op::Subscribe);
    let hook = EntityHook::mount(skills).await;

    let saved = hook.create(&Skill::new("Rust", "Languages", 90)).await.unwrap();
    assert_eq!(hook.data()[0].id, saved.id);
}

#[tokio::test(start_paused = true)]
async fn polling_marks_view_offline_and_keeps_data() {
    let (store, skills) = collection::<Skill>(fast_expiry());
    with_skills(&skills).await;
    let hook = EntityHook::mount(skills).await;

    store.set_offline(true);
    tokio::time::sleep(Duration::from_secs(11)).await;

    let state = hook.state();
    assert!(!state.is_online);
    assert_eq!(state.data.len(), 2);

    store.set_offline(false);
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(hook.state().is_online);
    assert_eq!(hook.state().error, None);
}

#[tokio::test(start_paused = true)]
async fn identical_poll_results_do_not_wake_watchers() {
    let (store, skills) = collection::<Skill>(fast_expiry());
    with_skills(&skills).await;
    let hook = EntityHook::mount(skills).await;
    let mut changes = hook.watch();
    changes.borrow_and_update();
    let selects = store.select_count("skills");

    tokio::time::sleep(Duration::from_secs(11)).await;
    assert_eq!(store.select_count("skills"), selects + 1);
    assert!(!changes.has_changed().unwrap());
}

#[tokio::test(start_paused = true)]
async fn polling_stops_after_unmount() {
    let (store, skills) = collection::<Skill>(fast_expiry());
    let hook = EntityHook::mount(skills).await;
    let selects = store.select_count("skills");

    hook.unmount();
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(store.select_count("skills"), selects);
}

#[tokio::test(start_paused = true)]
async fn refresh_forces_a_read() {
    let (store, skills) = collection::<Skill>(SyncConfig::default());
    let hook = EntityHook::mount(skills).await;
    store.seed("skills", [row(json!({ "name": "Rust", "is_active": true }))]);

    assert!(hook.refresh(false).await.is_empty());
    let records = hook.refresh(true).await;
    assert_eq!(records.len(), 1);
    assert_eq!(hook.data().len(), 1);
    assert!(!hook.state().is_loading);
}

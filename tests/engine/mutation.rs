//! Single-record operations: add, update, toggle, remove.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Notify;

use taskdeck::engine::TaskEngine;
use taskdeck::error::{EngineError, ValidationError};
use taskdeck::store::{MemoryStore, RemoteStore, StoreError};
use taskdeck::types::{BulkPatch, NewTask, OrderEntry, Task, TaskDraft, TaskPatch};

use crate::common::{collect_toasts, date, draft, engine, seeded_engine, OWNER};

// ============================================================================
// add
// ============================================================================

#[tokio::test]
async fn add_rejects_empty_title() {
    let (_, engine) = engine().await;
    let err = engine.add(draft("   ")).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Validation(ValidationError::EmptyTitle)
    ));
    assert!(engine.is_empty());
}

#[tokio::test]
async fn add_rejects_oversized_tag_list() {
    let (_, engine) = engine().await;
    let mut d = draft("tagged");
    d.tags = (0..21).map(|i| format!("t{i}")).collect();
    let err = engine.add(d).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Validation(ValidationError::TooManyTags { count: 21, max: 20 })
    ));
}

#[tokio::test]
async fn add_trims_title_and_prepends_confirmed_record() {
    let (store, engine) = engine().await;
    let task = engine.add(draft("  Buy milk  ")).await.unwrap();
    assert_eq!(task.title, "Buy milk");
    assert_eq!(task.owner_id, OWNER);
    assert_eq!(engine.tasks()[0].id, task.id);
    assert_eq!(store.rows_for(OWNER).len(), 1);
}

#[tokio::test]
async fn add_front_inserts_with_decreasing_order_index() {
    let (_, engine) = seeded_engine(&["A", "B", "C"]).await;
    let by_title = |t: &str| {
        engine
            .tasks()
            .into_iter()
            .find(|x| x.title == t)
            .unwrap()
            .order_index
    };
    // First add lands on 0 (empty cache); each later add goes one below the min.
    assert_eq!(by_title("A"), 0);
    assert_eq!(by_title("B"), -1);
    assert_eq!(by_title("C"), -2);
}

#[tokio::test]
async fn add_failure_leaves_no_local_trace() {
    let (store, engine) = engine().await;
    store.fail_next(StoreError::Unavailable("down".to_string()));
    let toasts = collect_toasts(&engine);

    assert!(engine.add(draft("doomed")).await.is_err());

    assert!(engine.is_empty());
    assert!(store.is_empty());
    assert_eq!(toasts.lock().len(), 1);
}

#[tokio::test]
async fn add_defaults_category_to_first() {
    let (_, engine) = engine().await;
    engine.set_categories(vec!["Home".to_string(), "Work".to_string()]);
    let task = engine.add(draft("chore")).await.unwrap();
    assert_eq!(task.category, "Home");
}

#[tokio::test]
async fn add_rejects_unknown_category() {
    let (_, engine) = engine().await;
    engine.set_categories(vec!["Home".to_string()]);
    let mut d = draft("chore");
    d.category = "Gym".to_string();
    let err = engine.add(d).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Validation(ValidationError::UnknownCategory(_))
    ));
}

#[tokio::test]
async fn operations_require_a_session() {
    let store = Arc::new(MemoryStore::new());
    let engine = TaskEngine::new(store);
    let err = engine.add(draft("x")).await.unwrap_err();
    assert!(matches!(err, EngineError::NoSession));
}

// ============================================================================
// update
// ============================================================================

#[tokio::test]
async fn update_merges_confirmed_fields() {
    let (_, engine) = seeded_engine(&["task"]).await;
    let id = engine.tasks()[0].id.clone();

    let patch = TaskPatch {
        note: Some("details".to_string()),
        due_date: Some(Some(date(2026, 9, 1))),
        ..Default::default()
    };
    let updated = engine.update(&id, patch).await.unwrap().unwrap();
    assert_eq!(updated.note, "details");
    assert_eq!(engine.task(&id).unwrap().due_date, Some(date(2026, 9, 1)));
}

#[tokio::test]
async fn update_is_not_optimistic_on_failure() {
    let (store, engine) = seeded_engine(&["original"]).await;
    let id = engine.tasks()[0].id.clone();
    store.fail_next(StoreError::Rejected("constraint".to_string()));

    let patch = TaskPatch {
        title: Some("edited".to_string()),
        ..Default::default()
    };
    assert!(engine.update(&id, patch).await.is_err());

    // The attempted change was never shown.
    assert_eq!(engine.task(&id).unwrap().title, "original");
}

#[tokio::test]
async fn update_missing_id_is_a_quiet_no_op() {
    let (store, engine) = seeded_engine(&["only"]).await;
    let patch = TaskPatch {
        title: Some("new".to_string()),
        ..Default::default()
    };
    let outcome = engine.update("gone", patch).await.unwrap();
    assert!(outcome.is_none());
    assert_eq!(store.rows_for(OWNER)[0].title, "only");
}

#[tokio::test]
async fn update_rejects_blank_title_patch() {
    let (_, engine) = seeded_engine(&["t"]).await;
    let id = engine.tasks()[0].id.clone();
    let patch = TaskPatch {
        title: Some("  ".to_string()),
        ..Default::default()
    };
    assert!(matches!(
        engine.update(&id, patch).await.unwrap_err(),
        EngineError::Validation(ValidationError::EmptyTitle)
    ));
}

// ============================================================================
// toggle_completed
// ============================================================================

#[tokio::test]
async fn toggle_flips_immediately_and_confirms() {
    let (store, engine) = seeded_engine(&["t"]).await;
    let id = engine.tasks()[0].id.clone();

    let now = engine.toggle_completed(&id).await.unwrap();
    assert_eq!(now, Some(true));
    assert!(engine.task(&id).unwrap().completed);
    assert!(store.rows_for(OWNER)[0].completed);
}

#[tokio::test]
async fn toggle_failure_reverts_to_the_exact_prior_flag() {
    let (store, engine) = seeded_engine(&["t"]).await;
    let id = engine.tasks()[0].id.clone();
    let toasts = collect_toasts(&engine);
    store.fail_next(StoreError::Unavailable("down".to_string()));

    assert!(engine.toggle_completed(&id).await.is_err());

    assert!(!engine.task(&id).unwrap().completed);
    assert_eq!(toasts.lock().len(), 1, "failure must emit a notification");
}

#[tokio::test]
async fn toggle_missing_id_is_a_quiet_no_op() {
    let (_, engine) = seeded_engine(&["t"]).await;
    assert_eq!(engine.toggle_completed("gone").await.unwrap(), None);
}

// ============================================================================
// remove
// ============================================================================

#[tokio::test]
async fn remove_deletes_and_stages_undo() {
    let (store, engine) = seeded_engine(&["t"]).await;
    let id = engine.tasks()[0].id.clone();
    let toasts = collect_toasts(&engine);

    assert!(engine.remove(&id).await.unwrap());

    assert!(engine.is_empty());
    assert!(store.rows_for(OWNER).is_empty());
    assert!(engine.undo_available());
    let toasts = toasts.lock();
    assert_eq!(toasts[0].action.as_deref(), Some("Undo"));
}

#[tokio::test]
async fn remove_failure_reinserts_at_prior_position() {
    let (store, engine) = seeded_engine(&["A", "B", "C"]).await;
    // Cache order is C, B, A (prepend on add). Remove the middle record.
    let order_before: Vec<String> = engine.tasks().into_iter().map(|t| t.id).collect();
    let middle = order_before[1].clone();
    store.fail_next(StoreError::Unavailable("down".to_string()));

    assert!(engine.remove(&middle).await.is_err());

    let order_after: Vec<String> = engine.tasks().into_iter().map(|t| t.id).collect();
    assert_eq!(order_after, order_before);
    assert!(!engine.undo_available(), "failed delete must not stage undo");
}

#[tokio::test]
async fn remove_missing_id_is_a_quiet_no_op() {
    let (_, engine) = seeded_engine(&["t"]).await;
    assert!(!engine.remove("gone").await.unwrap());
}

// ============================================================================
// Session epoch guard
// ============================================================================

/// A store whose deletes block until released, for interleaving a session
/// change with an in-flight call. `release_ok` decides whether the released
/// call succeeds or fails.
struct GatedStore {
    inner: MemoryStore,
    gate: Notify,
    release_ok: bool,
}

impl GatedStore {
    fn new(release_ok: bool) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryStore::new(),
            gate: Notify::new(),
            release_ok,
        })
    }
}

#[async_trait]
impl RemoteStore for GatedStore {
    async fn insert(&self, owner_id: &str, row: NewTask) -> Result<Task, StoreError> {
        self.inner.insert(owner_id, row).await
    }
    async fn update(&self, id: &str, owner_id: &str, patch: TaskPatch) -> Result<Task, StoreError> {
        self.inner.update(id, owner_id, patch).await
    }
    async fn delete_one(&self, id: &str, owner_id: &str) -> Result<(), StoreError> {
        self.gate.notified().await;
        if self.release_ok {
            self.inner.delete_one(id, owner_id).await
        } else {
            Err(StoreError::Unavailable("released with failure".to_string()))
        }
    }
    async fn delete_many(&self, ids: &[String], owner_id: &str) -> Result<(), StoreError> {
        self.gate.notified().await;
        if self.release_ok {
            self.inner.delete_many(ids, owner_id).await
        } else {
            Err(StoreError::Unavailable("released with failure".to_string()))
        }
    }
    async fn update_many(
        &self,
        ids: &[String],
        owner_id: &str,
        patch: BulkPatch,
    ) -> Result<(), StoreError> {
        self.inner.update_many(ids, owner_id, patch).await
    }
    async fn upsert_order(&self, entries: &[OrderEntry]) -> Result<(), StoreError> {
        self.inner.upsert_order(entries).await
    }
    async fn list_all(&self, owner_id: &str) -> Result<Vec<Task>, StoreError> {
        self.inner.list_all(owner_id).await
    }
}

#[tokio::test]
async fn stale_completion_after_session_change_leaves_cache_alone() {
    let store = GatedStore::new(false);
    let engine = Arc::new(TaskEngine::new(store.clone()));
    engine.start_session(OWNER).await.unwrap();
    let task = engine.add(TaskDraft { title: "t".to_string(), ..Default::default() }).await.unwrap();

    // Start a remove whose remote call will fail only after sign-out.
    let engine2 = engine.clone();
    let id = task.id.clone();
    let inflight = tokio::spawn(async move { engine2.remove(&id).await });

    tokio::task::yield_now().await;
    engine.reset_session();
    store.gate.notify_one();

    // The call failed, but the rollback must not resurrect the record into
    // the post-sign-out cache.
    assert!(inflight.await.unwrap().is_err());
    assert!(engine.is_empty());
}

#[tokio::test]
async fn stale_delete_success_does_not_arm_undo_for_the_next_session() {
    let store = GatedStore::new(true);
    let engine = Arc::new(TaskEngine::new(store.clone()));
    engine.start_session("alice").await.unwrap();
    let task = engine.add(draft("hers")).await.unwrap();

    // Alice's delete completes only after Bob has signed in.
    let engine2 = engine.clone();
    let id = task.id.clone();
    let inflight = tokio::spawn(async move { engine2.remove(&id).await });
    tokio::task::yield_now().await;

    engine.start_session("bob").await.unwrap();
    store.gate.notify_one();

    assert!(inflight.await.unwrap().unwrap());
    assert!(
        !engine.undo_available(),
        "a superseded session's snapshot must never be staged"
    );
    assert_eq!(engine.undo().await.unwrap(), 0);
    assert!(engine.is_empty(), "undo must not copy rows across owners");
}

#[tokio::test]
async fn stale_bulk_delete_success_does_not_arm_undo_for_the_next_session() {
    let store = GatedStore::new(true);
    let engine = Arc::new(TaskEngine::new(store.clone()));
    engine.start_session("alice").await.unwrap();
    let a = engine.add(draft("one")).await.unwrap();
    let b = engine.add(draft("two")).await.unwrap();

    let engine2 = engine.clone();
    let ids = vec![a.id, b.id];
    let inflight = tokio::spawn(async move { engine2.bulk_delete(&ids).await });
    tokio::task::yield_now().await;

    engine.start_session("bob").await.unwrap();
    store.gate.notify_one();

    assert_eq!(inflight.await.unwrap().unwrap(), 2);
    assert!(!engine.undo_available());
    assert!(engine.is_empty());
}

#[tokio::test]
async fn failed_session_load_does_not_activate_the_session() {
    let store = Arc::new(MemoryStore::new());
    let engine = TaskEngine::new(store.clone());
    store.fail_next(StoreError::Unavailable("down".to_string()));

    assert!(engine.start_session(OWNER).await.is_err());

    // No half-open session: mutations stay gated until a load succeeds.
    let err = engine.add(draft("x")).await.unwrap_err();
    assert!(matches!(err, EngineError::NoSession));
    assert_eq!(engine.start_session(OWNER).await.unwrap(), 0);
    assert!(engine.add(draft("x")).await.is_ok());
}

//! Time-boxed undo of destructive operations.

use std::collections::HashSet;
use std::time::Duration;

use taskdeck::store::StoreError;

use crate::common::{seeded_engine, OWNER};

fn ids_of(engine: &taskdeck::engine::TaskEngine, titles: &[&str]) -> Vec<String> {
    titles
        .iter()
        .map(|title| {
            engine
                .tasks()
                .into_iter()
                .find(|t| &t.title == title)
                .unwrap()
                .id
        })
        .collect()
}

#[tokio::test]
async fn bulk_delete_then_undo_restores_equivalent_records() {
    let (store, engine) = seeded_engine(&["X", "Y", "Z"]).await;
    let x = engine.tasks().into_iter().find(|t| t.title == "X").unwrap();
    let targets = ids_of(&engine, &["X", "Y"]);

    engine.bulk_delete(&targets).await.unwrap();
    assert_eq!(engine.len(), 1);

    let n = engine.undo().await.unwrap();
    assert_eq!(n, 2);

    let titles: HashSet<String> = engine.tasks().into_iter().map(|t| t.title).collect();
    assert_eq!(titles.len(), 3);
    assert!(titles.contains("X") && titles.contains("Y"));

    // Fields identical, id possibly fresh.
    let restored_x = engine.tasks().into_iter().find(|t| t.title == "X").unwrap();
    assert_eq!(restored_x.created_at, x.created_at);
    assert_eq!(restored_x.order_index, x.order_index);
    assert_eq!(store.rows_for(OWNER).len(), 3);
    assert!(!engine.undo_available());
}

#[tokio::test(start_paused = true)]
async fn undo_after_expiry_is_a_no_op() {
    let (store, engine) = seeded_engine(&["X"]).await;
    let targets = ids_of(&engine, &["X"]);
    engine.bulk_delete(&targets).await.unwrap();

    tokio::time::sleep(Duration::from_millis(6100)).await;

    assert!(!engine.undo_available());
    assert_eq!(engine.undo().await.unwrap(), 0);
    assert!(engine.is_empty());
    assert!(store.rows_for(OWNER).is_empty());
}

#[tokio::test(start_paused = true)]
async fn undo_just_inside_the_window_still_works() {
    let (_, engine) = seeded_engine(&["X"]).await;
    engine.remove(&ids_of(&engine, &["X"])[0]).await.unwrap();

    tokio::time::sleep(Duration::from_millis(5900)).await;

    assert!(engine.undo_available());
    assert_eq!(engine.undo().await.unwrap(), 1);
    assert_eq!(engine.len(), 1);
}

#[tokio::test]
async fn a_new_destructive_action_replaces_the_pending_unit() {
    let (_, engine) = seeded_engine(&["X", "Y"]).await;
    let ids = ids_of(&engine, &["X", "Y"]);

    engine.remove(&ids[0]).await.unwrap();
    engine.remove(&ids[1]).await.unwrap();

    // Only the most recent delete is undoable.
    assert_eq!(engine.undo().await.unwrap(), 1);
    let titles: Vec<String> = engine.tasks().into_iter().map(|t| t.title).collect();
    assert_eq!(titles, ["Y"]);
}

#[tokio::test]
async fn undo_failure_clears_the_buffer_anyway() {
    let (store, engine) = seeded_engine(&["X"]).await;
    engine.remove(&ids_of(&engine, &["X"])[0]).await.unwrap();

    store.fail_next(StoreError::Unavailable("down".to_string()));
    assert!(engine.undo().await.is_err());

    // Best-effort: no second chance.
    assert!(!engine.undo_available());
    assert_eq!(engine.undo().await.unwrap(), 0);
}

#[tokio::test]
async fn session_reset_discards_the_pending_unit() {
    let (_, engine) = seeded_engine(&["X"]).await;
    engine.remove(&ids_of(&engine, &["X"])[0]).await.unwrap();
    assert!(engine.undo_available());

    engine.reset_session();
    assert!(!engine.undo_available());
}

#[tokio::test]
async fn undo_reports_the_staged_message() {
    let (_, engine) = seeded_engine(&["X"]).await;
    engine.remove(&ids_of(&engine, &["X"])[0]).await.unwrap();
    assert_eq!(engine.undo_message().as_deref(), Some("Task deleted"));
}

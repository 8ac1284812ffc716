//! Manual drag-and-drop reordering through the engine.

use taskdeck::store::StoreError;
use taskdeck::view::{Filter, SortKey, ViewState};

use crate::common::{seeded_engine, OWNER};

fn manual_view() -> ViewState {
    ViewState {
        filter: Filter::All,
        search: String::new(),
        sort: SortKey::Manual,
    }
}

fn visible_titles(engine: &taskdeck::engine::TaskEngine) -> Vec<String> {
    engine
        .visible(&manual_view(), chrono::Utc::now().date_naive())
        .into_iter()
        .map(|t| t.title)
        .collect()
}

fn id_of(engine: &taskdeck::engine::TaskEngine, title: &str) -> String {
    engine
        .tasks()
        .into_iter()
        .find(|t| t.title == title)
        .unwrap()
        .id
}

#[tokio::test]
async fn add_then_reorder_scenario() {
    // Front insertion: the last-added task sorts first.
    let (store, engine) = seeded_engine(&["A", "B", "C"]).await;
    assert_eq!(visible_titles(&engine), ["C", "B", "A"]);

    // Drag A to before B.
    let a = id_of(&engine, "A");
    let b = id_of(&engine, "B");
    assert!(engine.reorder(&a, &b, &manual_view()).await.unwrap());

    assert_eq!(visible_titles(&engine), ["C", "A", "B"]);

    // Fully renumbered 0-based, both locally and in the store.
    for (rows, label) in [(engine.tasks(), "cache"), (store.rows_for(OWNER), "store")] {
        let index_of = |title: &str| rows.iter().find(|t| t.title == title).unwrap().order_index;
        assert_eq!(index_of("C"), 0, "{label}");
        assert_eq!(index_of("A"), 1, "{label}");
        assert_eq!(index_of("B"), 2, "{label}");
    }
}

#[tokio::test]
async fn reorder_is_refused_outside_manual_sort() {
    let (_, engine) = seeded_engine(&["A", "B"]).await;
    let a = id_of(&engine, "A");
    let b = id_of(&engine, "B");

    let view = ViewState {
        sort: SortKey::CreatedAsc,
        ..manual_view()
    };
    assert!(!engine.reorder(&a, &b, &view).await.unwrap());
}

#[tokio::test]
async fn reorder_is_refused_while_narrowed() {
    let (_, engine) = seeded_engine(&["A", "B"]).await;
    let a = id_of(&engine, "A");
    let b = id_of(&engine, "B");

    let filtered = ViewState {
        filter: Filter::Active,
        ..manual_view()
    };
    assert!(!engine.reorder(&a, &b, &filtered).await.unwrap());

    let searched = ViewState {
        search: "A".to_string(),
        ..manual_view()
    };
    assert!(!engine.reorder(&a, &b, &searched).await.unwrap());
}

#[tokio::test]
async fn reorder_onto_itself_is_a_no_op() {
    let (_, engine) = seeded_engine(&["A", "B"]).await;
    let a = id_of(&engine, "A");
    assert!(!engine.reorder(&a, &a, &manual_view()).await.unwrap());
}

#[tokio::test]
async fn reorder_failure_rolls_back_the_indices() {
    let (store, engine) = seeded_engine(&["A", "B", "C"]).await;
    let before = visible_titles(&engine);
    let a = id_of(&engine, "A");
    let c = id_of(&engine, "C");

    store.fail_next(StoreError::Unavailable("down".to_string()));
    assert!(engine.reorder(&a, &c, &manual_view()).await.is_err());

    assert_eq!(visible_titles(&engine), before);
}

#[tokio::test]
async fn ordering_stays_stable_across_a_sequence_of_moves() {
    let (_, engine) = seeded_engine(&["A", "B", "C", "D"]).await;

    let moves = [("A", "C"), ("D", "B"), ("B", "A"), ("C", "D")];
    for (source, target) in moves {
        let s = id_of(&engine, source);
        let t = id_of(&engine, target);
        engine.reorder(&s, &t, &manual_view()).await.unwrap();

        // Re-sorting the cache by order_index always reproduces the order
        // the engine just produced.
        let projected = visible_titles(&engine);
        let mut resorted = engine.tasks();
        resorted.sort_by_key(|t| t.order_index);
        let resorted: Vec<String> = resorted.into_iter().map(|t| t.title).collect();
        assert_eq!(projected, resorted, "after moving {source} before {target}");
    }
}

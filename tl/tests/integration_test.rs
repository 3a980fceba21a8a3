//! Integration tests for tasklist
//!
//! These tests drive the controller, store and scheduler together, with
//! real file-backed storage where persistence matters.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use kvstore::{FileBackend, KeyValueStore, Storage};
use tasklist::controller::{AutoConfirm, ListController};
use tasklist::scheduler::AutoClearConfig;
use tasklist::state::{Subscription, TodoStore};
use tempfile::TempDir;

const DELAY: Duration = Duration::from_millis(500);

fn in_memory_controller() -> ListController {
    ListController::new(
        Arc::new(TodoStore::in_memory()),
        AutoClearConfig::with_delay(DELAY),
        Box::new(AutoConfirm(true)),
    )
}

fn file_storage(dir: &TempDir, namespace: &str) -> Arc<dyn KeyValueStore> {
    let backend = FileBackend::open(dir.path()).expect("Failed to open file backend");
    Arc::new(Storage::new(namespace, backend))
}

fn counting(store: &TodoStore) -> (Arc<AtomicUsize>, Subscription) {
    let count = Arc::new(AtomicUsize::new(0));
    let c = count.clone();
    let sub = store.subscribe(move || {
        c.fetch_add(1, Ordering::SeqCst);
    });
    (count, sub)
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_scenario_complete_auto_clear_then_clear_all() {
    let ctl = in_memory_controller();
    let first = ctl.add("Write unit tests").unwrap();
    ctl.add("Review architecture").unwrap();

    let stats = ctl.stats();
    assert_eq!((stats.active, stats.completed), (2, 0));

    assert!(ctl.toggle(first));
    assert!(ctl.is_pending(first));
    tokio::time::sleep(DELAY + Duration::from_millis(1)).await;

    assert!(ctl.store().get(first).is_none());
    assert!(!ctl.is_pending(first));
    let stats = ctl.stats();
    assert_eq!((stats.active, stats.completed), (1, 1));

    assert!(ctl.clear_all());
    let stats = ctl.stats();
    assert!(ctl.store().is_empty());
    assert_eq!((stats.active, stats.completed, stats.total), (0, 0, 0));
}

#[tokio::test(start_paused = true)]
async fn test_scenario_uncomplete_before_window_keeps_item() {
    let ctl = in_memory_controller();
    let id = ctl.add("Second thoughts").unwrap();
    let (count, sub) = counting(ctl.store());

    ctl.toggle(id);
    tokio::time::sleep(DELAY / 2).await;
    ctl.toggle(id);
    assert!(!ctl.is_pending(id));

    tokio::time::sleep(DELAY * 4).await;
    let item = ctl.store().get(id).expect("item should survive");
    assert!(!item.completed);
    assert_eq!(ctl.scheduler().pending_count(), 0);
    // Two toggles, no delete
    assert_eq!(count.load(Ordering::SeqCst), 2);
    assert!(sub.unsubscribe());
}

#[tokio::test(start_paused = true)]
async fn test_scenario_identical_edit_is_silent() {
    let ctl = in_memory_controller();
    let id = ctl.add("Same text").unwrap();
    let (count, _sub) = counting(ctl.store());

    assert!(!ctl.edit(id, "  Same text  "));
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_file_round_trip_across_restarts() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    let before = {
        let ctl = ListController::new(
            Arc::new(TodoStore::load(file_storage(&temp_dir, "tasks"))),
            AutoClearConfig::disabled(),
            Box::new(AutoConfirm(true)),
        );
        ctl.add("a");
        ctl.add("b");
        ctl.add("c");
        ctl.toggle(2);
        ctl.toggle(3);
        ctl.toggle(3);
        ctl.delete(1);
        ctl.edit(3, "c, revised");
        ctl.store().snapshot()
    };

    let reloaded = TodoStore::load(file_storage(&temp_dir, "tasks"));
    assert_eq!(reloaded.snapshot(), before);
    assert_eq!(reloaded.next_id(), 4);
    assert_eq!(reloaded.completed_total(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_auto_clear_is_persisted() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let ctl = ListController::new(
        Arc::new(TodoStore::load(file_storage(&temp_dir, "tasks"))),
        AutoClearConfig::with_delay(DELAY),
        Box::new(AutoConfirm(true)),
    );
    let id = ctl.add("vanish").unwrap();
    ctl.toggle(id);
    ctl.scheduler().wait_idle().await;

    let reloaded = TodoStore::load(file_storage(&temp_dir, "tasks"));
    assert!(reloaded.is_empty());
    assert_eq!(reloaded.completed_total(), 1);
}

#[tokio::test]
async fn test_namespaces_share_a_directory() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let work = TodoStore::load(file_storage(&temp_dir, "work"));
    let home = TodoStore::load(file_storage(&temp_dir, "home"));

    work.add_item("ship release");
    home.add_item("water plants");
    home.add_item("call plumber");

    let storage = file_storage(&temp_dir, "work");
    storage.clear().expect("clear should succeed");

    assert!(TodoStore::load(storage).is_empty());
    assert_eq!(TodoStore::load(file_storage(&temp_dir, "home")).len(), 2);
}

#[tokio::test]
async fn test_completed_items_are_not_rearmed_on_load() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    {
        let store = TodoStore::load(file_storage(&temp_dir, "tasks"));
        store.add_item("left completed");
        store.toggle_complete(1);
    }

    let ctl = ListController::new(
        Arc::new(TodoStore::load(file_storage(&temp_dir, "tasks"))),
        AutoClearConfig::with_delay(Duration::from_millis(10)),
        Box::new(AutoConfirm(true)),
    );
    assert!(!ctl.is_pending(1));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(ctl.store().get(1).is_some());
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_adds_get_unique_ids() {
    let store = Arc::new(TodoStore::in_memory());
    let mut handles = Vec::new();
    for worker in 0..4 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            (0..25)
                .filter_map(|n| store.push_item(&format!("w{} n{}", worker, n)))
                .collect::<Vec<_>>()
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.extend(handle.await.expect("worker panicked"));
    }
    ids.sort_unstable();
    assert_eq!(ids, (1..=100).collect::<Vec<u64>>());
    assert_eq!(store.next_id(), 101);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_subscriber_can_mutate_reentrantly() {
    let store = Arc::new(TodoStore::in_memory());
    let s = store.clone();
    // Echo every add of an "echo" item exactly once
    let sub = store.subscribe(move || {
        let last = s.items().last().cloned();
        if let Some(item) = last
            && item.text == "echo"
        {
            s.update_text(item.id, "echoed");
        }
    });

    store.add_item("echo");
    assert_eq!(store.get(1).unwrap().text, "echoed");
    assert!(sub.unsubscribe());
}

use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::constants::MEM_EVENT_HISTORY_CAPACITY;
use crate::StoreError;

#[tokio::test]
async fn test_get_missing_key_reports_current_index() {
    let store = MemKeysApi::new();
    store.set("/a", "1", SetOptions::default()).await.unwrap();

    let err = store.get("/missing").await.unwrap_err();
    assert!(err.is_key_not_found());
    assert_eq!(err.current_index(), Some(1));
}

#[tokio::test]
async fn test_set_and_get() {
    let store = MemKeysApi::new();
    let created = store.set("/a", "1", SetOptions::default()).await.unwrap();
    let updated = store.set("/a", "2", SetOptions::default()).await.unwrap();

    assert_eq!(created.modified_index, 1);
    assert_eq!(updated.created_index, 1);
    assert_eq!(updated.modified_index, 2);

    let read = store.get("/a").await.unwrap();
    assert_eq!(read.node.value, "2");
    assert_eq!(read.index, 2);
}

#[tokio::test]
async fn test_create_only_fails_on_existing_key() {
    let store = MemKeysApi::new();
    store.set("/a", "1", SetOptions::create_only()).await.unwrap();

    let err = store.set("/a", "2", SetOptions::create_only()).await.unwrap_err();
    assert!(err.is_node_exists());
    assert_eq!(store.get("/a").await.unwrap().node.value, "1");
}

#[tokio::test]
async fn test_compare_and_swap() {
    let store = MemKeysApi::new();
    let node = store.set("/a", "1", SetOptions::default()).await.unwrap();
    store.set("/a", "2", SetOptions::default()).await.unwrap();

    let err = store
        .set("/a", "3", SetOptions::compare_index(node.modified_index))
        .await
        .unwrap_err();
    assert!(err.is_version_conflict());

    let current = store.get("/a").await.unwrap().node.modified_index;
    store.set("/a", "3", SetOptions::compare_index(current)).await.unwrap();
    assert_eq!(store.get("/a").await.unwrap().node.value, "3");

    let missing = store.set("/b", "1", SetOptions::compare_index(1)).await.unwrap_err();
    assert!(missing.is_key_not_found());
}

#[tokio::test]
async fn test_compare_and_delete() {
    let store = MemKeysApi::new();
    let node = store.set("/a", "1", SetOptions::default()).await.unwrap();
    store.set("/a", "2", SetOptions::default()).await.unwrap();

    let err = store
        .delete("/a", DeleteOptions::compare_index(node.modified_index))
        .await
        .unwrap_err();
    assert!(err.is_version_conflict());

    let current = store.get("/a").await.unwrap().node.modified_index;
    store.delete("/a", DeleteOptions::compare_index(current)).await.unwrap();
    assert!(store.get("/a").await.unwrap_err().is_key_not_found());
    assert!(store
        .delete("/a", DeleteOptions::default())
        .await
        .unwrap_err()
        .is_key_not_found());
}

#[tokio::test]
async fn test_watch_returns_history_from_wait_index() {
    let store = MemKeysApi::new();
    store.set("/a", "1", SetOptions::default()).await.unwrap();
    store.set("/b", "x", SetOptions::default()).await.unwrap();
    store.set("/a", "2", SetOptions::default()).await.unwrap();

    let first = store
        .watch("/a", WatchOptions { wait_index: Some(1), recursive: false })
        .await
        .unwrap();
    assert_eq!(first.action, Action::Set);
    assert_eq!(first.value, "1");
    assert_eq!(first.prev_value, None);
    assert_eq!(first.version, 1);

    let second = store
        .watch("/a", WatchOptions { wait_index: Some(2), recursive: false })
        .await
        .unwrap();
    assert_eq!(second.value, "2");
    assert_eq!(second.prev_value.as_deref(), Some("1"));
    assert_eq!(second.version, 3);
}

#[tokio::test]
async fn test_watch_blocks_until_next_change() {
    let store = Arc::new(MemKeysApi::new());
    store.set("/a", "1", SetOptions::default()).await.unwrap();

    let watcher = {
        let store = store.clone();
        tokio::spawn(async move { store.watch("/a", WatchOptions::default()).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!watcher.is_finished());

    store.set("/a", "2", SetOptions::compare_index(1)).await.unwrap();
    let event = watcher.await.unwrap().unwrap();
    assert_eq!(event.action, Action::CompareAndSwap);
    assert_eq!(event.value, "2");
}

#[tokio::test]
async fn test_recursive_watch_matches_descendants_only() {
    let store = MemKeysApi::new();
    store.set("/dirx/a", "no", SetOptions::default()).await.unwrap();
    store.set("/dir/a", "yes", SetOptions::default()).await.unwrap();

    let event = store
        .watch("/dir", WatchOptions { wait_index: Some(1), recursive: true })
        .await
        .unwrap();
    assert_eq!(event.key, "/dir/a");
}

#[tokio::test]
async fn test_delete_event_carries_previous_value() {
    let store = MemKeysApi::new();
    store.set("/a", "1", SetOptions::default()).await.unwrap();
    store.delete("/a", DeleteOptions::default()).await.unwrap();

    let event = store
        .watch("/a", WatchOptions { wait_index: Some(2), recursive: false })
        .await
        .unwrap();
    assert_eq!(event.action, Action::Delete);
    assert_eq!(event.value, "");
    assert_eq!(event.prev_value.as_deref(), Some("1"));
    assert!(!event.is_unchanged());
}

#[tokio::test(start_paused = true)]
async fn test_ttl_expiry_produces_expire_event() {
    let store = Arc::new(MemKeysApi::new());
    store
        .set("/lock/1", "owner", SetOptions::create_only().with_ttl(Duration::from_secs(5)))
        .await
        .unwrap();

    let watcher = {
        let store = store.clone();
        tokio::spawn(async move { store.watch("/lock/1", WatchOptions::default()).await })
    };

    let event = watcher.await.unwrap().unwrap();
    assert_eq!(event.action, Action::Expire);
    assert_eq!(event.prev_value.as_deref(), Some("owner"));
    assert!(store.get("/lock/1").await.unwrap_err().is_key_not_found());
    store.set("/lock/1", "again", SetOptions::create_only()).await.unwrap();
}

#[tokio::test]
async fn test_watch_on_evicted_index_is_cleared() {
    let store = MemKeysApi::new();
    for i in 0..(MEM_EVENT_HISTORY_CAPACITY + 5) {
        store.set("/a", &i.to_string(), SetOptions::default()).await.unwrap();
    }

    let err = store
        .watch("/a", WatchOptions { wait_index: Some(1), recursive: false })
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::EventIndexCleared { index } if index == store.current_index()));
}

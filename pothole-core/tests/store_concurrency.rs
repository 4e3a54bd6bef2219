//! Concurrency tests for the record store.
//!
//! Run with: cargo test -p pothole-core --test store_concurrency

use std::collections::HashSet;
use std::sync::Arc;

use pothole_core::{NewPothole, PotholeError, RecordStore};
use tempfile::TempDir;

fn candidate(i: usize) -> NewPothole {
    NewPothole::new(
        40.0 + i as f64 * 0.001,
        -74.0,
        format!("2025-12-29T15:{:02}:00Z", i % 60),
    )
}

fn store_in(dir: &TempDir) -> Arc<RecordStore> {
    Arc::new(RecordStore::new(dir.path().join("potholes.csv")))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_get_unique_ids() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    store.initialize().await.unwrap();

    let handles: Vec<_> = (0..32)
        .map(|i| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.create(candidate(i)).await.unwrap().id })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }

    let unique: HashSet<u64> = ids.iter().copied().collect();
    assert_eq!(unique.len(), 32);
    assert_eq!(unique, (1..=32).collect::<HashSet<u64>>());

    let listed: Vec<u64> = store.list_all().await.unwrap().iter().map(|r| r.id).collect();
    assert_eq!(listed, (1..=32).collect::<Vec<u64>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn interleaved_creates_and_deletes_lose_nothing() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    for i in 0..10 {
        store.create(candidate(i)).await.unwrap();
    }

    let creates: Vec<_> = (10..30)
        .map(|i| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.create(candidate(i)).await.unwrap().id })
        })
        .collect();
    let deletes: Vec<_> = (1..=10u64)
        .map(|id| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.delete_by_id(id).await.unwrap().record.id })
        })
        .collect();

    let mut created = HashSet::new();
    for handle in creates {
        created.insert(handle.await.unwrap());
    }
    for handle in deletes {
        handle.await.unwrap();
    }

    // Deleted ids are never handed out again
    assert!(created.iter().all(|id| *id > 10));

    let remaining: HashSet<u64> = store.list_all().await.unwrap().iter().map(|r| r.id).collect();
    assert_eq!(remaining, created);
    assert_eq!(store.count().await.unwrap(), 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn double_delete_reports_not_found_once() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    let record = store.create(candidate(0)).await.unwrap();

    let a = tokio::spawn({
        let store = Arc::clone(&store);
        async move { store.delete_by_id(record.id).await }
    });
    let b = tokio::spawn({
        let store = Arc::clone(&store);
        async move { store.delete_by_id(record.id).await }
    });

    let results = [a.await.unwrap(), b.await.unwrap()];
    let ok = results.iter().filter(|r| r.is_ok()).count();
    let not_found = results
        .iter()
        .filter(|r| matches!(r, Err(PotholeError::NotFound(id)) if *id == record.id))
        .count();
    assert_eq!((ok, not_found), (1, 1));
    assert!(store.list_all().await.unwrap().is_empty());
}

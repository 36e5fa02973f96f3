// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the offline queue module.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use ll_core::storage::keys;
use ll_core::{FileStore, KeyValueStore, ManualClock, MemoryStore, RequestDescriptor};

use super::error::DispatchError;
use super::queue::{OfflineQueue, QueueConfig};
use super::test_helpers::{open_queue, queue_config, FlakyStore, START_MS};

static SEQ: AtomicU64 = AtomicU64::new(0);

/// A distinct queueable request; identical requests would collapse into one entry.
fn request(endpoint: &str, priority: u8) -> RequestDescriptor {
    let seq = SEQ.fetch_add(1, Ordering::Relaxed);
    RequestDescriptor::post(endpoint)
        .with_body(json!({ "n": priority, "seq": seq }))
        .queueable()
        .with_priority(priority)
}

fn setup(config: QueueConfig) -> (OfflineQueue, Arc<MemoryStore>, ManualClock) {
    let store = Arc::new(MemoryStore::new());
    let clock = ManualClock::new(START_MS);
    let queue = open_queue(config, Arc::clone(&store), &clock);
    (queue, store, clock)
}

fn setup_flaky() -> (OfflineQueue, Arc<FlakyStore>) {
    let flaky = Arc::new(FlakyStore::new());
    let store: Arc<dyn KeyValueStore> = flaky.clone();
    let queue = OfflineQueue::open(queue_config(), store, Arc::new(ManualClock::new(START_MS))).unwrap();
    (queue, flaky)
}

fn persisted_len(store: &dyn KeyValueStore) -> usize {
    store
        .get(keys::OFFLINE_QUEUE)
        .unwrap()
        .map(|raw| serde_json::from_str::<Vec<serde_json::Value>>(&raw).unwrap().len())
        .unwrap_or(0)
}

fn priorities(queue: &OfflineQueue) -> Vec<u8> {
    queue.snapshot().iter().map(|entry| entry.priority).collect()
}

fn network_failure() -> DispatchError {
    DispatchError::Network("offline".to_string())
}

fn server_failure() -> DispatchError {
    DispatchError::Server { status: 500, message: "oops".to_string() }
}

#[test]
fn test_priority_order_with_stable_ties() {
    let (queue, _, clock) = setup(queue_config());
    let mut ids = Vec::new();
    for priority in [10, 1, 5, 10, 1] {
        ids.push(queue.enqueue(&request("/scores", priority)).unwrap().id);
        clock.advance(Duration::from_secs(1));
    }

    assert_eq!(priorities(&queue), vec![10, 10, 5, 1, 1]);
    let order: Vec<String> = queue.snapshot().into_iter().map(|entry| entry.id).collect();
    assert_eq!(order, vec![ids[0].clone(), ids[3].clone(), ids[2].clone(), ids[1].clone(), ids[4].clone()]);
}

#[test]
fn test_priority_from_endpoint_class() {
    let (queue, _, _) = setup(queue_config());
    queue.enqueue(&RequestDescriptor::post("/analytics/events").queueable()).unwrap();
    queue.enqueue(&RequestDescriptor::post("/custom").queueable()).unwrap();
    queue.enqueue(&RequestDescriptor::post("/scores").queueable()).unwrap();

    assert_eq!(priorities(&queue), vec![10, 5, 1]);
}

#[test]
fn test_ids_are_unique() {
    let (queue, _, _) = setup(queue_config());
    for _ in 0..20 {
        queue.enqueue(&request("/scores", 5)).unwrap();
    }
    let mut ids: Vec<String> = queue.snapshot().into_iter().map(|entry| entry.id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 20);
}

#[test]
fn test_identical_request_is_queued_once() {
    let (queue, store, clock) = setup(queue_config());
    let score = RequestDescriptor::post("/scores").with_body(json!({ "score": 7 })).queueable();

    let first = queue.enqueue(&score).unwrap();
    clock.advance(Duration::from_secs(1));
    let second = queue.enqueue(&score).unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(queue.len(), 1);
    assert_eq!(persisted_len(store.as_ref()), 1);

    queue.enqueue(&RequestDescriptor::post("/scores").with_body(json!({ "score": 8 })).queueable()).unwrap();
    assert_eq!(queue.len(), 2);
}

#[test]
fn test_capacity_evicts_oldest_by_timestamp() {
    let config = QueueConfig { max_queue_size: 3, ..queue_config() };
    let (queue, _, clock) = setup(config);

    let oldest_high = queue.enqueue(&request("/scores", 10)).unwrap();
    clock.advance(Duration::from_secs(1));
    let low = queue.enqueue(&request("/custom", 1)).unwrap();
    clock.advance(Duration::from_secs(1));
    let mid = queue.enqueue(&request("/missions/progress", 5)).unwrap();
    clock.advance(Duration::from_secs(1));
    let newest = queue.enqueue(&request("/achievements", 5)).unwrap();

    assert_eq!(queue.len(), 3);
    let ids: Vec<String> = queue.snapshot().into_iter().map(|entry| entry.id).collect();
    assert!(!ids.contains(&oldest_high.id));
    assert_eq!(ids, vec![mid.id, newest.id, low.id]);
}

#[test]
fn test_never_exceeds_capacity() {
    let config = QueueConfig { max_queue_size: 4, ..queue_config() };
    let (queue, _, clock) = setup(config);
    for n in 0..25u8 {
        queue.enqueue(&request("/scores", n % 11)).unwrap();
        clock.advance(Duration::from_millis(10));
        assert!(queue.len() <= 4);
    }
    let order = priorities(&queue);
    assert!(order.windows(2).all(|pair| pair[0] >= pair[1]));
}

#[test]
fn test_same_instant_eviction_drops_lowest_priority() {
    let config = QueueConfig { max_queue_size: 2, ..queue_config() };
    let (queue, _, _) = setup(config);
    queue.enqueue(&request("/scores", 10)).unwrap();
    queue.enqueue(&request("/custom", 1)).unwrap();
    queue.enqueue(&request("/missions/progress", 5)).unwrap();

    assert_eq!(priorities(&queue), vec![10, 5]);
}

#[test]
fn test_persistence_round_trip() {
    let store = Arc::new(MemoryStore::new());
    let clock = ManualClock::new(START_MS);
    {
        let queue = open_queue(queue_config(), Arc::clone(&store), &clock);
        for priority in [1, 10, 5] {
            queue.enqueue(&request("/scores", priority)).unwrap();
        }
    }

    let reopened = open_queue(queue_config(), Arc::clone(&store), &clock);
    assert_eq!(priorities(&reopened), vec![10, 5, 1]);
    assert!(reopened.snapshot().iter().all(|entry| entry.attempts == 0));
}

#[tokio::test]
async fn test_persistence_keeps_attempts() {
    let store = Arc::new(MemoryStore::new());
    let clock = ManualClock::new(START_MS);
    let queue = open_queue(queue_config(), Arc::clone(&store), &clock);
    queue.enqueue(&request("/scores", 10)).unwrap();
    queue.process_queue(|_| async { Err(server_failure()) }).await.unwrap();

    let reopened = open_queue(queue_config(), Arc::clone(&store), &clock);
    assert_eq!(reopened.snapshot()[0].attempts, 1);
}

#[test]
fn test_load_drops_expired_entries() {
    let store = Arc::new(MemoryStore::new());
    let clock = ManualClock::new(START_MS);
    let config = QueueConfig { max_queue_age: Duration::from_secs(60), ..queue_config() };
    {
        let queue = open_queue(config.clone(), Arc::clone(&store), &clock);
        queue.enqueue(&request("/scores", 10)).unwrap();
        clock.advance(Duration::from_secs(45));
        queue.enqueue(&request("/scores", 5)).unwrap();
    }

    clock.advance(Duration::from_secs(30));
    let reopened = open_queue(config, Arc::clone(&store), &clock);
    assert_eq!(priorities(&reopened), vec![5]);

    let persisted = store.get(keys::OFFLINE_QUEUE).unwrap().unwrap();
    let entries: Vec<serde_json::Value> = serde_json::from_str(&persisted).unwrap();
    assert_eq!(entries.len(), 1);
}

#[test]
fn test_load_corrupt_queue_is_error() {
    let store = Arc::new(MemoryStore::new());
    store.set(keys::OFFLINE_QUEUE, "{not json").unwrap();
    let clock = ManualClock::new(START_MS);
    let store: Arc<dyn KeyValueStore> = store;
    let result = OfflineQueue::open(queue_config(), store, Arc::new(clock));
    assert!(matches!(result, Err(ll_core::Error::Json(_))));
}

#[test]
fn test_persisted_record_layout() {
    let (queue, store, _) = setup(queue_config());
    queue.enqueue(&request("/scores", 10).with_header("X-Trace", "abc")).unwrap();

    let persisted = store.get(keys::OFFLINE_QUEUE).unwrap().unwrap();
    let entries: Vec<serde_json::Value> = serde_json::from_str(&persisted).unwrap();
    let record = entries[0].as_object().unwrap();
    for field in ["id", "endpoint", "method", "body", "headers", "requires_auth", "queued_at", "attempts", "priority"] {
        assert!(record.contains_key(field), "missing {field}");
    }
}

#[test]
fn test_file_store_persistence() {
    let dir = tempfile::tempdir().unwrap();
    let clock = ManualClock::new(START_MS);
    let open = || {
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(dir.path()).unwrap());
        OfflineQueue::open(queue_config(), store, Arc::new(clock.clone())).unwrap()
    };

    open().enqueue(&request("/scores", 10)).unwrap();
    open().enqueue(&request("/custom", 1)).unwrap();
    assert_eq!(priorities(&open()), vec![10, 1]);
}

#[tokio::test]
async fn test_process_queue_delivers_in_priority_order() {
    let (queue, _, _) = setup(queue_config());
    for priority in [1, 10, 5] {
        queue.enqueue(&request("/scores", priority)).unwrap();
    }

    let seen = std::sync::Mutex::new(Vec::new());
    let delivered = queue
        .process_queue(|entry| {
            seen.lock().unwrap().push(entry.priority);
            async { Ok::<(), DispatchError>(()) }
        })
        .await
        .unwrap();

    assert_eq!(delivered, 3);
    assert_eq!(*seen.lock().unwrap(), vec![10, 5, 1]);
    assert!(queue.is_empty());
}

#[tokio::test]
async fn test_expired_entry_dropped_without_handler_call() {
    let config = QueueConfig { max_queue_age: Duration::from_secs(60), ..queue_config() };
    let (queue, _, clock) = setup(config);
    queue.enqueue(&request("/scores", 10)).unwrap();
    clock.advance(Duration::from_secs(61));

    let calls = Cell::new(0);
    let delivered = queue
        .process_queue(|_| {
            calls.set(calls.get() + 1);
            async { Ok::<(), DispatchError>(()) }
        })
        .await
        .unwrap();

    assert_eq!(delivered, 0);
    assert_eq!(calls.get(), 0);
    assert!(queue.is_empty());
}

#[tokio::test]
async fn test_failure_increments_attempts_until_exhausted() {
    let config = QueueConfig { max_retry_attempts: 2, ..queue_config() };
    let (queue, _, _) = setup(config);
    queue.enqueue(&request("/scores", 10)).unwrap();

    queue.process_queue(|_| async { Err(server_failure()) }).await.unwrap();
    assert_eq!(queue.snapshot()[0].attempts, 1);
    queue.process_queue(|_| async { Err(server_failure()) }).await.unwrap();
    assert_eq!(queue.snapshot()[0].attempts, 2);

    let calls = Cell::new(0);
    queue
        .process_queue(|_| {
            calls.set(calls.get() + 1);
            async { Ok::<(), DispatchError>(()) }
        })
        .await
        .unwrap();
    assert_eq!(calls.get(), 0);
    assert!(queue.is_empty());
}

#[tokio::test]
async fn test_non_halting_failure_continues_pass() {
    let (queue, _, _) = setup(queue_config());
    let failing = queue.enqueue(&request("/scores", 10)).unwrap();
    queue.enqueue(&request("/custom", 1)).unwrap();

    let delivered = queue
        .process_queue(|entry| {
            let result = if entry.id == failing.id { Err(server_failure()) } else { Ok(()) };
            async move { result }
        })
        .await
        .unwrap();

    assert_eq!(delivered, 1);
    let remaining = queue.snapshot();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, failing.id);
    assert_eq!(remaining[0].attempts, 1);
}

#[tokio::test]
async fn test_network_failure_halts_pass() {
    let (queue, _, _) = setup(queue_config());
    for priority in [10, 5, 1] {
        queue.enqueue(&request("/scores", priority)).unwrap();
    }

    let calls = Cell::new(0);
    let delivered = queue
        .process_queue(|_| {
            calls.set(calls.get() + 1);
            async { Err(network_failure()) }
        })
        .await
        .unwrap();

    assert_eq!(delivered, 0);
    assert_eq!(calls.get(), 1);
    let attempts: Vec<u32> = queue.snapshot().iter().map(|entry| entry.attempts).collect();
    assert_eq!(attempts, vec![1, 0, 0]);
}

#[tokio::test]
async fn test_expired_entries_dropped_even_when_pass_halts() {
    let config = QueueConfig { max_queue_age: Duration::from_secs(60), ..queue_config() };
    let (queue, _, clock) = setup(config);
    queue.enqueue(&request("/custom", 1)).unwrap();
    clock.advance(Duration::from_secs(59));
    queue.enqueue(&request("/scores", 10)).unwrap();
    clock.advance(Duration::from_secs(2));

    queue.process_queue(|_| async { Err(network_failure()) }).await.unwrap();
    assert_eq!(priorities(&queue), vec![10]);
}

#[tokio::test]
async fn test_enqueue_during_replay_waits_for_next_pass() {
    let (queue, _, _) = setup(queue_config());
    queue.enqueue(&request("/scores", 10)).unwrap();

    let calls = Cell::new(0);
    let delivered = queue
        .process_queue(|_| {
            calls.set(calls.get() + 1);
            queue.enqueue(&request("/missions/progress", 5)).unwrap();
            async { Ok::<(), DispatchError>(()) }
        })
        .await
        .unwrap();

    assert_eq!(delivered, 1);
    assert_eq!(calls.get(), 1);
    assert_eq!(priorities(&queue), vec![5]);
}

#[tokio::test]
async fn test_concurrent_replay_is_noop() {
    let (queue, _, _) = setup(queue_config());
    queue.enqueue(&request("/scores", 10)).unwrap();
    queue.enqueue(&request("/custom", 1)).unwrap();

    let first = queue.process_queue(|_| async {
        tokio::task::yield_now().await;
        Ok::<(), DispatchError>(())
    });
    let second = async {
        tokio::task::yield_now().await;
        assert!(queue.is_replaying());
        assert!(queue.stats().replaying);
        queue.process_queue(|_| async { Ok::<(), DispatchError>(()) }).await
    };
    let (first, second) = tokio::join!(first, second);

    assert_eq!(first.unwrap(), 2);
    assert_eq!(second.unwrap(), 0);
    assert!(!queue.is_replaying());
}

#[tokio::test(start_paused = true)]
async fn test_replay_delay_between_entries() {
    let config = QueueConfig { replay_delay: Duration::from_millis(100), ..queue_config() };
    let (queue, _, _) = setup(config);
    for priority in [10, 5, 1] {
        queue.enqueue(&request("/scores", priority)).unwrap();
    }

    let started = tokio::time::Instant::now();
    let instants = std::sync::Mutex::new(Vec::new());
    queue
        .process_queue(|_| {
            instants.lock().unwrap().push(started.elapsed());
            async { Ok::<(), DispatchError>(()) }
        })
        .await
        .unwrap();

    let instants = instants.into_inner().unwrap();
    assert_eq!(instants.len(), 3);
    assert!(instants[0] < Duration::from_millis(5));
    assert!(instants[1] >= Duration::from_millis(100));
    assert!(instants[2] >= Duration::from_millis(200));
}

#[tokio::test]
async fn test_clear_and_stats() {
    let (queue, store, clock) = setup(queue_config());
    queue.enqueue(&request("/scores", 10)).unwrap();
    clock.advance(Duration::from_secs(5));
    queue.enqueue(&request("/scores", 10)).unwrap();
    queue.enqueue(&request("/custom", 1)).unwrap();
    queue.process_queue(|_| async { Err(server_failure()) }).await.unwrap();

    let stats = queue.stats();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.by_priority.get(&10), Some(&2));
    assert_eq!(stats.by_priority.get(&1), Some(&1));
    assert_eq!(stats.max_attempts, 1);
    assert_eq!(stats.oldest_queued_at, Some(ll_core::ClockSource::now(&ManualClock::new(START_MS))));
    assert!(!stats.replaying);

    assert_eq!(queue.clear().unwrap(), 3);
    assert!(queue.is_empty());
    assert_eq!(queue.stats().total, 0);
    assert_eq!(store.get(keys::OFFLINE_QUEUE).unwrap().as_deref(), Some("[]"));
}

#[test]
fn test_failed_enqueue_write_leaves_queue_unchanged() {
    let (queue, flaky) = setup_flaky();
    queue.enqueue(&request("/scores", 10)).unwrap();

    flaky.fail_next_write();
    assert!(queue.enqueue(&request("/scores", 10)).is_err());

    assert_eq!(queue.len(), 1);
    assert_eq!(persisted_len(flaky.as_ref()), 1);
}

#[tokio::test]
async fn test_failed_write_after_pass_keeps_entries() {
    let (queue, flaky) = setup_flaky();
    queue.enqueue(&request("/scores", 10)).unwrap();
    queue.enqueue(&request("/custom", 1)).unwrap();

    flaky.fail_next_write();
    assert!(queue.process_queue(|_| async { Ok::<(), DispatchError>(()) }).await.is_err());

    assert_eq!(queue.len(), 2);
    assert_eq!(persisted_len(flaky.as_ref()), 2);

    let delivered = queue.process_queue(|_| async { Ok::<(), DispatchError>(()) }).await.unwrap();
    assert_eq!(delivered, 2);
    assert!(queue.is_empty());
    assert_eq!(persisted_len(flaky.as_ref()), 0);
}

#[test]
fn test_failed_clear_keeps_entries() {
    let (queue, flaky) = setup_flaky();
    queue.enqueue(&request("/scores", 10)).unwrap();

    flaky.fail_next_write();
    assert!(queue.clear().is_err());

    assert_eq!(queue.len(), 1);
    assert_eq!(persisted_len(flaky.as_ref()), 1);
}

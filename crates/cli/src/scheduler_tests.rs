// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use ll_core::{KeyValueStore, RequestDescriptor};

use super::*;
use crate::net::test_helpers::{harness, Harness, MockReply, MockTransport};

fn config() -> SchedulerConfig {
    SchedulerConfig {
        replay_interval: Duration::from_secs(30),
        sync_interval: Duration::from_secs(300),
    }
}

fn start(h: &Harness) -> (Arc<DataStore<MockTransport>>, SchedulerHandle) {
    let storage: Arc<dyn KeyValueStore> = h.store.clone();
    let store = Arc::new(
        DataStore::open(h.dispatcher.clone(), storage, Arc::new(h.clock.clone())).unwrap(),
    );
    let handle =
        Scheduler::spawn_parts(config(), h.dispatcher.clone(), Arc::clone(&h.queue), Arc::clone(&store));
    (store, handle)
}

fn queueable() -> RequestDescriptor {
    RequestDescriptor::post("/scores").with_body(serde_json::json!({ "score": 1 })).queueable()
}

#[tokio::test(start_paused = true)]
async fn test_replay_runs_on_interval() {
    let h = harness(MockTransport::new());
    h.queue.enqueue(&queueable()).unwrap();
    let (_store, handle) = start(&h);

    tokio::time::sleep(Duration::from_secs(29)).await;
    assert_eq!(h.queue.len(), 1);
    assert_eq!(h.transport.calls(), 0);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(h.queue.is_empty());
    assert_eq!(h.transport.calls(), 1);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_replay_skipped_while_offline() {
    let h = harness(MockTransport::always(MockReply::Fail("unreachable".to_string())));
    assert!(!h.dispatcher.probe().await);
    h.queue.enqueue(&queueable()).unwrap();
    let (_store, handle) = start(&h);

    tokio::time::sleep(Duration::from_secs(31)).await;

    // The initial probe plus the scheduled probe; no replay attempt.
    assert_eq!(h.transport.calls(), 2);
    assert!(h.transport.requests().iter().all(|r| r.url.ends_with("/health")));
    assert_eq!(h.queue.snapshot()[0].attempts, 0);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_auto_sync_only_with_pending_changes() {
    let h = harness(MockTransport::new());
    let (store, handle) = start(&h);

    tokio::time::sleep(Duration::from_secs(301)).await;
    assert_eq!(h.transport.calls(), 0);

    store.add_coins(25).unwrap();
    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(h.transport.calls(), 1);
    assert!(h.transport.requests()[0].url.ends_with("/profile/sync"));
    assert!(!store.has_pending_changes());

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_new_best_score_syncs_immediately() {
    let h = harness(MockTransport::new());
    let (store, handle) = start(&h);

    assert!(store.record_game_result(500, 3).unwrap());
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(h.transport.calls(), 1);
    assert!(h.transport.requests()[0].url.ends_with("/profile/sync"));
    assert!(!store.has_pending_changes());

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_tasks() {
    let h = harness(MockTransport::new());
    let (store, handle) = start(&h);
    assert!(handle.is_running());
    handle.shutdown().await;

    h.queue.enqueue(&queueable()).unwrap();
    store.add_coins(1).unwrap();
    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(h.transport.calls(), 0);
}

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Offline queue for requests that could not be delivered.
//!
//! Entries are kept in priority-descending order, ties in insertion order.
//! The whole queue is written to the key-value store after every change.
//! Replay works on a snapshot, so entries enqueued during a pass wait for
//! the next one.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use ll_core::id::generate_unique_id;
use ll_core::storage::keys;
use ll_core::{ClockSource, Error, KeyValueStore, QueuedRequest, RequestDescriptor, Result};

use super::error::ReplayError;

/// Queue limits.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueConfig {
    pub max_queue_size: usize,
    pub max_queue_age: Duration,
    pub max_retry_attempts: u32,
    /// Pause between handler invocations during replay.
    pub replay_delay: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        QueueConfig {
            max_queue_size: 100,
            max_queue_age: Duration::from_secs(7 * 24 * 60 * 60),
            max_retry_attempts: 5,
            replay_delay: Duration::from_millis(100),
        }
    }
}

/// Snapshot of queue contents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueStats {
    pub total: usize,
    /// Entry count per priority.
    pub by_priority: BTreeMap<u8, usize>,
    pub oldest_queued_at: Option<DateTime<Utc>>,
    pub max_attempts: u32,
    pub replaying: bool,
}

/// Durable, bounded, priority-ordered queue of undelivered requests.
pub struct OfflineQueue {
    config: QueueConfig,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn ClockSource>,
    entries: Mutex<Vec<QueuedRequest>>,
    replaying: AtomicBool,
}

/// Clears the replay flag when a pass ends, including when it is dropped
/// mid-way.
struct ReplayGuard<'a>(&'a AtomicBool);

impl Drop for ReplayGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl OfflineQueue {
    /// Loads the queue from the store.
    ///
    /// Entries already past `max_queue_age` are dropped. A persisted queue
    /// that cannot be parsed is an error rather than an empty queue.
    pub fn open(
        config: QueueConfig,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn ClockSource>,
    ) -> Result<Self> {
        let mut entries: Vec<QueuedRequest> = match store.get(keys::OFFLINE_QUEUE)? {
            Some(json) => serde_json::from_str(&json)?,
            None => Vec::new(),
        };
        let loaded = entries.len();

        let now = clock.now();
        entries.retain(|entry| {
            let expired = entry.is_expired(now, config.max_queue_age);
            if expired {
                warn!(id = %entry.id, endpoint = %entry.endpoint, "dropping expired queue entry on load");
            }
            !expired
        });
        entries.sort_by_key(|entry| Reverse(entry.priority));

        let queue = OfflineQueue {
            config,
            store,
            clock,
            entries: Mutex::new(entries),
            replaying: AtomicBool::new(false),
        };

        {
            let mut entries = queue.lock();
            queue.evict_to_capacity(&mut entries);
            if entries.len() != loaded {
                queue.persist(&entries)?;
            }
            debug!(count = entries.len(), "offline queue loaded");
        }

        Ok(queue)
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, Vec<QueuedRequest>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self, entries: &[QueuedRequest]) -> Result<()> {
        let json = serde_json::to_string(entries)?;
        self.store.set(keys::OFFLINE_QUEUE, &json)
    }

    /// Evicts the oldest entries until the queue fits.
    ///
    /// Among entries queued at the same instant the lowest-priority one,
    /// which sits furthest back, goes first. Removal keeps the rest sorted.
    fn evict_to_capacity(&self, entries: &mut Vec<QueuedRequest>) {
        while entries.len() > self.config.max_queue_size {
            let oldest = entries
                .iter()
                .enumerate()
                .min_by_key(|(index, entry)| (entry.queued_at, Reverse(*index)))
                .map(|(index, _)| index);
            let Some(index) = oldest else { break };
            let evicted = entries.remove(index);
            let reason = Error::QueueFull { capacity: self.config.max_queue_size };
            warn!(id = %evicted.id, endpoint = %evicted.endpoint, "{reason}, evicting oldest entry");
        }
    }

    /// Adds a request to the queue and persists it.
    ///
    /// The new entry goes after every entry of equal or higher priority.
    /// When the queue is over capacity afterwards the oldest entries are
    /// evicted; this never fails the enqueue. A request whose dedup key is
    /// already queued is not added again and the existing entry is returned.
    ///
    /// Nothing changes in memory unless the write succeeds.
    pub fn enqueue(&self, request: &RequestDescriptor) -> Result<QueuedRequest> {
        let now = self.clock.now();
        let key = request.dedup_key();
        let mut entries = self.lock();

        if let Some(existing) = entries.iter().find(|entry| entry.key() == key) {
            debug!(id = %existing.id, endpoint = %existing.endpoint, "request already queued");
            return Ok(existing.clone());
        }

        let id = generate_unique_id(request.endpoint(), &now, |candidate| {
            entries.iter().any(|entry| entry.id == candidate)
        });
        let entry = QueuedRequest::new(id, request, now);

        let mut next = entries.clone();
        let position = next
            .iter()
            .position(|existing| existing.priority < entry.priority)
            .unwrap_or(next.len());
        next.insert(position, entry.clone());
        self.evict_to_capacity(&mut next);
        self.persist(&next)?;
        *entries = next;

        info!(
            id = %entry.id,
            endpoint = %entry.endpoint,
            priority = entry.priority,
            "request queued for replay"
        );
        Ok(entry)
    }

    /// Replays queued entries through `handler`.
    ///
    /// Expired and exhausted entries are dropped without calling the
    /// handler. A failure increments the entry's attempt count; a failure
    /// that [halts replay](ReplayError::halts_replay) leaves the remaining
    /// entries for the next pass. Returns the number of entries delivered.
    ///
    /// Only one pass runs at a time. Calling this while a pass is running
    /// returns `Ok(0)` immediately.
    pub async fn process_queue<F, Fut, E>(&self, mut handler: F) -> Result<usize>
    where
        F: FnMut(QueuedRequest) -> Fut,
        Fut: Future<Output = std::result::Result<(), E>>,
        E: ReplayError,
    {
        if self.replaying.swap(true, Ordering::SeqCst) {
            debug!("replay already in progress");
            return Ok(0);
        }
        let _guard = ReplayGuard(&self.replaying);

        let snapshot = self.snapshot();
        let now = self.clock.now();
        let mut finished: HashSet<String> = HashSet::new();
        let mut pending = Vec::new();

        for entry in snapshot {
            match entry.check_replayable(now, self.config.max_queue_age, self.config.max_retry_attempts) {
                Ok(()) => pending.push(entry),
                Err(reason) => {
                    warn!(id = %entry.id, endpoint = %entry.endpoint, "{reason}, dropping");
                    finished.insert(entry.id);
                }
            }
        }

        let mut delivered = 0;
        for (index, entry) in pending.into_iter().enumerate() {
            if index > 0 && !self.config.replay_delay.is_zero() {
                tokio::time::sleep(self.config.replay_delay).await;
            }

            let id = entry.id.clone();
            match handler(entry).await {
                Ok(()) => {
                    debug!(id = %id, "queued request delivered");
                    delivered += 1;
                    finished.insert(id);
                }
                Err(e) => {
                    {
                        let mut entries = self.lock();
                        if let Some(stored) = entries.iter_mut().find(|stored| stored.id == id) {
                            stored.record_failure();
                            debug!(id = %id, attempt = stored.attempts, "replay failed: {e}");
                        }
                    }

                    if e.halts_replay() {
                        info!(id = %id, "replay halted: {e}");
                        break;
                    }
                }
            }
        }

        let mut entries = self.lock();
        let mut next = entries.clone();
        next.retain(|entry| !finished.contains(&entry.id));
        self.persist(&next)?;
        *entries = next;
        info!(delivered, remaining = entries.len(), "replay pass finished");

        Ok(delivered)
    }

    /// Removes every entry. Returns how many were removed.
    pub fn clear(&self) -> Result<usize> {
        let mut entries = self.lock();
        self.persist(&[])?;
        let removed = entries.len();
        entries.clear();
        Ok(removed)
    }

    pub fn stats(&self) -> QueueStats {
        let entries = self.lock();
        let mut by_priority = BTreeMap::new();
        for entry in entries.iter() {
            *by_priority.entry(entry.priority).or_insert(0) += 1;
        }
        QueueStats {
            total: entries.len(),
            by_priority,
            oldest_queued_at: entries.iter().map(|entry| entry.queued_at).min(),
            max_attempts: entries.iter().map(|entry| entry.attempts).max().unwrap_or(0),
            replaying: self.replaying.load(Ordering::SeqCst),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn is_replaying(&self) -> bool {
        self.replaying.load(Ordering::SeqCst)
    }

    /// Current entries in queue order.
    pub fn snapshot(&self) -> Vec<QueuedRequest> {
        self.lock().clone()
    }
}

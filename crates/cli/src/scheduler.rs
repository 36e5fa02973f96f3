// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Background tasks.
//!
//! - Queue replay on a fixed interval, skipped while offline unless a
//!   probe finds the backend again
//! - Auto-sync on a fixed interval when pending changes exist
//! - Immediate sync when the store reports a new best score

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::net::{Dispatcher, OfflineQueue, Transport};
use crate::services::{replay, Services};
use crate::store::{DataStore, StoreEvent};

/// Intervals for the background tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub replay_interval: Duration,
    pub sync_interval: Duration,
}

/// Handle to running background tasks.
pub struct SchedulerHandle {
    cancel_token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Stops all tasks and waits for them to finish.
    pub async fn shutdown(self) {
        self.cancel_token.cancel();
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!("background task ended abnormally: {e}");
            }
        }
        debug!("scheduler stopped");
    }

    pub fn is_running(&self) -> bool {
        !self.cancel_token.is_cancelled()
    }
}

pub struct Scheduler;

impl Scheduler {
    /// Starts the background tasks for `services`.
    pub fn spawn<T: Transport + 'static>(services: &Services<T>) -> SchedulerHandle {
        let config = SchedulerConfig {
            replay_interval: services.config.replay_interval(),
            sync_interval: services.config.sync_interval(),
        };
        Self::spawn_parts(
            config,
            services.dispatcher.clone(),
            Arc::clone(&services.queue),
            Arc::clone(&services.store),
        )
    }

    pub fn spawn_parts<T: Transport + 'static>(
        config: SchedulerConfig,
        dispatcher: Dispatcher<T>,
        queue: Arc<OfflineQueue>,
        store: Arc<DataStore<T>>,
    ) -> SchedulerHandle {
        let cancel_token = CancellationToken::new();
        // Subscribe before spawning so no event published after this call is missed.
        let events = store.subscribe();
        let tasks = vec![
            tokio::spawn(replay_loop(config.replay_interval, dispatcher, queue, cancel_token.clone())),
            tokio::spawn(sync_loop(config.sync_interval, Arc::clone(&store), cancel_token.clone())),
            tokio::spawn(best_score_listener(store, events, cancel_token.clone())),
        ];
        info!(
            replay_secs = config.replay_interval.as_secs(),
            sync_secs = config.sync_interval.as_secs(),
            "scheduler started"
        );
        SchedulerHandle { cancel_token, tasks }
    }
}

fn interval(period: Duration) -> tokio::time::Interval {
    let start = tokio::time::Instant::now() + period;
    let mut interval = tokio::time::interval_at(start, period.max(Duration::from_millis(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn replay_loop<T: Transport + 'static>(
    period: Duration,
    dispatcher: Dispatcher<T>,
    queue: Arc<OfflineQueue>,
    cancel_token: CancellationToken,
) {
    let mut ticks = interval(period);
    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => return,
            _ = ticks.tick() => {}
        }

        if queue.is_empty() {
            continue;
        }
        if !dispatcher.is_online() && !dispatcher.probe().await {
            debug!(queued = queue.len(), "offline, replay skipped");
            continue;
        }
        match replay(&dispatcher, &queue).await {
            Ok(delivered) => debug!(delivered, "scheduled replay finished"),
            Err(e) => warn!("scheduled replay failed: {e}"),
        }
    }
}

async fn sync_loop<T: Transport + 'static>(
    period: Duration,
    store: Arc<DataStore<T>>,
    cancel_token: CancellationToken,
) {
    let mut ticks = interval(period);
    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => return,
            _ = ticks.tick() => {}
        }

        if store.has_pending_changes() {
            store.sync().await;
        }
    }
}

async fn best_score_listener<T: Transport + 'static>(
    store: Arc<DataStore<T>>,
    mut events: broadcast::Receiver<StoreEvent>,
    cancel_token: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = cancel_token.cancelled() => return,
            event = events.recv() => event,
        };

        match event {
            Ok(StoreEvent::NewBestScore(score)) => {
                info!(score, "new best score, syncing now");
                store.sync().await;
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => debug!(skipped, "event listener lagged"),
            Err(RecvError::Closed) => return,
        }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;

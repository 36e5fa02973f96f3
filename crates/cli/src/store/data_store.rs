// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use ll_core::player::MAX_HEARTS;
use ll_core::storage::keys;
use ll_core::protocol::{
    AchievementUnlock, AnalyticsEvent, MissionProgress, PurchaseReceipt, PurchaseValidation,
    ScoreSubmission,
};
use ll_core::{
    ApiRequest, BoosterState, ClockSource, KeyValueStore, Merge, PendingChanges, PlayerResources,
    PlayerStats, SyncRequest, SyncResponse,
};

use super::event::{StoreEvent, SyncState};
use crate::error::Result;
use crate::net::{DispatchError, Dispatcher, HttpTransport, Transport};

const EVENT_CAPACITY: usize = 64;

/// Outcome of a completed sync.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncReport {
    /// True when another sync was already running and this call did nothing.
    pub skipped: bool,
    /// Fields where the server snapshot disagreed with local state.
    pub conflicts: Vec<&'static str>,
    /// Pending changes acknowledged by this sync.
    pub cleared: usize,
    /// Pending changes made while the sync was in flight.
    pub remaining: usize,
}

/// How a report to the backend was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// Delivery failed; the report waits in the offline queue under this id.
    Queued(String),
}

#[derive(Debug, Clone, Default)]
struct LocalState {
    stats: PlayerStats,
    resources: PlayerResources,
    pending: PendingChanges,
    last_sync: Option<DateTime<Utc>>,
    sync_state: SyncState,
}

/// Local-first owner of player stats and resources.
pub struct DataStore<T: Transport = HttpTransport> {
    dispatcher: Dispatcher<T>,
    storage: Arc<dyn KeyValueStore>,
    clock: Arc<dyn ClockSource>,
    state: Mutex<LocalState>,
    events: broadcast::Sender<StoreEvent>,
}

fn load<V: serde::de::DeserializeOwned>(
    storage: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<V>> {
    match storage.get(key)? {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

fn encode<V: Serialize>(value: &V) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// Writes several keys as a unit. When a write fails, the keys already
/// written are put back to their previous values.
fn save_all(storage: &dyn KeyValueStore, writes: &[(&str, String)]) -> Result<()> {
    let previous = writes
        .iter()
        .map(|(key, _)| storage.get(key))
        .collect::<ll_core::Result<Vec<_>>>()?;

    for (index, (key, json)) in writes.iter().enumerate() {
        if let Err(e) = storage.set(key, json) {
            for ((key, _), old) in writes[..index].iter().zip(&previous).rev() {
                let restored = match old {
                    Some(old) => storage.set(key, old),
                    None => storage.remove(key),
                };
                if let Err(restore) = restored {
                    warn!(key = %key, "could not restore after failed write: {restore}");
                }
            }
            return Err(e.into());
        }
    }
    Ok(())
}

/// Records every top-level field that differs between `before` and `after`.
fn record_changes<V: Serialize>(pending: &mut PendingChanges, before: &V, after: &V) -> Result<bool> {
    let (serde_json::Value::Object(before), serde_json::Value::Object(after)) =
        (serde_json::to_value(before)?, serde_json::to_value(after)?)
    else {
        return Ok(false);
    };

    let mut changed = false;
    for (field, value) in after {
        if before.get(&field) != Some(&value) {
            pending.insert(field, value);
            changed = true;
        }
    }
    Ok(changed)
}

fn take(resource: &'static str, balance: &mut u64, amount: u64) -> ll_core::Result<()> {
    if amount > *balance {
        return Err(ll_core::Error::InsufficientBalance {
            resource,
            available: *balance,
            requested: amount,
        });
    }
    *balance -= amount;
    Ok(())
}

/// Returns the store to idle if a sync is dropped while in flight.
struct SyncGuard<'a, T: Transport + 'static>(&'a DataStore<T>);

impl<T: Transport + 'static> Drop for SyncGuard<'_, T> {
    fn drop(&mut self) {
        let interrupted = {
            let mut state = self.0.lock();
            let interrupted = state.sync_state == SyncState::Syncing;
            if interrupted {
                state.sync_state = SyncState::Idle;
            }
            interrupted
        };
        if interrupted {
            debug!("sync cancelled before completion");
            self.0.emit(StoreEvent::SyncStateChanged(SyncState::Idle));
        }
    }
}

impl<T: Transport + 'static> DataStore<T> {
    /// Loads persisted state, creating defaults on first launch.
    pub fn open(
        dispatcher: Dispatcher<T>,
        storage: Arc<dyn KeyValueStore>,
        clock: Arc<dyn ClockSource>,
    ) -> Result<Self> {
        let stats = load(storage.as_ref(), keys::PLAYER_STATS)?;
        let resources = load(storage.as_ref(), keys::PLAYER_RESOURCES)?;
        let first_launch = stats.is_none() && resources.is_none();

        let state = LocalState {
            stats: stats.unwrap_or_default(),
            resources: resources.unwrap_or_default(),
            pending: load(storage.as_ref(), keys::PENDING_CHANGES)?.unwrap_or_default(),
            last_sync: load(storage.as_ref(), keys::LAST_SYNC)?,
            sync_state: SyncState::Idle,
        };

        if first_launch {
            info!("first launch, creating player defaults");
            save_all(
                storage.as_ref(),
                &[
                    (keys::PLAYER_STATS, encode(&state.stats)?),
                    (keys::PLAYER_RESOURCES, encode(&state.resources)?),
                ],
            )?;
        }

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(DataStore { dispatcher, storage, clock, state: Mutex::new(state), events })
    }

    fn lock(&self) -> MutexGuard<'_, LocalState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, event: StoreEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    fn set_sync_state(&self, sync_state: SyncState) {
        self.lock().sync_state = sync_state;
        debug!(state = %sync_state, "sync state changed");
        self.emit(StoreEvent::SyncStateChanged(sync_state));
    }

    /// Subscribes to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    pub fn stats(&self) -> PlayerStats {
        self.lock().stats.clone()
    }

    pub fn resources(&self) -> PlayerResources {
        self.lock().resources.clone()
    }

    pub fn pending_changes(&self) -> PendingChanges {
        self.lock().pending.clone()
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.lock().pending.is_empty()
    }

    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.lock().last_sync
    }

    pub fn sync_state(&self) -> SyncState {
        self.lock().sync_state
    }

    /// Applies a mutation to the stats, persists it and records the
    /// changed fields as pending.
    ///
    /// A failing mutation changes nothing.
    pub fn update_stats<F>(&self, mutate: F) -> Result<PlayerStats>
    where
        F: FnOnce(&mut PlayerStats) -> ll_core::Result<()>,
    {
        let (before, after) = {
            let mut state = self.lock();
            let mut next = state.stats.clone();
            mutate(&mut next)?;

            let mut pending = state.pending.clone();
            if !record_changes(&mut pending, &state.stats, &next)? {
                return Ok(next);
            }
            save_all(
                self.storage.as_ref(),
                &[(keys::PLAYER_STATS, encode(&next)?), (keys::PENDING_CHANGES, encode(&pending)?)],
            )?;

            let before = std::mem::replace(&mut state.stats, next.clone());
            state.pending = pending;
            (before, next)
        };

        self.emit(StoreEvent::StatsChanged(after.clone()));
        if after.best_score > before.best_score {
            info!(score = after.best_score, "new best score");
            self.emit(StoreEvent::NewBestScore(after.best_score));
        }
        Ok(after)
    }

    /// Applies a mutation to the resources, persists it and records the
    /// changed fields as pending.
    ///
    /// A failing mutation changes nothing.
    pub fn update_resources<F>(&self, mutate: F) -> Result<PlayerResources>
    where
        F: FnOnce(&mut PlayerResources) -> ll_core::Result<()>,
    {
        let after = {
            let mut state = self.lock();
            let mut next = state.resources.clone();
            mutate(&mut next)?;

            let mut pending = state.pending.clone();
            if !record_changes(&mut pending, &state.resources, &next)? {
                return Ok(next);
            }
            save_all(
                self.storage.as_ref(),
                &[
                    (keys::PLAYER_RESOURCES, encode(&next)?),
                    (keys::PENDING_CHANGES, encode(&pending)?),
                ],
            )?;

            state.resources = next.clone();
            state.pending = pending;
            next
        };

        self.emit(StoreEvent::ResourcesChanged(after.clone()));
        Ok(after)
    }

    /// Records a finished game. Returns true when it set a new best score.
    pub fn record_game_result(&self, score: u64, streak: u32) -> Result<bool> {
        let before = self.stats().best_score;
        let after = self.update_stats(|stats| {
            stats.total_games += 1;
            stats.total_score = stats.total_score.saturating_add(score);
            stats.best_score = stats.best_score.max(score);
            stats.best_streak = stats.best_streak.max(streak);
            Ok(())
        })?;
        Ok(after.best_score > before)
    }

    pub fn record_mission_completed(&self) -> Result<PlayerStats> {
        self.update_stats(|stats| {
            stats.missions_completed += 1;
            Ok(())
        })
    }

    pub fn record_achievement(&self) -> Result<PlayerStats> {
        self.update_stats(|stats| {
            stats.achievements_unlocked += 1;
            Ok(())
        })
    }

    pub fn add_coins(&self, amount: u64) -> Result<u64> {
        let resources = self.update_resources(|r| {
            r.coins = r.coins.saturating_add(amount);
            Ok(())
        })?;
        Ok(resources.coins)
    }

    /// Fails with `InsufficientBalance` when the balance is too low.
    pub fn spend_coins(&self, amount: u64) -> Result<u64> {
        let resources = self.update_resources(|r| take("coins", &mut r.coins, amount))?;
        Ok(resources.coins)
    }

    pub fn add_gems(&self, amount: u64) -> Result<u64> {
        let resources = self.update_resources(|r| {
            r.gems = r.gems.saturating_add(amount);
            Ok(())
        })?;
        Ok(resources.gems)
    }

    /// Fails with `InsufficientBalance` when the balance is too low.
    pub fn spend_gems(&self, amount: u64) -> Result<u64> {
        let resources = self.update_resources(|r| take("gems", &mut r.gems, amount))?;
        Ok(resources.gems)
    }

    /// Uses one heart. Returns the hearts left.
    pub fn use_heart(&self) -> Result<u32> {
        let resources = self.update_resources(|r| {
            if r.hearts == 0 {
                return Err(ll_core::Error::InsufficientBalance {
                    resource: "hearts",
                    available: 0,
                    requested: 1,
                });
            }
            r.hearts -= 1;
            Ok(())
        })?;
        Ok(resources.hearts)
    }

    pub fn refill_hearts(&self) -> Result<u32> {
        let resources = self.update_resources(|r| {
            r.hearts = r.hearts.max(MAX_HEARTS);
            Ok(())
        })?;
        Ok(resources.hearts)
    }

    /// Activates a booster locally until the server confirms or replaces it.
    pub fn activate_booster(&self, kind: &str, duration: Duration) -> Result<BoosterState> {
        let expires_at = self.clock.now()
            + chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::zero());
        let resources = self.update_resources(|r| {
            r.booster = BoosterState::activate(kind, expires_at);
            Ok(())
        })?;
        Ok(resources.booster)
    }

    /// Syncs with the backend and reports whether it succeeded.
    ///
    /// Failures are logged and leave pending changes for the next attempt.
    pub async fn sync(&self) -> bool {
        match self.try_sync().await {
            Ok(_) => true,
            Err(e) => {
                warn!("sync failed: {e}");
                false
            }
        }
    }

    /// Sends local state and pending changes, then merges the server
    /// snapshot.
    ///
    /// Only pending changes whose value was sent are cleared, so mutations
    /// made while the request was in flight go out with the next sync. On
    /// failure nothing changes except the sync state, which becomes
    /// [`SyncState::Error`].
    pub async fn try_sync(&self) -> Result<SyncReport> {
        let request = {
            let mut state = self.lock();
            if state.sync_state == SyncState::Syncing {
                debug!("sync already in progress");
                return Ok(SyncReport { skipped: true, ..SyncReport::default() });
            }
            state.sync_state = SyncState::Syncing;
            SyncRequest {
                stats: state.stats.clone(),
                resources: state.resources.clone(),
                pending_changes: state.pending.clone(),
                last_sync_at: state.last_sync,
            }
        };
        let _guard = SyncGuard(self);
        self.emit(StoreEvent::SyncStateChanged(SyncState::Syncing));
        debug!(pending = request.pending_changes.len(), "sync started");

        let response: SyncResponse = match self.dispatcher.call(&request).await {
            Ok(response) => response,
            Err(e) => {
                self.set_sync_state(SyncState::Error);
                return Err(e.into());
            }
        };

        match self.apply_snapshot(&request.pending_changes, response) {
            Ok((report, stats_changed, resources_changed)) => {
                if let Some(stats) = stats_changed {
                    self.emit(StoreEvent::StatsChanged(stats));
                }
                if let Some(resources) = resources_changed {
                    self.emit(StoreEvent::ResourcesChanged(resources));
                }
                self.set_sync_state(SyncState::Idle);
                info!(
                    conflicts = report.conflicts.len(),
                    cleared = report.cleared,
                    remaining = report.remaining,
                    "sync finished"
                );
                Ok(report)
            }
            Err(e) => {
                self.set_sync_state(SyncState::Error);
                Err(e)
            }
        }
    }

    /// Sends a queueable report. A queued report is not a failure.
    async fn report<R: ApiRequest>(&self, body: &R) -> Result<Delivery> {
        match self.dispatcher.send(body).await {
            Ok(_) => Ok(Delivery::Sent),
            Err(DispatchError::Queued { id, source }) => {
                info!(endpoint = R::ENDPOINT, id = %id, "report queued: {source}");
                Ok(Delivery::Queued(id))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Reports a finished game to the leaderboard.
    pub async fn submit_score(&self, score: u64, streak: u32, level: Option<String>) -> Result<Delivery> {
        let body = ScoreSubmission { score, streak, level, played_at: self.clock.now() };
        self.report(&body).await
    }

    /// Reports mission progress. Reaching the target also counts the
    /// mission as completed locally.
    pub async fn report_mission(&self, mission_id: &str, progress: u32, target: u32) -> Result<Delivery> {
        let completed = progress >= target;
        if completed {
            self.record_mission_completed()?;
        }
        let body = MissionProgress { mission_id: mission_id.to_string(), progress, target, completed };
        self.report(&body).await
    }

    /// Counts an unlocked achievement and reports it.
    pub async fn unlock_achievement(&self, achievement_id: &str) -> Result<Delivery> {
        self.record_achievement()?;
        let body = AchievementUnlock {
            achievement_id: achievement_id.to_string(),
            unlocked_at: self.clock.now(),
        };
        self.report(&body).await
    }

    pub async fn track_event(
        &self,
        name: &str,
        properties: BTreeMap<String, serde_json::Value>,
    ) -> Result<Delivery> {
        let body = AnalyticsEvent { name: name.to_string(), properties, occurred_at: self.clock.now() };
        self.report(&body).await
    }

    /// Validates a store receipt and credits what the server granted.
    ///
    /// An invalid receipt changes nothing. When the backend cannot be
    /// reached the validation is queued and the error says so.
    pub async fn validate_purchase(&self, validation: &PurchaseValidation) -> Result<PurchaseReceipt> {
        let receipt: PurchaseReceipt = self.dispatcher.call(validation).await?;
        if !receipt.valid {
            warn!(product = %validation.product_id, "purchase receipt rejected");
            return Ok(receipt);
        }

        self.update_resources(|r| {
            r.coins = r.coins.saturating_add(receipt.coins_granted);
            r.gems = r.gems.saturating_add(receipt.gems_granted);
            r.premium |= receipt.premium;
            Ok(())
        })?;
        info!(
            product = %validation.product_id,
            coins = receipt.coins_granted,
            gems = receipt.gems_granted,
            "purchase credited"
        );
        Ok(receipt)
    }

    #[allow(clippy::type_complexity)]
    fn apply_snapshot(
        &self,
        sent: &PendingChanges,
        response: SyncResponse,
    ) -> Result<(SyncReport, Option<PlayerStats>, Option<PlayerResources>)> {
        let now = self.clock.now();
        let mut state = self.lock();

        let mut conflicts = state.stats.conflicts(&response.stats);
        conflicts.extend(state.resources.conflicts(&response.resources));
        if !conflicts.is_empty() {
            state.sync_state = SyncState::Conflict;
            debug!(fields = ?conflicts, "merging conflicting server snapshot");
            self.emit(StoreEvent::SyncStateChanged(SyncState::Conflict));
        }

        let stats = state.stats.merge(&response.stats);
        let resources = state.resources.merge(&response.resources);
        let mut pending = state.pending.clone();
        let before = pending.len();
        pending.retain(|field, value| sent.get(field) != Some(value));
        let last_sync = Some(response.server_time.unwrap_or(now));

        save_all(
            self.storage.as_ref(),
            &[
                (keys::PLAYER_STATS, encode(&stats)?),
                (keys::PLAYER_RESOURCES, encode(&resources)?),
                (keys::PENDING_CHANGES, encode(&pending)?),
                (keys::LAST_SYNC, encode(&last_sync)?),
            ],
        )?;

        let stats_changed = (stats != state.stats).then(|| stats.clone());
        let resources_changed = (resources != state.resources).then(|| resources.clone());
        let report = SyncReport {
            skipped: false,
            conflicts,
            cleared: before - pending.len(),
            remaining: pending.len(),
        };

        state.stats = stats;
        state.resources = resources;
        state.pending = pending;
        state.last_sync = last_sync;

        Ok((report, stats_changed, resources_changed))
    }
}

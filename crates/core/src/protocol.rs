// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Typed request and response bodies for the backend endpoints.
//!
//! JSON is produced and consumed only at this boundary; everything behind
//! it works with these structs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::endpoint;
use crate::error::Result;
use crate::player::{PlayerResources, PlayerStats};
use crate::request::{Method, RequestDescriptor};

/// Field name → latest local value, recorded since the last successful sync.
pub type PendingChanges = BTreeMap<String, serde_json::Value>;

/// A typed body bound to one endpoint.
pub trait ApiRequest: Serialize {
    const ENDPOINT: &'static str;
    const METHOD: Method = Method::Post;
    /// Whether a failed delivery may wait in the offline queue.
    const QUEUEABLE: bool;

    /// Builds the descriptor that delivers this body.
    fn to_request(&self) -> Result<RequestDescriptor> {
        RequestDescriptor::new(Self::METHOD, Self::ENDPOINT)
            .with_queueing(Self::QUEUEABLE)
            .with_json(self)
    }
}

/// Payload of `POST /profile/sync`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRequest {
    pub stats: PlayerStats,
    pub resources: PlayerResources,
    pub pending_changes: PendingChanges,
    pub last_sync_at: Option<DateTime<Utc>>,
}

impl ApiRequest for SyncRequest {
    const ENDPOINT: &'static str = endpoint::PROFILE_SYNC;
    // A missed sync retries on the next cycle instead of piling up offline.
    const QUEUEABLE: bool = false;
}

/// Server snapshot returned from `POST /profile/sync`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncResponse {
    pub stats: PlayerStats,
    pub resources: PlayerResources,
    pub server_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSubmission {
    pub score: u64,
    pub streak: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    pub played_at: DateTime<Utc>,
}

impl ApiRequest for ScoreSubmission {
    const ENDPOINT: &'static str = endpoint::SCORES;
    const QUEUEABLE: bool = true;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseValidation {
    pub product_id: String,
    pub receipt: String,
    pub store: String,
}

impl ApiRequest for PurchaseValidation {
    const ENDPOINT: &'static str = endpoint::PURCHASE_VALIDATE;
    const QUEUEABLE: bool = true;
}

/// Outcome of a purchase validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PurchaseReceipt {
    pub valid: bool,
    pub coins_granted: u64,
    pub gems_granted: u64,
    pub premium: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionProgress {
    pub mission_id: String,
    pub progress: u32,
    pub target: u32,
    pub completed: bool,
}

impl ApiRequest for MissionProgress {
    const ENDPOINT: &'static str = endpoint::MISSION_PROGRESS;
    const QUEUEABLE: bool = true;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementUnlock {
    pub achievement_id: String,
    pub unlocked_at: DateTime<Utc>,
}

impl ApiRequest for AchievementUnlock {
    const ENDPOINT: &'static str = endpoint::ACHIEVEMENTS;
    const QUEUEABLE: bool = true;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    pub name: String,
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
    pub occurred_at: DateTime<Utc>,
}

impl ApiRequest for AnalyticsEvent {
    const ENDPOINT: &'static str = endpoint::ANALYTICS_EVENTS;
    const QUEUEABLE: bool = true;
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;

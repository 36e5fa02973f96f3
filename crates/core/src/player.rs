// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Synchronized player records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Hearts a fresh player starts with, and the refill ceiling.
pub const MAX_HEARTS: u32 = 5;
/// Coins granted on first launch.
pub const STARTING_COINS: u64 = 100;

/// Best-effort progress counters. Every field only ever grows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerStats {
    pub best_score: u64,
    pub best_streak: u32,
    pub total_games: u64,
    pub total_score: u64,
    pub missions_completed: u32,
    pub achievements_unlocked: u32,
}

/// Spendable balances and transient flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerResources {
    pub coins: u64,
    pub gems: u64,
    pub hearts: u32,
    /// Owned by the server; local activation is provisional until the next sync.
    pub booster: BoosterState,
    /// Ad-free entitlement, granted by the server after purchase validation.
    pub premium: bool,
}

impl Default for PlayerResources {
    fn default() -> Self {
        PlayerResources {
            coins: STARTING_COINS,
            gems: 0,
            hearts: MAX_HEARTS,
            booster: BoosterState::default(),
            premium: false,
        }
    }
}

/// Currently active booster, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Serialize, Deserialize)]
#[serde(default)]
pub struct BoosterState {
    pub kind: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl BoosterState {
    pub fn activate(kind: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        BoosterState { kind: Some(kind.into()), expires_at: Some(expires_at) }
    }

    /// Whether a booster is active at `now`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        match (&self.kind, self.expires_at) {
            (Some(_), Some(expires_at)) => now < expires_at,
            (Some(_), None) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
#[path = "player_tests.rs"]
mod tests;

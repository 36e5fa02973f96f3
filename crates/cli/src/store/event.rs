// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

use serde::Serialize;

use ll_core::{PlayerResources, PlayerStats};

/// Progress of the local store's sync with the backend.
///
/// `Conflict` is advisory: it is reported while a differing server
/// snapshot is merged, and always resolves to `Idle`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    #[default]
    Idle,
    Syncing,
    Conflict,
    Error,
}

impl SyncState {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncState::Idle => "idle",
            SyncState::Syncing => "syncing",
            SyncState::Conflict => "conflict",
            SyncState::Error => "error",
        }
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Change notifications published by the data store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    StatsChanged(PlayerStats),
    ResourcesChanged(PlayerResources),
    SyncStateChanged(SyncState),
    /// A game beat the previous best score.
    NewBestScore(u64),
}

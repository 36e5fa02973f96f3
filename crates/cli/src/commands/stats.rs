// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{DateTime, Utc};
use serde::Serialize;

use ll_core::{PendingChanges, PlayerResources, PlayerStats};

use crate::cli::{OutputFormat, StatsCommand};
use crate::error::Result;
use crate::net::Transport;
use crate::services::Services;
use crate::store::SyncState;

use super::to_json;

/// Everything the local store knows about the player.
#[derive(Debug, Clone, Serialize)]
pub struct StatsView {
    pub stats: PlayerStats,
    pub resources: PlayerResources,
    pub pending_changes: PendingChanges,
    pub last_sync: Option<DateTime<Utc>>,
    pub sync_state: SyncState,
    pub queued_requests: usize,
}

impl StatsView {
    pub fn collect<T: Transport + 'static>(services: &Services<T>) -> Self {
        let store = &services.store;
        StatsView {
            stats: store.stats(),
            resources: store.resources(),
            pending_changes: store.pending_changes(),
            last_sync: store.last_sync(),
            sync_state: store.sync_state(),
            queued_requests: services.queue.len(),
        }
    }
}

/// Execute a stats subcommand.
pub fn run<T: Transport + 'static>(services: &Services<T>, cmd: StatsCommand) -> Result<()> {
    match cmd {
        StatsCommand::Show(args) => {
            let view = StatsView::collect(services);
            match args.output {
                OutputFormat::Text => print!("{}", render_text(&view)),
                OutputFormat::Json => println!("{}", to_json(&view)?),
            }
        }
    }
    Ok(())
}

pub fn render_text(view: &StatsView) -> String {
    let s = &view.stats;
    let r = &view.resources;
    let mut out = String::new();
    out.push_str(&format!("Best score: {} (streak {})\n", s.best_score, s.best_streak));
    out.push_str(&format!("Games: {} (total score {})\n", s.total_games, s.total_score));
    out.push_str(&format!(
        "Missions: {}  Achievements: {}\n",
        s.missions_completed, s.achievements_unlocked
    ));
    out.push_str(&format!("Coins: {}  Gems: {}  Hearts: {}\n", r.coins, r.gems, r.hearts));
    if let Some(kind) = &r.booster.kind {
        match r.booster.expires_at {
            Some(expires_at) => {
                out.push_str(&format!("Booster: {} until {}\n", kind, expires_at.to_rfc3339()))
            }
            None => out.push_str(&format!("Booster: {}\n", kind)),
        }
    }
    if r.premium {
        out.push_str("Premium: yes\n");
    }

    let last_sync = view.last_sync.map(|t| t.to_rfc3339()).unwrap_or_else(|| "never".to_string());
    out.push_str(&format!("Sync: {} (last {})\n", view.sync_state, last_sync));
    if !view.pending_changes.is_empty() {
        let fields: Vec<&str> = view.pending_changes.keys().map(String::as_str).collect();
        out.push_str(&format!("Pending: {}\n", fields.join(", ")));
    }
    if view.queued_requests > 0 {
        out.push_str(&format!("Queued requests: {}\n", view.queued_requests));
    }
    out
}

#[cfg(test)]
#[path = "stats_tests.rs"]
mod tests;

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use crate::cli::{OutputArgs, OutputFormat};
use crate::error::Result;
use crate::net::Transport;
use crate::services::Services;
use crate::store::SyncReport;

use super::to_json;

/// Syncs local state with the backend and prints the outcome.
pub async fn run<T: Transport + 'static>(services: &Services<T>, args: OutputArgs) -> Result<()> {
    let report = services.store.try_sync().await?;
    match args.output {
        OutputFormat::Text => print!("{}", render_report(&report)),
        OutputFormat::Json => println!("{}", to_json(&report)?),
    }
    Ok(())
}

/// Probes connectivity. Offline is an answer, not an error.
pub async fn probe<T: Transport + 'static>(services: &Services<T>) -> Result<()> {
    let online = services.dispatcher.probe().await;
    println!("{}", if online { "online" } else { "offline" });
    Ok(())
}

pub fn render_report(report: &SyncReport) -> String {
    if report.skipped {
        return "Sync already in progress\n".to_string();
    }
    let mut out = format!("Synced: {} pending changes acknowledged\n", report.cleared);
    if !report.conflicts.is_empty() {
        out.push_str(&format!("Merged conflicts: {}\n", report.conflicts.join(", ")));
    }
    if report.remaining > 0 {
        out.push_str(&format!("Still pending: {}\n", report.remaining));
    }
    out
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{DateTime, Utc};

use ll_core::{ClockSource, QueuedRequest, SystemClock};

use crate::cli::{OutputFormat, QueueCommand};
use crate::error::Result;
use crate::net::{QueueStats, Transport};
use crate::services::Services;

use super::to_json;

/// Execute a queue subcommand.
pub async fn run<T: Transport + 'static>(services: &Services<T>, cmd: QueueCommand) -> Result<()> {
    match cmd {
        QueueCommand::Stats(args) => {
            let stats = services.queue.stats();
            match args.output {
                OutputFormat::Text => print!("{}", render_stats(&stats)),
                OutputFormat::Json => println!("{}", to_json(&stats)?),
            }
        }
        QueueCommand::List(args) => {
            let entries = services.queue.snapshot();
            match args.output {
                OutputFormat::Text => print!("{}", render_list(&entries, SystemClock.now())),
                OutputFormat::Json => println!("{}", to_json(&entries)?),
            }
        }
        QueueCommand::Replay => {
            let before = services.queue.len();
            let delivered = services.replay_queue().await?;
            println!(
                "Delivered {} of {} queued requests ({} remaining)",
                delivered,
                before,
                services.queue.len()
            );
        }
        QueueCommand::Clear => {
            let removed = services.queue.clear()?;
            println!("Removed {} queued requests", removed);
        }
    }
    Ok(())
}

pub fn render_stats(stats: &QueueStats) -> String {
    let mut out = format!("Queued: {}\n", stats.total);
    if stats.total == 0 {
        return out;
    }
    for (priority, count) in stats.by_priority.iter().rev() {
        out.push_str(&format!("  priority {:>3}: {}\n", priority, count));
    }
    if let Some(oldest) = stats.oldest_queued_at {
        out.push_str(&format!("Oldest: {}\n", oldest.to_rfc3339()));
    }
    out.push_str(&format!("Max attempts: {}\n", stats.max_attempts));
    out
}

pub fn render_list(entries: &[QueuedRequest], now: DateTime<Utc>) -> String {
    if entries.is_empty() {
        return "No queued requests.\n".to_string();
    }
    entries
        .iter()
        .map(|entry| {
            format!(
                "{} [{}] {} {} (attempts: {}, age: {}s)\n",
                entry.id,
                entry.priority,
                entry.method,
                entry.endpoint,
                entry.attempts,
                entry.age(now).as_secs()
            )
        })
        .collect()
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;

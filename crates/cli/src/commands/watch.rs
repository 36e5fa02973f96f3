// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::future::Future;

use tracing::info;

use crate::error::Result;
use crate::net::Transport;
use crate::scheduler::Scheduler;
use crate::services::Services;

/// Runs the background tasks until Ctrl-C.
pub async fn run<T: Transport + 'static>(services: &Services<T>) -> Result<()> {
    println!(
        "Watching {} (replay every {}s, sync every {}s)",
        services.config.api.base_url,
        services.config.replay_interval().as_secs(),
        services.config.sync_interval().as_secs()
    );
    run_until(services, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("cannot listen for Ctrl-C: {e}");
        }
    })
    .await;
    Ok(())
}

/// Runs the background tasks until `shutdown` completes.
pub async fn run_until<T, F>(services: &Services<T>, shutdown: F)
where
    T: Transport + 'static,
    F: Future<Output = ()>,
{
    let handle = Scheduler::spawn(services);
    shutdown.await;
    info!("shutting down");
    handle.shutdown().await;
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod tests;

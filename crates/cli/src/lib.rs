// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! lifeline - offline-resilient networking for the game client.
//!
//! # Main Components
//!
//! - [`Dispatcher`] - deduplicates, authenticates and retries backend calls
//! - [`OfflineQueue`] - durable, bounded, priority-ordered queue of failed writes
//! - [`DataStore`] - local-first player state with optimistic updates and sync
//! - [`Scheduler`] - background replay and auto-sync
//! - [`Services`] - wires the above together for one state directory
//!
//! ```rust,ignore
//! use lifeline::{Config, Services, StaticTokenProvider};
//!
//! let config = Config::load(&state_dir)?;
//! let services = Services::open(config, &state_dir, Arc::new(StaticTokenProvider::new(token)))?;
//! services.store.add_coins(50)?;
//! services.store.sync().await;
//! ```

mod cli;
mod commands;

pub mod config;
pub mod env;
pub mod error;
pub mod net;
pub mod scheduler;
pub mod services;
pub mod store;

pub use cli::{
    Cli, Command, ConfigCommand, OutputArgs, OutputFormat, QueueCommand, RecordCommand, StatsCommand,
    SubmitArgs,
};
pub use config::Config;
pub use error::{Error, Result};
pub use net::{
    DispatchError, Dispatcher, DispatcherConfig, HttpTransport, OfflineQueue, QueueConfig,
    StaticTokenProvider, TokenProvider, Transport,
};
pub use scheduler::{Scheduler, SchedulerHandle};
pub use services::Services;
pub use store::{DataStore, StoreEvent, SyncState};

use commands::Context;

/// Execute a CLI invocation. This is the main entry point for the binary
/// and provides a testable way to run commands without process execution.
pub fn run(cli: Cli) -> Result<()> {
    let ctx = Context::new(cli.state_dir, cli.token);

    // Config commands never open the state directory.
    let command = match cli.command {
        Command::Config(cmd) => return commands::config::run(&ctx, cmd),
        command => command,
    };

    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    runtime.block_on(async {
        let services = ctx.open_services()?;
        match command {
            Command::Submit(args) => commands::submit::run(&services, args).await,
            Command::Queue(cmd) => commands::queue::run(&services, cmd).await,
            Command::Sync(args) => commands::sync::run(&services, args).await,
            Command::Probe => commands::sync::probe(&services).await,
            Command::Stats(cmd) => commands::stats::run(&services, cmd),
            Command::Record(cmd) => commands::record::run(&services, cmd).await,
            Command::Watch => commands::watch::run(&services).await,
            Command::Config(cmd) => commands::config::run(&ctx, cmd),
        }
    })
}

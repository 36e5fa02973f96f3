// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use ll_core::Method;

/// Output format for commands supporting structured output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args, Clone, Copy, Debug, Default)]
pub struct OutputArgs {
    /// Output format
    #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
    pub output: OutputFormat,
}

#[derive(Parser, Debug)]
#[command(name = "lifeline")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Offline-resilient client for the game backend")]
#[command(
    long_about = "Offline-resilient client for the game backend.\n\n\
    Requests that cannot be delivered are kept in a durable offline queue and \
    replayed later. Player stats and resources are tracked locally and merged \
    with the server on sync."
)]
pub struct Cli {
    /// State directory (default: $LIFELINE_STATE_DIR, then the platform state dir)
    #[arg(long = "state-dir", global = true, value_name = "DIR")]
    pub state_dir: Option<PathBuf>,

    /// Bearer token for authenticated requests (default: $LIFELINE_TOKEN)
    #[arg(long, global = true, value_name = "TOKEN")]
    pub token: Option<String>,

    /// Log debug output to stderr
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send a request to the backend
    #[command(arg_required_else_help = true)]
    Submit(SubmitArgs),

    /// Inspect or drive the offline queue
    #[command(subcommand)]
    Queue(QueueCommand),

    /// Sync player state with the backend
    Sync(OutputArgs),

    /// Check whether the backend is reachable
    Probe,

    /// Show local player state
    #[command(subcommand)]
    Stats(StatsCommand),

    /// Record a local mutation
    #[command(subcommand)]
    Record(RecordCommand),

    /// Show configuration
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Replay the queue and sync in the background until interrupted
    Watch,
}

#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Endpoint path, e.g. /scores
    pub endpoint: String,

    /// HTTP method
    #[arg(long, short = 'X', default_value = "POST")]
    pub method: Method,

    /// JSON request body
    #[arg(long, short = 'd')]
    pub body: Option<String>,

    /// Send without an Authorization header
    #[arg(long = "no-auth")]
    pub no_auth: bool,

    /// Queue the request for replay if retries run out
    #[arg(long)]
    pub queue: bool,

    /// Queue priority override (higher replays first)
    #[arg(long)]
    pub priority: Option<u8>,

    /// Retries after the first attempt
    #[arg(long)]
    pub retries: Option<u32>,

    /// Per-attempt timeout in milliseconds
    #[arg(long = "timeout-ms")]
    pub timeout_ms: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum QueueCommand {
    /// Show queue size and age
    Stats(OutputArgs),
    /// List queued requests in replay order
    List(OutputArgs),
    /// Replay queued requests now
    Replay,
    /// Remove every queued request
    Clear,
}

#[derive(Subcommand, Debug)]
pub enum StatsCommand {
    /// Show stats, resources and sync status
    Show(OutputArgs),
}

#[derive(Subcommand, Debug)]
pub enum RecordCommand {
    /// Record a finished game and submit it to the leaderboard
    Score {
        score: u64,
        /// Streak reached in the game
        #[arg(long, default_value_t = 0)]
        streak: u32,
        /// Level the game was played on
        #[arg(long)]
        level: Option<String>,
    },
    /// Add (positive) or spend (negative) coins
    Coins {
        #[arg(allow_negative_numbers = true)]
        delta: i64,
    },
    /// Report progress on a mission
    Mission {
        mission_id: String,
        progress: u32,
        target: u32,
    },
    /// Report an unlocked achievement
    Achievement { achievement_id: String },
    /// Send an analytics event
    Event {
        name: String,
        /// Event property as KEY=VALUE; VALUE is parsed as JSON when it can be
        #[arg(long = "prop", short = 'p', value_name = "KEY=VALUE")]
        props: Vec<String>,
    },
    /// Validate a store purchase and credit what the server grants
    Purchase {
        product_id: String,
        receipt: String,
        /// Store that issued the receipt (default: the configured platform)
        #[arg(long)]
        store: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration as TOML
    Show,
    /// Print the config file path
    Path,
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

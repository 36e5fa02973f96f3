// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

pub mod config;
pub mod queue;
pub mod record;
pub mod stats;
pub mod submit;
pub mod sync;
pub mod watch;
#[cfg(test)]
#[path = "mod_tests.rs"]
pub mod testing;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{default_state_dir, Config};
use crate::env;
use crate::error::Result;
use crate::net::StaticTokenProvider;
use crate::services::Services;

/// Global options shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    pub state_dir: PathBuf,
    pub token: Option<String>,
}

impl Context {
    /// Resolves the state directory and token from flags and environment.
    pub fn new(state_dir: Option<PathBuf>, token: Option<String>) -> Self {
        Context {
            state_dir: state_dir.unwrap_or_else(default_state_dir),
            token: token.or_else(env::token),
        }
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    pub fn load_config(&self) -> Result<Config> {
        Config::load(&self.state_dir)
    }

    /// Opens the services for this state directory.
    pub fn open_services(&self) -> Result<Services> {
        let config = self.load_config()?;
        let tokens = Arc::new(StaticTokenProvider::from_option(self.token.clone()));
        Services::open(config, &self.state_dir, tokens)
    }
}

/// Pretty-prints a serializable value as JSON.
pub fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

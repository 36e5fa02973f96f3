// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime configuration.
//!
//! Configuration is stored in `<state_dir>/config.toml`. A missing file
//! yields defaults; a missing field yields that field's default.
//! `LIFELINE_API_URL` overrides `api.base_url`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::env;
use crate::error::{Error, Result};
use crate::net::{DispatcherConfig, QueueConfig};

const CONFIG_FILE_NAME: &str = "config.toml";
const APP_DIR_NAME: &str = "lifeline";

/// Runtime configuration stored in `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub queue: QueueSection,
    #[serde(default)]
    pub sync: SyncSection,
}

/// Backend endpoint and request defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-attempt timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Retries after the first attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Backoff unit; attempt `n` waits `n * retry_base_delay_ms`.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_platform")]
    pub platform: String,
    #[serde(default = "default_app_version")]
    pub app_version: String,
}

/// Offline queue limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueSection {
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,
    #[serde(default = "default_max_queue_age_secs")]
    pub max_queue_age_secs: u64,
    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: u32,
    /// Pause between replayed entries.
    #[serde(default = "default_replay_delay_ms")]
    pub replay_delay_ms: u64,
    #[serde(default = "default_replay_interval_secs")]
    pub replay_interval_secs: u64,
}

/// Local data store sync cadence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSection {
    #[serde(default = "default_sync_interval_secs")]
    pub interval_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    1_000
}

fn default_platform() -> String {
    "rust".to_string()
}

fn default_app_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_max_queue_size() -> usize {
    100
}

fn default_max_queue_age_secs() -> u64 {
    7 * 24 * 60 * 60
}

fn default_max_retry_attempts() -> u32 {
    5
}

fn default_replay_delay_ms() -> u64 {
    100
}

fn default_replay_interval_secs() -> u64 {
    30
}

fn default_sync_interval_secs() -> u64 {
    300
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            platform: default_platform(),
            app_version: default_app_version(),
        }
    }
}

impl Default for QueueSection {
    fn default() -> Self {
        QueueSection {
            max_queue_size: default_max_queue_size(),
            max_queue_age_secs: default_max_queue_age_secs(),
            max_retry_attempts: default_max_retry_attempts(),
            replay_delay_ms: default_replay_delay_ms(),
            replay_interval_secs: default_replay_interval_secs(),
        }
    }
}

impl Default for SyncSection {
    fn default() -> Self {
        SyncSection { interval_secs: default_sync_interval_secs() }
    }
}

impl Config {
    /// Loads `config.toml` from the state directory and applies environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigParse`] for malformed TOML and
    /// [`Error::InvalidConfig`] when [`Config::validate`] rejects the result.
    pub fn load(state_dir: &Path) -> Result<Self> {
        let mut config = Self::read(state_dir)?;
        if let Some(url) = env::api_url() {
            config.api.base_url = url;
        }
        config.validate()?;
        Ok(config)
    }

    /// Reads `config.toml` without environment overrides or validation.
    pub fn read(state_dir: &Path) -> Result<Self> {
        match fs::read_to_string(config_path(state_dir)) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Writes the config to `<state_dir>/config.toml`.
    pub fn save(&self, state_dir: &Path) -> Result<()> {
        fs::create_dir_all(state_dir)?;
        let content = toml::to_string_pretty(self)?;
        fs::write(config_path(state_dir), content)?;
        Ok(())
    }

    /// Rejects settings the runtime cannot work with.
    pub fn validate(&self) -> Result<()> {
        let url = self.api.base_url.trim();
        if url.is_empty() {
            return Err(Error::InvalidConfig("api.base_url cannot be empty".to_string()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::InvalidConfig(format!(
                "api.base_url '{url}' must start with http:// or https://"
            )));
        }
        if self.api.timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "api.timeout_ms must be at least 1; a zero timeout fails every request".to_string(),
            ));
        }
        if self.queue.max_queue_size == 0 {
            return Err(Error::InvalidConfig(
                "queue.max_queue_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            base_url: self.api.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_millis(self.api.timeout_ms),
            max_retries: self.api.max_retries,
            retry_base_delay: Duration::from_millis(self.api.retry_base_delay_ms),
            platform: self.api.platform.clone(),
            app_version: self.api.app_version.clone(),
        }
    }

    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            max_queue_size: self.queue.max_queue_size,
            max_queue_age: Duration::from_secs(self.queue.max_queue_age_secs),
            max_retry_attempts: self.queue.max_retry_attempts,
            replay_delay: Duration::from_millis(self.queue.replay_delay_ms),
        }
    }

    pub fn replay_interval(&self) -> Duration {
        Duration::from_secs(self.queue.replay_interval_secs)
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync.interval_secs)
    }
}

/// Returns the path of the config file inside a state directory.
pub fn config_path(state_dir: &Path) -> PathBuf {
    state_dir.join(CONFIG_FILE_NAME)
}

/// Resolves the state directory.
///
/// Priority:
/// 1. `LIFELINE_STATE_DIR`
/// 2. `$XDG_STATE_HOME/lifeline`
/// 3. platform state dir (`dirs::state_dir()`)
/// 4. `~/.local/state/lifeline`
pub fn default_state_dir() -> PathBuf {
    if let Some(dir) = env::state_dir() {
        return dir;
    }
    if let Some(xdg) = env::xdg_state_home() {
        return xdg.join(APP_DIR_NAME);
    }
    if let Some(dir) = dirs::state_dir() {
        return dir.join(APP_DIR_NAME);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".local")
        .join("state")
        .join(APP_DIR_NAME)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

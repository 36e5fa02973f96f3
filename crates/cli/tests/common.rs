// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

// Allow unused items: test helpers are shared across multiple test binaries,
// and not every test file uses every helper.
#![allow(dead_code)]
#![allow(unused_imports)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;

pub use predicates::prelude::*;
pub use tempfile::TempDir;

/// Nothing listens on port 1, so connections are refused immediately.
pub const UNREACHABLE_URL: &str = "http://127.0.0.1:1";

/// The binary with a clean environment rooted at `state`.
pub fn lifeline(state: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("lifeline");
    cmd.arg("--state-dir")
        .arg(state.path())
        .env_remove("LIFELINE_STATE_DIR")
        .env_remove("LIFELINE_API_URL")
        .env_remove("LIFELINE_TOKEN")
        .env_remove("RUST_LOG")
        .env_remove("HTTP_PROXY")
        .env_remove("HTTPS_PROXY")
        .env_remove("ALL_PROXY");
    cmd
}

/// Queues one request by submitting it to an unreachable backend.
pub fn queue_offline(state: &TempDir, endpoint: &str) {
    lifeline(state)
        .env("LIFELINE_API_URL", UNREACHABLE_URL)
        .args(["submit", endpoint, "--no-auth", "--queue", "--retries", "0"])
        .assert()
        .failure();
}

/// Writes `config.toml` into the state directory.
pub fn write_config(state: &TempDir, toml: &str) {
    std::fs::write(state.path().join("config.toml"), toml).unwrap();
}

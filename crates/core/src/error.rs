// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for ll-core operations.

use thiserror::Error;

/// All possible errors that can occur in ll-core operations.
///
/// `QueueFull`, `Expired` and `RetriesExhausted` describe entries the offline
/// queue drops on its own. They are logged, never returned from a public
/// queue operation.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid endpoint: '{0}'\n  hint: endpoints are absolute paths such as /scores")]
    InvalidEndpoint(String),

    #[error("offline queue is full (capacity {capacity})")]
    QueueFull { capacity: usize },

    #[error("queued request {id} expired after {age_secs}s")]
    Expired { id: String, age_secs: i64 },

    #[error("queued request {id} exhausted {attempts} replay attempts")]
    RetriesExhausted { id: String, attempts: u32 },

    #[error("insufficient {resource}: have {available}, need {requested}")]
    InsufficientBalance {
        resource: &'static str,
        available: u64,
        requested: u64,
    },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for ll-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;

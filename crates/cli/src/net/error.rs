// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatch error taxonomy.

/// Failure of a dispatched request.
///
/// `Clone` so a single outcome can be handed to every caller that was
/// coalesced onto the same in-flight request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// Missing token, or the server answered 401/403. Never retried or queued.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The request was malformed. Never retried or queued.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Timeout or connection failure.
    #[error("network error: {0}")]
    Network(String),

    /// Any non-2xx status other than 401/403.
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Retries ran out and the request was handed to the offline queue.
    #[error("{source}\n  hint: queued for replay as {id}")]
    Queued {
        id: String,
        source: Box<DispatchError>,
    },
}

impl DispatchError {
    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DispatchError::Network(_) | DispatchError::Server { .. })
    }

    /// Whether the failure is final regardless of connectivity.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DispatchError::Authentication(_) | DispatchError::Validation(_))
    }

    /// Queue entry id when the request was handed to the offline queue.
    pub fn queued_id(&self) -> Option<&str> {
        match self {
            DispatchError::Queued { id, .. } => Some(id),
            _ => None,
        }
    }

    /// HTTP status, when the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            DispatchError::Server { status, .. } => Some(*status),
            DispatchError::Queued { source, .. } => source.status(),
            _ => None,
        }
    }
}

/// Failure type a replay handler may report.
pub trait ReplayError: std::fmt::Display {
    /// Whether the rest of the replay pass should be skipped.
    fn halts_replay(&self) -> bool;
}

impl ReplayError for DispatchError {
    /// A lost connection fails every remaining entry the same way.
    fn halts_replay(&self) -> bool {
        match self {
            DispatchError::Network(_) => true,
            DispatchError::Queued { source, .. } => source.halts_replay(),
            _ => false,
        }
    }
}

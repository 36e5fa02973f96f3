// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Network resilience layer.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Dispatcher  │────►│  Transport  │────►│   Backend   │
//! │ (dedup/retry)│◄────│   (trait)   │◄────│     API     │
//! └──────────────┘     └─────────────┘     └─────────────┘
//!        │  ▲
//!        ▼  │ replay
//! ┌──────────────┐
//! │ OfflineQueue │  (durable, priority-ordered)
//! └──────────────┘
//! ```
//!
//! # Features
//!
//! - At most one network call per dedup key in flight
//! - Auth gating through an injectable token provider
//! - Linear backoff retries for transport failures and non-auth statuses
//! - Bounded offline queue with expiry, attempt limits and replay
//! - Injectable transport trait for testing

mod dispatcher;
mod error;
mod queue;
mod token;
mod transport;

pub use dispatcher::{DispatchResult, Dispatcher, DispatcherConfig};
pub use error::{DispatchError, ReplayError};
pub use queue::{OfflineQueue, QueueConfig, QueueStats};
pub use token::{StaticTokenProvider, TokenProvider};
pub use transport::{
    HttpRequest, HttpResponse, HttpTransport, Transport, TransportError, TransportResult,
};

#[cfg(test)]
pub(crate) mod test_helpers;



#[cfg(test)]
mod queue_tests;

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! ll-core: Shared data model for the lifeline client
//!
//! This crate provides the request descriptors, queue records, player
//! records, merge rules, wire schemas and persistence primitives used by the
//! `lifeline` runtime. Nothing here touches the network.

pub mod clock;
pub mod endpoint;
pub mod error;
pub mod id;
pub mod merge;
pub mod player;
pub mod protocol;
pub mod queued;
pub mod request;
pub mod storage;

pub use clock::{ClockSource, ManualClock, SystemClock};
pub use endpoint::EndpointClass;
pub use error::{Error, Result};
pub use merge::{Merge, MergeRule};
pub use player::{BoosterState, PlayerResources, PlayerStats};
pub use protocol::{ApiRequest, PendingChanges, SyncRequest, SyncResponse};
pub use queued::QueuedRequest;
pub use request::{Method, RequestDescriptor};
pub use storage::{FileStore, KeyValueStore, MemoryStore};

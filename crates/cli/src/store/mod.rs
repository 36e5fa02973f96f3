// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Local-first player state.
//!
//! Mutations apply immediately, are persisted, and are recorded as pending
//! changes. A sync sends state plus pending changes to the backend and
//! merges the returned snapshot with the per-field rules in
//! [`ll_core::merge`].

mod data_store;
mod event;

pub use data_store::{DataStore, Delivery, SyncReport};
pub use event::{StoreEvent, SyncState};

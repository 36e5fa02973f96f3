// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Composition root.
//!
//! Builds the single dispatcher, offline queue and data store for a state
//! directory and wires them together. Holds an exclusive lock on the state
//! directory for its lifetime.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ll_core::{ClockSource, FileStore, KeyValueStore, SystemClock};
use tracing::debug;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::net::{Dispatcher, HttpTransport, OfflineQueue, TokenProvider, Transport};
use crate::store::DataStore;

const LOCK_FILE_NAME: &str = "lifeline.lock";
const DATA_DIR_NAME: &str = "data";

/// Long-lived service instances for one state directory.
pub struct Services<T: Transport = HttpTransport> {
    pub config: Config,
    pub state_dir: PathBuf,
    pub dispatcher: Dispatcher<T>,
    pub queue: Arc<OfflineQueue>,
    pub store: Arc<DataStore<T>>,
    _lock: File,
}

impl Services<HttpTransport> {
    /// Opens the services with the HTTP transport.
    pub fn open(config: Config, state_dir: &Path, tokens: Arc<dyn TokenProvider>) -> Result<Self> {
        Self::with_transport(config, state_dir, tokens, HttpTransport::new()?, Arc::new(SystemClock))
    }
}

impl<T: Transport + 'static> Services<T> {
    /// Opens the services with a custom transport and clock.
    pub fn with_transport(
        config: Config,
        state_dir: &Path,
        tokens: Arc<dyn TokenProvider>,
        transport: T,
        clock: Arc<dyn ClockSource>,
    ) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(state_dir)?;
        let lock = acquire_lock(&state_dir.join(LOCK_FILE_NAME))?;

        let storage: Arc<dyn KeyValueStore> =
            Arc::new(FileStore::open(&state_dir.join(DATA_DIR_NAME))?);
        let queue = Arc::new(OfflineQueue::open(
            config.queue_config(),
            Arc::clone(&storage),
            Arc::clone(&clock),
        )?);
        let dispatcher =
            Dispatcher::new(config.dispatcher_config(), transport, tokens, Arc::clone(&queue));
        let store = Arc::new(DataStore::open(dispatcher.clone(), storage, clock)?);

        debug!(state_dir = %state_dir.display(), queued = queue.len(), "services opened");
        Ok(Services {
            config,
            state_dir: state_dir.to_path_buf(),
            dispatcher,
            queue,
            store,
            _lock: lock,
        })
    }

    /// Runs one replay pass of the offline queue through the dispatcher.
    pub async fn replay_queue(&self) -> Result<usize> {
        replay(&self.dispatcher, &self.queue).await
    }
}

/// Replays `queue` through `dispatcher`'s non-queueing path.
pub(crate) async fn replay<T: Transport + 'static>(
    dispatcher: &Dispatcher<T>,
    queue: &OfflineQueue,
) -> Result<usize> {
    let delivered = queue
        .process_queue(|entry| {
            let dispatcher = dispatcher.clone();
            async move { dispatcher.replay(&entry).await }
        })
        .await?;
    Ok(delivered)
}

/// Acquire an exclusive lock on the lock file.
fn acquire_lock(lock_path: &Path) -> Result<File> {
    use fs2::FileExt;

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(lock_path)?;

    file.try_lock_exclusive().map_err(|_| {
        let dir = lock_path.parent().unwrap_or(lock_path);
        Error::StateLocked(dir.display().to_string())
    })?;

    Ok(file)
}

#[cfg(test)]
#[path = "services_tests.rs"]
mod tests;

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for net module tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::time::Instant;

use ll_core::{KeyValueStore, ManualClock, MemoryStore};
use ll_core::Error as CoreError;

use super::dispatcher::{Dispatcher, DispatcherConfig};
use super::queue::{OfflineQueue, QueueConfig};
use super::token::StaticTokenProvider;
use super::transport::{HttpRequest, HttpResponse, Transport, TransportError, TransportResult};

/// 2026-01-01T00:00:00Z
pub const START_MS: u64 = 1_767_225_600_000;

/// Scripted outcome of one mock call.
#[derive(Debug, Clone)]
pub enum MockReply {
    Status(u16, String),
    Fail(String),
    /// Never answers; the dispatcher's timeout fires.
    Hang,
}

impl MockReply {
    pub fn ok(body: &str) -> Self {
        MockReply::Status(200, body.to_string())
    }
}

#[derive(Default)]
struct MockState {
    script: Mutex<VecDeque<MockReply>>,
    fallback: Mutex<Option<MockReply>>,
    requests: Mutex<Vec<HttpRequest>>,
    instants: Mutex<Vec<Instant>>,
    calls: AtomicUsize,
    gate: Mutex<Option<Arc<Semaphore>>>,
}

/// Mock transport for testing without a server.
///
/// Replies come from the script first, then from the fallback, then
/// default to `200 {}`.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<MockState>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport that answers every call the same way.
    pub fn always(reply: MockReply) -> Self {
        let mock = Self::new();
        *mock.state.fallback.lock().unwrap() = Some(reply);
        mock
    }

    pub fn push(&self, reply: MockReply) {
        self.state.script.lock().unwrap().push_back(reply);
    }

    /// Holds every call until a permit is released with [`MockTransport::release`].
    pub fn gate(&self) {
        *self.state.gate.lock().unwrap() = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn release(&self, calls: usize) {
        if let Some(gate) = self.state.gate.lock().unwrap().as_ref() {
            gate.add_permits(calls);
        }
    }

    pub fn calls(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Gaps between consecutive calls.
    pub fn gaps(&self) -> Vec<Duration> {
        let instants = self.state.instants.lock().unwrap();
        instants.windows(2).map(|pair| pair[1] - pair[0]).collect()
    }

    fn next_reply(&self) -> MockReply {
        if let Some(reply) = self.state.script.lock().unwrap().pop_front() {
            return reply;
        }
        self.state.fallback.lock().unwrap().clone().unwrap_or_else(|| MockReply::ok("{}"))
    }
}

impl Transport for MockTransport {
    fn send(
        &self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = TransportResult<HttpResponse>> + Send + '_>> {
        Box::pin(async move {
            self.state.calls.fetch_add(1, Ordering::SeqCst);
            self.state.instants.lock().unwrap().push(Instant::now());
            self.state.requests.lock().unwrap().push(request);

            let gate = self.state.gate.lock().unwrap().clone();
            if let Some(gate) = gate {
                gate.acquire().await.unwrap().forget();
            }

            match self.next_reply() {
                MockReply::Status(status, body) => Ok(HttpResponse::new(status, body)),
                MockReply::Fail(message) => Err(TransportError::ConnectionFailed(message)),
                MockReply::Hang => std::future::pending().await,
            }
        })
    }
}

/// In-memory store whose writes can be made to fail.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    /// Writes left before the one that fails.
    countdown: Mutex<Option<usize>>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the write after `skip` more successful ones; later writes succeed.
    pub fn fail_write_after(&self, skip: usize) {
        *self.countdown.lock().unwrap() = Some(skip);
    }

    pub fn fail_next_write(&self) {
        self.fail_write_after(0);
    }
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: &str) -> ll_core::Result<Option<String>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> ll_core::Result<()> {
        {
            let mut countdown = self.countdown.lock().unwrap();
            match *countdown {
                Some(0) => {
                    *countdown = None;
                    return Err(CoreError::Storage(format!("disk full writing {key}")));
                }
                Some(left) => *countdown = Some(left - 1),
                None => {}
            }
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> ll_core::Result<()> {
        self.inner.remove(key)
    }
}

/// Dispatcher, queue and mock wired together over in-memory storage.
pub struct Harness {
    pub dispatcher: Dispatcher<MockTransport>,
    pub transport: MockTransport,
    pub queue: Arc<OfflineQueue>,
    pub store: Arc<MemoryStore>,
    pub clock: ManualClock,
}

pub fn dispatcher_config() -> DispatcherConfig {
    DispatcherConfig {
        base_url: "https://api.test".to_string(),
        timeout: Duration::from_secs(1),
        max_retries: 2,
        retry_base_delay: Duration::from_millis(100),
        platform: "test".to_string(),
        app_version: "9.9.9".to_string(),
    }
}

pub fn queue_config() -> QueueConfig {
    QueueConfig { replay_delay: Duration::ZERO, ..QueueConfig::default() }
}

pub fn open_queue(config: QueueConfig, store: Arc<MemoryStore>, clock: &ManualClock) -> OfflineQueue {
    let store: Arc<dyn KeyValueStore> = store;
    OfflineQueue::open(config, store, Arc::new(clock.clone())).unwrap()
}

pub fn harness(transport: MockTransport) -> Harness {
    harness_with_token(transport, Some("token-123"))
}

pub fn harness_with_token(transport: MockTransport, token: Option<&str>) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let clock = ManualClock::new(START_MS);
    let queue = Arc::new(open_queue(queue_config(), Arc::clone(&store), &clock));
    let tokens = Arc::new(StaticTokenProvider::from_option(token.map(str::to_string)));
    let dispatcher =
        Dispatcher::new(dispatcher_config(), transport.clone(), tokens, Arc::clone(&queue));
    Harness { dispatcher, transport, queue, store, clock }
}

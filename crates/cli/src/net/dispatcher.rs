// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Request dispatcher.
//!
//! Every call to the backend goes through [`Dispatcher::submit`]:
//! - Concurrent calls with the same dedup key share one network call
//! - Authenticated requests fail closed without a token
//! - Transport failures and non-auth error statuses retry with linear backoff
//! - Queueable requests that exhaust their retries go to the offline queue

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use ll_core::endpoint;
use ll_core::{ApiRequest, QueuedRequest, RequestDescriptor};

use super::error::DispatchError;
use super::queue::OfflineQueue;
use super::token::TokenProvider;
use super::transport::{HttpRequest, HttpResponse, HttpTransport, Transport};

/// Upper bound for a single backoff delay.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Timeout for the connectivity probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Longest response body kept in a server error message.
const MAX_ERROR_BODY: usize = 200;

/// Outcome shared by every caller of a deduplicated request.
pub type DispatchResult = Result<serde_json::Value, DispatchError>;

type InFlight = Shared<BoxFuture<'static, DispatchResult>>;

/// Dispatcher settings.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatcherConfig {
    /// Base URL without a trailing slash; endpoints are appended.
    pub base_url: String,
    /// Default per-attempt timeout.
    pub timeout: Duration,
    /// Default retries after the first attempt.
    pub max_retries: u32,
    /// Backoff unit.
    pub retry_base_delay: Duration,
    pub platform: String,
    pub app_version: String,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        DispatcherConfig {
            base_url: "http://localhost:8080".to_string(),
            timeout: Duration::from_secs(10),
            max_retries: 3,
            retry_base_delay: Duration::from_secs(1),
            platform: "rust".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl DispatcherConfig {
    /// Delay before retry number `attempt` (1-based).
    ///
    /// Linear in the attempt number and capped, so successive delays never
    /// shrink.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.retry_base_delay.saturating_mul(attempt).min(MAX_BACKOFF)
    }

    fn user_agent(&self) -> String {
        format!("lifeline/{} ({})", self.app_version, self.platform)
    }
}

/// Handle to the shared dispatcher. Cloning is cheap.
pub struct Dispatcher<T: Transport = HttpTransport> {
    inner: Arc<Inner<T>>,
}

impl<T: Transport> Clone for Dispatcher<T> {
    fn clone(&self) -> Self {
        Dispatcher { inner: Arc::clone(&self.inner) }
    }
}

struct Inner<T> {
    config: DispatcherConfig,
    transport: T,
    tokens: Arc<dyn TokenProvider>,
    queue: Arc<OfflineQueue>,
    online: AtomicBool,
    in_flight: Mutex<HashMap<String, InFlight>>,
}

impl<T: Transport + 'static> Dispatcher<T> {
    pub fn new(
        config: DispatcherConfig,
        transport: T,
        tokens: Arc<dyn TokenProvider>,
        queue: Arc<OfflineQueue>,
    ) -> Self {
        Dispatcher {
            inner: Arc::new(Inner {
                config,
                transport,
                tokens,
                queue,
                online: AtomicBool::new(true),
                in_flight: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.inner.config
    }

    pub fn queue(&self) -> &Arc<OfflineQueue> {
        &self.inner.queue
    }

    /// Last known connectivity.
    pub fn is_online(&self) -> bool {
        self.inner.online.load(Ordering::SeqCst)
    }

    /// Number of distinct requests currently in flight.
    pub fn in_flight_count(&self) -> usize {
        self.inner.lock_in_flight().len()
    }

    /// Sends a request, or joins an identical one already in flight.
    ///
    /// Returns the JSON body of a 2xx response. A retryable failure of a
    /// queueable request comes back as [`DispatchError::Queued`] once the
    /// request is in the offline queue.
    pub async fn submit(&self, request: RequestDescriptor) -> DispatchResult {
        let key = request.dedup_key();

        let call = {
            let mut in_flight = self.inner.lock_in_flight();
            match in_flight.get(&key) {
                Some(existing) => {
                    debug!(key = %key, endpoint = %request.endpoint(), "joining in-flight request");
                    existing.clone()
                }
                None => {
                    let inner = Arc::clone(&self.inner);
                    let registered = key.clone();
                    let call = async move {
                        let result = inner.execute(request).await;
                        inner.lock_in_flight().remove(&registered);
                        result
                    }
                    .boxed()
                    .shared();
                    in_flight.insert(key, call.clone());
                    call
                }
            }
        };

        call.await
    }

    /// Sends a typed request body to its endpoint.
    pub async fn send<R: ApiRequest>(&self, body: &R) -> DispatchResult {
        let request = body.to_request().map_err(|e| DispatchError::Validation(e.to_string()))?;
        self.submit(request).await
    }

    /// Sends a typed request body and decodes the response.
    pub async fn call<R: ApiRequest, Resp: DeserializeOwned>(
        &self,
        body: &R,
    ) -> Result<Resp, DispatchError> {
        let value = self.send(body).await?;
        serde_json::from_value(value).map_err(|e| DispatchError::Server {
            status: 200,
            message: format!("unexpected response body: {e}"),
        })
    }

    /// Delivers a queued entry. Never re-queues.
    pub async fn replay(&self, entry: &QueuedRequest) -> Result<(), DispatchError> {
        self.submit(entry.to_request()).await.map(|_| ())
    }

    /// Checks connectivity with an unauthenticated `GET /health`.
    ///
    /// Any HTTP response counts as online.
    pub async fn probe(&self) -> bool {
        let inner = &self.inner;
        let request = HttpRequest {
            method: ll_core::Method::Get,
            url: format!("{}{}", inner.config.base_url, endpoint::HEALTH),
            headers: inner.base_headers(),
            body: None,
        };
        let timeout = PROBE_TIMEOUT.min(inner.config.timeout);

        let online =
            matches!(tokio::time::timeout(timeout, inner.transport.send(request)).await, Ok(Ok(_)));
        inner.set_online(online);
        info!(online, "connectivity probe");
        online
    }
}

impl<T: Transport> Inner<T> {
    fn lock_in_flight(&self) -> MutexGuard<'_, HashMap<String, InFlight>> {
        self.in_flight.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_online(&self, online: bool) {
        let was = self.online.swap(online, Ordering::SeqCst);
        if was != online {
            info!(online, "connectivity changed");
        }
    }

    fn base_headers(&self) -> Vec<(String, String)> {
        vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("X-Client-Platform".to_string(), self.config.platform.clone()),
            ("X-App-Version".to_string(), self.config.app_version.clone()),
            ("User-Agent".to_string(), self.config.user_agent()),
        ]
    }

    async fn build_request(&self, request: &RequestDescriptor) -> Result<HttpRequest, DispatchError> {
        let mut headers = self.base_headers();

        if request.requires_auth() {
            let token = self
                .tokens
                .valid_token()
                .await
                .filter(|t| !t.is_empty())
                .ok_or_else(|| DispatchError::Authentication("no valid token available".to_string()))?;
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }

        for (name, value) in request.headers() {
            headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
            headers.push((name.clone(), value.clone()));
        }

        Ok(HttpRequest {
            method: request.method(),
            url: format!("{}{}", self.config.base_url, request.endpoint()),
            headers,
            body: request.body().map(|body| body.to_string()),
        })
    }

    /// One attempt: send with a timeout and classify the outcome.
    async fn attempt(&self, request: &HttpRequest, timeout: Duration) -> DispatchResult {
        let response = match tokio::time::timeout(timeout, self.transport.send(request.clone())).await
        {
            Err(_) => {
                self.set_online(false);
                return Err(DispatchError::Network(format!(
                    "request timed out after {}ms",
                    timeout.as_millis()
                )));
            }
            Ok(Err(e)) => {
                self.set_online(false);
                return Err(DispatchError::Network(e.to_string()));
            }
            Ok(Ok(response)) => response,
        };

        self.set_online(true);
        classify(response)
    }

    async fn execute(&self, request: RequestDescriptor) -> DispatchResult {
        request.validate().map_err(|e| DispatchError::Validation(e.to_string()))?;
        let http = self.build_request(&request).await?;

        let timeout = request.timeout().unwrap_or(self.config.timeout);
        let max_retries = request.max_retries().unwrap_or(self.config.max_retries);

        let mut attempt = 0;
        let error = loop {
            match self.attempt(&http, timeout).await {
                Ok(value) => {
                    debug!(endpoint = %request.endpoint(), attempt, "request succeeded");
                    return Ok(value);
                }
                Err(e) if !e.is_retryable() => {
                    warn!(endpoint = %request.endpoint(), "request failed: {e}");
                    return Err(e);
                }
                Err(e) if attempt >= max_retries => break e,
                Err(e) => {
                    attempt += 1;
                    let delay = self.config.backoff_delay(attempt);
                    debug!(
                        endpoint = %request.endpoint(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "retrying after: {e}"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        };

        warn!(endpoint = %request.endpoint(), attempts = attempt + 1, "retries exhausted: {error}");

        if !request.can_queue() {
            return Err(error);
        }
        match self.queue.enqueue(&request) {
            Ok(entry) => Err(DispatchError::Queued { id: entry.id, source: Box::new(error) }),
            Err(e) => {
                warn!(endpoint = %request.endpoint(), "could not queue request: {e}");
                Err(error)
            }
        }
    }
}

/// Maps an HTTP response onto the status contract.
fn classify(response: HttpResponse) -> DispatchResult {
    match response.status {
        200..=299 => {
            if response.body.trim().is_empty() {
                return Ok(serde_json::Value::Null);
            }
            Ok(serde_json::from_str(&response.body)
                .unwrap_or(serde_json::Value::String(response.body)))
        }
        401 | 403 => Err(DispatchError::Authentication(format!(
            "server rejected credentials ({})",
            response.status
        ))),
        status => {
            let mut message: String = response.body.chars().take(MAX_ERROR_BODY).collect();
            if message.is_empty() {
                message = "no response body".to_string();
            }
            Err(DispatchError::Server { status, message })
        }
    }
}

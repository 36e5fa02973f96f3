// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted offline queue records.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::endpoint::EndpointClass;
use crate::error::{Error, Result};
use crate::request::{derive_dedup_key, Method, RequestDescriptor};

/// A request waiting in the offline queue.
///
/// `id` never changes for the life of the entry and `attempts` only grows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedRequest {
    pub id: String,
    pub endpoint: String,
    pub method: Method,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    pub requires_auth: bool,
    pub queued_at: DateTime<Utc>,
    #[serde(default)]
    pub attempts: u32,
    pub priority: u8,
    /// Dedup key of the original request. Empty in records written before
    /// keys were stored; [`QueuedRequest::key`] derives it then.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dedup_key: String,
}

impl QueuedRequest {
    /// Wraps a descriptor for the queue.
    ///
    /// Priority comes from the descriptor override when present, otherwise
    /// from the endpoint class.
    pub fn new(id: String, request: &RequestDescriptor, queued_at: DateTime<Utc>) -> Self {
        let priority = request
            .priority()
            .unwrap_or_else(|| EndpointClass::classify(request.endpoint()).queue_priority());

        QueuedRequest {
            id,
            endpoint: request.endpoint().to_string(),
            method: request.method(),
            body: request.body().cloned(),
            headers: request.headers().clone(),
            requires_auth: request.requires_auth(),
            queued_at,
            attempts: 0,
            priority,
            dedup_key: request.dedup_key(),
        }
    }

    /// Age of the entry at `now`. Never negative.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.queued_at).to_std().unwrap_or(Duration::ZERO)
    }

    pub fn is_expired(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        self.age(now) > max_age
    }

    /// Checks whether the entry may still be replayed.
    ///
    /// Returns `Expired` or `RetriesExhausted` for entries that must be dropped.
    pub fn check_replayable(
        &self,
        now: DateTime<Utc>,
        max_age: Duration,
        max_attempts: u32,
    ) -> Result<()> {
        if self.is_expired(now, max_age) {
            return Err(Error::Expired {
                id: self.id.clone(),
                age_secs: self.age(now).as_secs() as i64,
            });
        }
        if self.attempts >= max_attempts {
            return Err(Error::RetriesExhausted { id: self.id.clone(), attempts: self.attempts });
        }
        Ok(())
    }

    /// Dedup key shared with identical requests.
    pub fn key(&self) -> String {
        if self.dedup_key.is_empty() {
            derive_dedup_key(self.method, &self.endpoint, self.body.as_ref())
        } else {
            self.dedup_key.clone()
        }
    }

    /// Records a failed replay.
    pub fn record_failure(&mut self) {
        self.attempts = self.attempts.saturating_add(1);
    }

    /// Rebuilds the request for replay. Replays never re-enter the queue.
    pub fn to_request(&self) -> RequestDescriptor {
        let mut request = RequestDescriptor::new(self.method, self.endpoint.clone())
            .with_auth(self.requires_auth)
            .with_queueing(false)
            .with_priority(self.priority)
            .with_dedup_key(self.key());
        if let Some(body) = &self.body {
            request = request.with_body(body.clone());
        }
        for (name, value) in &self.headers {
            request = request.with_header(name.clone(), value.clone());
        }
        request
    }
}

#[cfg(test)]
#[path = "queued_tests.rs"]
mod tests;

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Request descriptors.
//!
//! A [`RequestDescriptor`] is everything the dispatcher needs to perform one
//! backend call. It is built once with the `with_*` methods and then only
//! read; the dispatcher never mutates a descriptor it was handed.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// HTTP method of a backend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            _ => Err(Error::InvalidRequest(format!("unknown method '{s}'"))),
        }
    }
}

/// Description of a single backend call.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    endpoint: String,
    method: Method,
    body: Option<serde_json::Value>,
    headers: BTreeMap<String, String>,
    requires_auth: bool,
    can_queue: bool,
    timeout: Option<Duration>,
    max_retries: Option<u32>,
    priority: Option<u8>,
    dedup_key: Option<String>,
}

impl RequestDescriptor {
    /// Creates an authenticated, non-queueable request.
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        RequestDescriptor {
            endpoint: endpoint.into(),
            method,
            body: None,
            headers: BTreeMap::new(),
            requires_auth: true,
            can_queue: false,
            timeout: None,
            max_retries: None,
            priority: None,
            dedup_key: None,
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Get, endpoint)
    }

    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Post, endpoint)
    }

    /// Sets the JSON body.
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Serializes a typed payload as the JSON body.
    pub fn with_json<T: Serialize + ?Sized>(self, payload: &T) -> Result<Self> {
        Ok(self.with_body(serde_json::to_value(payload)?))
    }

    /// Adds a header that overrides the client defaults.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_auth(mut self, requires_auth: bool) -> Self {
        self.requires_auth = requires_auth;
        self
    }

    /// Allows the request to be handed to the offline queue once retries run out.
    pub fn queueable(mut self) -> Self {
        self.can_queue = true;
        self
    }

    pub fn with_queueing(mut self, can_queue: bool) -> Self {
        self.can_queue = can_queue;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Overrides the queue priority derived from the endpoint class.
    ///
    /// Higher values replay first.
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_dedup_key(mut self, key: impl Into<String>) -> Self {
        self.dedup_key = Some(key.into());
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn requires_auth(&self) -> bool {
        self.requires_auth
    }

    pub fn can_queue(&self) -> bool {
        self.can_queue
    }

    /// Per-request timeout, if one was set.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Per-request retry limit, if one was set.
    pub fn max_retries(&self) -> Option<u32> {
        self.max_retries
    }

    pub fn priority(&self) -> Option<u8> {
        self.priority
    }

    /// Key used to coalesce concurrent identical requests.
    ///
    /// The explicit key when one was given, otherwise a hash of
    /// method, endpoint and body.
    pub fn dedup_key(&self) -> String {
        if let Some(key) = &self.dedup_key {
            return key.clone();
        }
        derive_dedup_key(self.method, &self.endpoint, self.body.as_ref())
    }

    /// Rejects requests that can never succeed no matter how often they are retried.
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.is_empty() || !self.endpoint.starts_with('/') {
            return Err(Error::InvalidEndpoint(self.endpoint.clone()));
        }
        if self.method == Method::Get && self.body.is_some() {
            return Err(Error::InvalidRequest("GET requests cannot carry a body".to_string()));
        }
        if self.timeout == Some(Duration::ZERO) {
            return Err(Error::InvalidRequest("timeout must be greater than zero".to_string()));
        }
        if self.headers.keys().any(|name| name.trim().is_empty()) {
            return Err(Error::InvalidRequest("header names cannot be empty".to_string()));
        }
        Ok(())
    }
}

/// Derives a dedup key: first 16 hex chars of SHA256(method, endpoint, body).
pub fn derive_dedup_key(method: Method, endpoint: &str, body: Option<&serde_json::Value>) -> String {
    let body = body.map(|b| b.to_string()).unwrap_or_default();
    let input = format!("{}\n{}\n{}", method, endpoint, body);
    let hash = Sha256::digest(input.as_bytes());
    hex::encode(&hash[..8])
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Bearer token supply.

use std::future::Future;
use std::pin::Pin;

/// Source of the opaque bearer token used for authenticated requests.
///
/// Implementations may refresh the token before answering. Returning
/// `None` makes the dispatcher fail closed.
pub trait TokenProvider: Send + Sync {
    fn valid_token(&self) -> Pin<Box<dyn Future<Output = Option<String>> + Send + '_>>;
}

/// Provider holding a fixed token. An empty token counts as none.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenProvider {
    token: Option<String>,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self::from_option(Some(token.into()))
    }

    /// Provider that never has a token.
    pub fn none() -> Self {
        StaticTokenProvider { token: None }
    }

    pub fn from_option(token: Option<String>) -> Self {
        StaticTokenProvider { token: token.filter(|t| !t.trim().is_empty()) }
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }
}

impl TokenProvider for StaticTokenProvider {
    fn valid_token(&self) -> Pin<Box<dyn Future<Output = Option<String>> + Send + '_>> {
        Box::pin(async move { self.token.clone() })
    }
}

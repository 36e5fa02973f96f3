// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Backend endpoints and their replay priority.
//!
//! Priority table (higher replays first):
//! - score submission, profile sync, purchase validation: 10
//! - missions, achievements, analytics: 5
//! - everything else: 1

use std::fmt;

pub const SCORES: &str = "/scores";
pub const PROFILE_SYNC: &str = "/profile/sync";
pub const PURCHASE_VALIDATE: &str = "/purchases/validate";
pub const MISSION_PROGRESS: &str = "/missions/progress";
pub const ACHIEVEMENTS: &str = "/achievements";
pub const ANALYTICS_EVENTS: &str = "/analytics/events";
pub const HEALTH: &str = "/health";

pub const PRIORITY_HIGH: u8 = 10;
pub const PRIORITY_NORMAL: u8 = 5;
pub const PRIORITY_LOW: u8 = 1;

/// Semantic class of a backend endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointClass {
    Score,
    ProfileSync,
    Purchase,
    Mission,
    Achievement,
    Analytics,
    Other,
}

impl EndpointClass {
    /// Classifies an endpoint path by its leading segment.
    ///
    /// Query strings are ignored. Unknown paths are `Other`.
    pub fn classify(endpoint: &str) -> Self {
        let path = endpoint.split('?').next().unwrap_or_default();
        let mut segments = path.trim_start_matches('/').split('/');
        let first = segments.next().unwrap_or_default();
        let second = segments.next().unwrap_or_default();

        match (first, second) {
            ("scores" | "leaderboard", _) => EndpointClass::Score,
            ("profile", "sync") | ("sync", _) => EndpointClass::ProfileSync,
            ("purchases", _) => EndpointClass::Purchase,
            ("missions", _) => EndpointClass::Mission,
            ("achievements", _) => EndpointClass::Achievement,
            ("analytics", _) => EndpointClass::Analytics,
            _ => EndpointClass::Other,
        }
    }

    /// Replay priority for entries of this class.
    pub fn queue_priority(self) -> u8 {
        match self {
            EndpointClass::Score | EndpointClass::ProfileSync | EndpointClass::Purchase => {
                PRIORITY_HIGH
            }
            EndpointClass::Mission | EndpointClass::Achievement | EndpointClass::Analytics => {
                PRIORITY_NORMAL
            }
            EndpointClass::Other => PRIORITY_LOW,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EndpointClass::Score => "score",
            EndpointClass::ProfileSync => "profile_sync",
            EndpointClass::Purchase => "purchase",
            EndpointClass::Mission => "mission",
            EndpointClass::Achievement => "achievement",
            EndpointClass::Analytics => "analytics",
            EndpointClass::Other => "other",
        }
    }
}

impl fmt::Display for EndpointClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "endpoint_tests.rs"]
mod tests;

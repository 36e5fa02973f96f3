// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Merge server snapshots into local state with per-field rules.
//!
//! Merge rules:
//! - PlayerStats: every counter takes the max of local and server
//! - PlayerResources: coins, gems and hearts keep the local value
//! - PlayerResources: booster and premium take the server value
//!
//! Every merge is idempotent: merging the same snapshot twice yields the
//! same state as merging it once. Stats merges are also commutative.

use crate::player::{PlayerResources, PlayerStats};

/// How a single field combines its local and server values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeRule {
    /// Larger value wins.
    Max,
    /// Local value wins.
    LocalWins,
    /// Server value wins.
    ServerWins,
}

impl MergeRule {
    pub fn resolve<T: Clone + PartialOrd>(self, local: &T, server: &T) -> T {
        match self {
            MergeRule::Max if server > local => server.clone(),
            MergeRule::Max | MergeRule::LocalWins => local.clone(),
            MergeRule::ServerWins => server.clone(),
        }
    }
}

/// Trait for combining local state with a server snapshot.
pub trait Merge: Sized {
    /// Field names and the rule each one follows.
    const RULES: &'static [(&'static str, MergeRule)];

    /// Returns local state merged with the server snapshot.
    fn merge(&self, server: &Self) -> Self;

    /// Names of fields where local and server disagree.
    ///
    /// A non-empty result is advisory; `merge` always resolves it.
    fn conflicts(&self, server: &Self) -> Vec<&'static str>;
}

macro_rules! differing {
    ($local:expr, $server:expr, [$($field:ident),* $(,)?]) => {{
        let mut fields = Vec::new();
        $(
            if $local.$field != $server.$field {
                fields.push(stringify!($field));
            }
        )*
        fields
    }};
}

impl Merge for PlayerStats {
    const RULES: &'static [(&'static str, MergeRule)] = &[
        ("best_score", MergeRule::Max),
        ("best_streak", MergeRule::Max),
        ("total_games", MergeRule::Max),
        ("total_score", MergeRule::Max),
        ("missions_completed", MergeRule::Max),
        ("achievements_unlocked", MergeRule::Max),
    ];

    fn merge(&self, server: &Self) -> Self {
        PlayerStats {
            best_score: MergeRule::Max.resolve(&self.best_score, &server.best_score),
            best_streak: MergeRule::Max.resolve(&self.best_streak, &server.best_streak),
            total_games: MergeRule::Max.resolve(&self.total_games, &server.total_games),
            total_score: MergeRule::Max.resolve(&self.total_score, &server.total_score),
            missions_completed: MergeRule::Max
                .resolve(&self.missions_completed, &server.missions_completed),
            achievements_unlocked: MergeRule::Max
                .resolve(&self.achievements_unlocked, &server.achievements_unlocked),
        }
    }

    fn conflicts(&self, server: &Self) -> Vec<&'static str> {
        differing!(
            self,
            server,
            [
                best_score,
                best_streak,
                total_games,
                total_score,
                missions_completed,
                achievements_unlocked,
            ]
        )
    }
}

impl Merge for PlayerResources {
    const RULES: &'static [(&'static str, MergeRule)] = &[
        ("coins", MergeRule::LocalWins),
        ("gems", MergeRule::LocalWins),
        ("hearts", MergeRule::LocalWins),
        ("booster", MergeRule::ServerWins),
        ("premium", MergeRule::ServerWins),
    ];

    fn merge(&self, server: &Self) -> Self {
        PlayerResources {
            coins: MergeRule::LocalWins.resolve(&self.coins, &server.coins),
            gems: MergeRule::LocalWins.resolve(&self.gems, &server.gems),
            hearts: MergeRule::LocalWins.resolve(&self.hearts, &server.hearts),
            booster: MergeRule::ServerWins.resolve(&self.booster, &server.booster),
            premium: MergeRule::ServerWins.resolve(&self.premium, &server.premium),
        }
    }

    fn conflicts(&self, server: &Self) -> Vec<&'static str> {
        differing!(self, server, [coins, gems, hearts, booster, premium])
    }
}

#[cfg(test)]
#[path = "merge_tests.rs"]
mod tests;

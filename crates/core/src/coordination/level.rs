// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Priority tiers for standby nodes
//!
//! Each node declares a level. A numerically smaller positive level takes
//! precedence; the "max alive level" is the alive level with the highest
//! precedence. Level 0 marks a node that is never a candidate.
//!
//! Two arbiter variants exist. [`SingleTier`] has no heartbeat and always
//! reports its own level as the alive maximum. [`Tiered`] asserts its level
//! into a shared [`LevelStore`] with a heart-time TTL, so a standby node only
//! becomes eligible after every stronger node has stopped heartbeating.

use super::store::StoreError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// A node's priority tier
pub type Level = u32;

/// Level assumed when none is configured
pub const DEFAULT_LEVEL: Level = 1;

/// True when `candidate` takes precedence over `current`
pub fn outranks(candidate: Level, current: Level) -> bool {
    candidate != 0 && candidate < current
}

/// Cluster-wide record of the strongest alive level
#[async_trait]
pub trait LevelStore: Send + Sync {
    /// Record that a node at `level` is alive for `heart_time`.
    ///
    /// Must not overwrite a still-alive assertion of a stronger level.
    /// Assertions of level 0 are ignored.
    async fn assert_level(&self, level: Level, heart_time: Duration) -> Result<(), StoreError>;

    /// The strongest level whose assertion has not expired, if any
    async fn max_alive_level(&self) -> Result<Option<Level>, StoreError>;
}

#[async_trait]
impl<S: LevelStore + ?Sized> LevelStore for Arc<S> {
    async fn assert_level(&self, level: Level, heart_time: Duration) -> Result<(), StoreError> {
        (**self).assert_level(level, heart_time).await
    }

    async fn max_alive_level(&self) -> Result<Option<Level>, StoreError> {
        (**self).max_alive_level().await
    }
}

/// A node's view of priority arbitration
#[async_trait]
pub trait LevelArbiter: Send + Sync {
    /// This node's level
    fn level(&self) -> Level;

    /// How long an assertion of this node's level stays alive.
    ///
    /// `None` means the arbiter needs no heartbeat.
    fn heart_time(&self) -> Option<Duration>;

    /// Assert this node's level
    async fn keep_alive(&self) -> Result<(), StoreError>;

    /// The strongest alive level, `None` when no node holds the record
    async fn max_alive_level(&self) -> Result<Option<Level>, StoreError>;
}

#[async_trait]
impl<A: LevelArbiter + ?Sized> LevelArbiter for Arc<A> {
    fn level(&self) -> Level {
        (**self).level()
    }

    fn heart_time(&self) -> Option<Duration> {
        (**self).heart_time()
    }

    async fn keep_alive(&self) -> Result<(), StoreError> {
        (**self).keep_alive().await
    }

    async fn max_alive_level(&self) -> Result<Option<Level>, StoreError> {
        (**self).max_alive_level().await
    }
}

/// Every node is in the same tier and always eligible
#[derive(Debug, Clone, Copy)]
pub struct SingleTier {
    level: Level,
}

impl SingleTier {
    pub fn new(level: Level) -> Self {
        Self { level }
    }
}

impl Default for SingleTier {
    fn default() -> Self {
        Self::new(DEFAULT_LEVEL)
    }
}

#[async_trait]
impl LevelArbiter for SingleTier {
    fn level(&self) -> Level {
        self.level
    }

    fn heart_time(&self) -> Option<Duration> {
        None
    }

    async fn keep_alive(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn max_alive_level(&self) -> Result<Option<Level>, StoreError> {
        Ok(Some(self.level))
    }
}

/// Heartbeat-backed arbitration over a shared [`LevelStore`]
#[derive(Debug, Clone)]
pub struct Tiered<S> {
    store: S,
    level: Level,
    heart_time: Duration,
}

impl<S: LevelStore> Tiered<S> {
    pub fn new(store: S, level: Level, heart_time: Duration) -> Self {
        Self {
            store,
            level,
            heart_time,
        }
    }
}

#[async_trait]
impl<S: LevelStore> LevelArbiter for Tiered<S> {
    fn level(&self) -> Level {
        self.level
    }

    fn heart_time(&self) -> Option<Duration> {
        Some(self.heart_time)
    }

    async fn keep_alive(&self) -> Result<(), StoreError> {
        self.store.assert_level(self.level, self.heart_time).await
    }

    async fn max_alive_level(&self) -> Result<Option<Level>, StoreError> {
        self.store.max_alive_level().await
    }
}

#[cfg(test)]
#[path = "level_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process coordination store
//!
//! Coordinates tasks between registries in one process (or between simulated
//! nodes in tests). Every clone, and every [`MemoryStore::node_view`], shares
//! the same lease and level state.

use super::level::{Level, LevelStore};
use super::store::{LockStore, StoreError};
use crate::clock::{add_duration, Clock, SystemClock};
use crate::id::{NodeId, TaskId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

#[derive(Debug, Clone)]
struct LeaseRecord {
    holder: NodeId,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Inner {
    leases: HashMap<TaskId, LeaseRecord>,
    /// Expiry of the latest assertion per level
    levels: BTreeMap<Level, DateTime<Utc>>,
}

/// Mutex-guarded lease and level records
#[derive(Clone)]
pub struct MemoryStore<C: Clock = SystemClock> {
    clock: C,
    node: NodeId,
    inner: Arc<Mutex<Inner>>,
}

static SHARED: OnceLock<MemoryStore> = OnceLock::new();

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    /// Process-wide default store, built on first use.
    ///
    /// Used when the host configures no store of its own.
    pub fn shared() -> Self {
        SHARED.get_or_init(MemoryStore::new).clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> MemoryStore<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            node: NodeId::generate(),
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// A handle on the same state that records `node` as lease holder
    pub fn node_view(&self, node: NodeId) -> Self {
        Self {
            clock: self.clock.clone(),
            node,
            inner: Arc::clone(&self.inner),
        }
    }

    pub fn node(&self) -> &NodeId {
        &self.node
    }

    /// Holder of the active lease for `id`, if any
    pub fn holder(&self, id: &TaskId) -> Option<NodeId> {
        let now = self.clock.now();
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner
            .leases
            .get(id)
            .filter(|r| r.expires_at > now)
            .map(|r| r.holder.clone())
    }

    /// Expiry of the active lease for `id`, if any
    pub fn expires_at(&self, id: &TaskId) -> Option<DateTime<Utc>> {
        let now = self.clock.now();
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner
            .leases
            .get(id)
            .map(|r| r.expires_at)
            .filter(|expires_at| *expires_at > now)
    }
}

#[async_trait]
impl<C: Clock + 'static> LockStore for MemoryStore<C> {
    async fn has_active_lock(&self, id: &TaskId) -> Result<bool, StoreError> {
        Ok(self.expires_at(id).is_some())
    }

    async fn acquire_lock(&self, id: &TaskId, lease: Duration) -> Result<bool, StoreError> {
        let now = self.clock.now();
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        inner.leases.retain(|_, r| r.expires_at > now);
        if inner.leases.contains_key(id) {
            return Ok(false);
        }

        inner.leases.insert(
            id.clone(),
            LeaseRecord {
                holder: self.node.clone(),
                expires_at: add_duration(now, lease),
            },
        );
        Ok(true)
    }

    async fn extend_lock(&self, id: &TaskId, lease: Duration) -> Result<(), StoreError> {
        let now = self.clock.now();
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.leases.insert(
            id.clone(),
            LeaseRecord {
                holder: self.node.clone(),
                expires_at: add_duration(now, lease),
            },
        );
        Ok(())
    }

    async fn server_time(&self) -> Result<DateTime<Utc>, StoreError> {
        Ok(self.clock.now())
    }
}

#[async_trait]
impl<C: Clock + 'static> LevelStore for MemoryStore<C> {
    async fn assert_level(&self, level: Level, heart_time: Duration) -> Result<(), StoreError> {
        if level == 0 {
            return Ok(());
        }

        let now = self.clock.now();
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.levels.retain(|_, expires_at| *expires_at > now);
        let expires_at = add_duration(now, heart_time);
        let entry = inner.levels.entry(level).or_insert(expires_at);
        *entry = (*entry).max(expires_at);
        Ok(())
    }

    async fn max_alive_level(&self) -> Result<Option<Level>, StoreError> {
        let now = self.clock.now();
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(inner
            .levels
            .iter()
            .find(|(_, expires_at)| **expires_at > now)
            .map(|(level, _)| *level))
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;

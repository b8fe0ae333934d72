// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake coordination store for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::level::{Level, LevelStore};
use super::memory::MemoryStore;
use super::store::{LockStore, StoreError};
use crate::clock::FakeClock;
use crate::id::TaskId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Recorded store operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockCall {
    HasActiveLock { id: TaskId },
    AcquireLock { id: TaskId, lease: Duration },
    ExtendLock { id: TaskId, lease: Duration },
    ServerTime,
    AssertLevel { level: Level, heart_time: Duration },
    MaxAliveLevel,
}

/// Memory-backed store that records every call and can be told to fail
#[derive(Clone)]
pub struct FakeLockStore {
    memory: MemoryStore<FakeClock>,
    calls: Arc<Mutex<Vec<LockCall>>>,
    failure: Arc<Mutex<Option<StoreError>>>,
}

impl FakeLockStore {
    pub fn new(clock: FakeClock) -> Self {
        Self {
            memory: MemoryStore::with_clock(clock),
            calls: Arc::new(Mutex::new(Vec::new())),
            failure: Arc::new(Mutex::new(None)),
        }
    }

    /// The underlying state, for inspecting leases directly
    pub fn memory(&self) -> &MemoryStore<FakeClock> {
        &self.memory
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<LockCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    /// Make every subsequent call fail with `error`
    pub fn fail_with(&self, error: StoreError) {
        *self.failure.lock().unwrap_or_else(|e| e.into_inner()) = Some(error);
    }

    /// Stop failing
    pub fn recover(&self) {
        *self.failure.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    fn record(&self, call: LockCall) -> Result<(), StoreError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
        match self.failure.lock().unwrap_or_else(|e| e.into_inner()).as_ref() {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl LockStore for FakeLockStore {
    async fn has_active_lock(&self, id: &TaskId) -> Result<bool, StoreError> {
        self.record(LockCall::HasActiveLock { id: id.clone() })?;
        self.memory.has_active_lock(id).await
    }

    async fn acquire_lock(&self, id: &TaskId, lease: Duration) -> Result<bool, StoreError> {
        self.record(LockCall::AcquireLock {
            id: id.clone(),
            lease,
        })?;
        self.memory.acquire_lock(id, lease).await
    }

    async fn extend_lock(&self, id: &TaskId, lease: Duration) -> Result<(), StoreError> {
        self.record(LockCall::ExtendLock {
            id: id.clone(),
            lease,
        })?;
        self.memory.extend_lock(id, lease).await
    }

    async fn server_time(&self) -> Result<DateTime<Utc>, StoreError> {
        self.record(LockCall::ServerTime)?;
        self.memory.server_time().await
    }
}

#[async_trait]
impl LevelStore for FakeLockStore {
    async fn assert_level(&self, level: Level, heart_time: Duration) -> Result<(), StoreError> {
        self.record(LockCall::AssertLevel { level, heart_time })?;
        self.memory.assert_level(level, heart_time).await
    }

    async fn max_alive_level(&self) -> Result<Option<Level>, StoreError> {
        self.record(LockCall::MaxAliveLevel)?;
        self.memory.max_alive_level().await
    }
}

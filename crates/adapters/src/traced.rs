// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced store wrappers for consistent observability

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use solo_core::{Level, LevelStore, LockStore, StoreError, TaskId};
use std::time::Duration;
use tracing::Instrument;

/// Wrapper that adds tracing to any LockStore and LevelStore
#[derive(Debug, Clone)]
pub struct TracedStore<S> {
    inner: S,
}

impl<S> TracedStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

fn reject_zero_lease(lease: Duration) -> Result<(), StoreError> {
    if lease.is_zero() {
        tracing::error!("lease must be positive");
        return Err(StoreError::Backend("lease must be positive".to_string()));
    }
    Ok(())
}

#[async_trait]
impl<S: LockStore> LockStore for TracedStore<S> {
    async fn has_active_lock(&self, id: &TaskId) -> Result<bool, StoreError> {
        let result = self.inner.has_active_lock(id).await;
        tracing::trace!(task = %id, active = ?result.as_ref().ok(), "checked lease");
        result
    }

    async fn acquire_lock(&self, id: &TaskId, lease: Duration) -> Result<bool, StoreError> {
        let span = tracing::info_span!("store.acquire", task = %id);
        async {
            let lease_ms = lease.as_millis() as u64;
            tracing::debug!(lease_ms, "acquiring");

            // Precondition: a zero lease would never exclude anyone
            reject_zero_lease(lease)?;

            let start = std::time::Instant::now();
            let result = self.inner.acquire_lock(id, lease).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match &result {
                Ok(true) => tracing::info!(lease_ms, elapsed_ms, "lease acquired"),
                Ok(false) => tracing::debug!(elapsed_ms, "lease held elsewhere"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "acquire failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn extend_lock(&self, id: &TaskId, lease: Duration) -> Result<(), StoreError> {
        let span = tracing::info_span!("store.extend", task = %id);
        async {
            reject_zero_lease(lease)?;

            let result = self.inner.extend_lock(id, lease).await;
            match &result {
                Ok(()) => tracing::debug!(lease_ms = lease.as_millis() as u64, "extended"),
                // The original lease still expires on its own
                Err(e) => tracing::warn!(error = %e, "extend failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn server_time(&self) -> Result<DateTime<Utc>, StoreError> {
        let result = self.inner.server_time().await;
        if let Err(e) = &result {
            tracing::error!(error = %e, "server time unavailable");
        }
        result
    }
}

#[async_trait]
impl<S: LevelStore> LevelStore for TracedStore<S> {
    async fn assert_level(&self, level: Level, heart_time: Duration) -> Result<(), StoreError> {
        let span = tracing::debug_span!("store.assert_level", level);
        async {
            let result = self.inner.assert_level(level, heart_time).await;
            match &result {
                Ok(()) => tracing::debug!(
                    heart_time_ms = heart_time.as_millis() as u64,
                    "level asserted"
                ),
                Err(e) => tracing::warn!(error = %e, "level assertion failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn max_alive_level(&self) -> Result<Option<Level>, StoreError> {
        let result = self.inner.max_alive_level().await;
        tracing::trace!(max = ?result.as_ref().ok(), "checked levels");
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;

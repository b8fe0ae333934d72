// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lease store contract
//!
//! The store is the only state shared between nodes. `acquire_lock` must be an
//! atomic check-and-set: when many nodes race for the same task id, exactly
//! one of them observes `true` until that lease expires.

use crate::id::TaskId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors from a coordination store
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store backend error: {0}")]
    Backend(String),
    #[error("corrupt store state: {0}")]
    Corrupt(String),
}

/// Lease operations a coordination store must provide
#[async_trait]
pub trait LockStore: Send + Sync {
    /// True if a non-expired lease exists for `id`
    async fn has_active_lock(&self, id: &TaskId) -> Result<bool, StoreError>;

    /// Create a lease expiring `lease` from now iff no active lease exists.
    ///
    /// Returns whether the caller obtained the lease.
    async fn acquire_lock(&self, id: &TaskId, lease: Duration) -> Result<bool, StoreError>;

    /// Reset the expiry of the caller's lease to `lease` from now
    async fn extend_lock(&self, id: &TaskId, lease: Duration) -> Result<(), StoreError>;

    /// The store's own clock
    async fn server_time(&self) -> Result<DateTime<Utc>, StoreError>;
}

#[async_trait]
impl<S: LockStore + ?Sized> LockStore for Arc<S> {
    async fn has_active_lock(&self, id: &TaskId) -> Result<bool, StoreError> {
        (**self).has_active_lock(id).await
    }

    async fn acquire_lock(&self, id: &TaskId, lease: Duration) -> Result<bool, StoreError> {
        (**self).acquire_lock(id, lease).await
    }

    async fn extend_lock(&self, id: &TaskId, lease: Duration) -> Result<(), StoreError> {
        (**self).extend_lock(id, lease).await
    }

    async fn server_time(&self) -> Result<DateTime<Utc>, StoreError> {
        (**self).server_time().await
    }
}

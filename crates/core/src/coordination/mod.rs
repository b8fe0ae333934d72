// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordination primitives shared between nodes
//!
//! This module provides:
//! - **LockStore** - Lease contract with atomic acquire
//! - **LevelStore / LevelArbiter** - Priority tiers with heartbeat expiry
//! - **MemoryStore** - In-process implementation of both stores

#[cfg(any(test, feature = "test-support"))]
mod fake;
pub mod level;
pub mod memory;
pub mod store;

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeLockStore, LockCall};
pub use level::{outranks, Level, LevelArbiter, LevelStore, SingleTier, Tiered, DEFAULT_LEVEL};
pub use memory::MemoryStore;
pub use store::{LockStore, StoreError};

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! solo-core: exactly-once periodic tasks across a cluster
//!
//! This crate provides:
//! - Task identity, schedules and placeholder resolution
//! - The lease and level store contracts, with an in-memory implementation
//! - The per-trigger coordinator, task registry and local timers
//! - TOML node configuration

pub mod clock;
pub mod config;
pub mod coordination;
pub mod coordinator;
pub mod dispatcher;
pub mod id;
pub mod registry;
pub mod schedule;
pub mod task;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{ConfigError, NodeConfig, SoloConfig, TaskConfig};
pub use coordination::{
    Level, LevelArbiter, LevelStore, LockStore, MemoryStore, SingleTier, StoreError, Tiered,
};
pub use coordinator::{
    CoordinatedTask, TaskCoordinator, TriggerError, TriggerState, DEFAULT_SKEW_MARGIN,
};
pub use dispatcher::Dispatcher;
pub use id::{NodeId, TaskId};
pub use registry::{Registry, RegistryError};
pub use schedule::{
    IntervalCalculator, ScheduleError, ScheduleKind, ScheduleSpec, SystemIntervals, Vars,
};
pub use task::{ScheduledTask, TaskDefinition, TaskError};

#[cfg(any(test, feature = "test-support"))]
pub use coordination::{FakeLockStore, LockCall};

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Schedule specifications and next-fire computation
//!
//! This module provides:
//! - **ScheduleSpec** - A task's schedule as written (fixed rate, fixed delay or cron)
//! - **Vars** - `${name}` placeholder resolution applied before parsing
//! - **IntervalCalculator** - Maps a spec to the time until its next fire

mod interval;
mod resolve;

pub use interval::SystemIntervals;
pub use resolve::Vars;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors resolving or parsing a schedule
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("unresolved placeholder: ${{{0}}}")]
    UnresolvedPlaceholder(String),
    #[error("invalid interval {literal:?}: {reason}")]
    InvalidInterval { literal: String, reason: String },
    #[error("invalid cron expression {expr:?}: {reason}")]
    InvalidCron { expr: String, reason: String },
    #[error("cron expression {0:?} has no upcoming fire time")]
    NoUpcomingFire(String),
}

/// How the next fire time relates to the previous run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleKind {
    /// Fires on a fixed clock grid regardless of how long runs take
    Rate,
    /// Next fire is computed only after the previous run completes
    Delay,
}

/// A task's schedule exactly as configured (placeholders unresolved)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleSpec {
    FixedRate(String),
    FixedDelay(String),
    Cron(String),
}

impl ScheduleSpec {
    pub fn fixed_rate(literal: impl Into<String>) -> Self {
        Self::FixedRate(literal.into())
    }

    pub fn fixed_delay(literal: impl Into<String>) -> Self {
        Self::FixedDelay(literal.into())
    }

    pub fn cron(expr: impl Into<String>) -> Self {
        Self::Cron(expr.into())
    }

    pub fn kind(&self) -> ScheduleKind {
        match self {
            ScheduleSpec::FixedRate(_) | ScheduleSpec::Cron(_) => ScheduleKind::Rate,
            ScheduleSpec::FixedDelay(_) => ScheduleKind::Delay,
        }
    }

    /// Short name of the spec variant
    pub fn label(&self) -> &'static str {
        match self {
            ScheduleSpec::FixedRate(_) => "fixed_rate",
            ScheduleSpec::FixedDelay(_) => "fixed_delay",
            ScheduleSpec::Cron(_) => "cron",
        }
    }

    pub fn literal(&self) -> &str {
        match self {
            ScheduleSpec::FixedRate(s) | ScheduleSpec::FixedDelay(s) | ScheduleSpec::Cron(s) => s,
        }
    }

    /// Identity component used when deriving a [`TaskId`](crate::id::TaskId)
    pub fn flag(&self) -> String {
        format!("{}:{}", self.label(), self.literal())
    }
}

impl fmt::Display for ScheduleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.label(), self.literal())
    }
}

/// Computes how long until a schedule fires next
pub trait IntervalCalculator: Send + Sync {
    /// Time from `now` until the next fire of `spec`.
    ///
    /// Fixed-rate and fixed-delay specs ignore `now` and return their period.
    fn next_interval(&self, spec: &ScheduleSpec, now: DateTime<Utc>)
        -> Result<Duration, ScheduleError>;
}

#[cfg(test)]
#[path = "schedule_tests.rs"]
mod tests;

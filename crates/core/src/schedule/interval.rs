// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Default interval calculator

use super::{IntervalCalculator, ScheduleError, ScheduleSpec, Vars};
use crate::clock::duration_until;
use chrono::{DateTime, Utc};
use std::str::FromStr;
use std::time::Duration;

/// Resolves placeholders, then parses intervals and cron expressions
///
/// Interval literals are either a bare integer (milliseconds) or a humantime
/// duration such as `10s` or `1m 30s`. Cron expressions use six or seven
/// fields: `sec min hour day-of-month month day-of-week [year]`.
#[derive(Debug, Clone, Default)]
pub struct SystemIntervals {
    vars: Vars,
}

impl SystemIntervals {
    pub fn new(vars: Vars) -> Self {
        Self { vars }
    }

    /// Parse a fixed interval literal after placeholder resolution
    pub fn parse_interval(&self, literal: &str) -> Result<Duration, ScheduleError> {
        let resolved = self.vars.resolve(literal)?;
        parse_interval(&resolved)
    }

    /// Parse a cron expression after placeholder resolution
    pub fn parse_cron(&self, expr: &str) -> Result<cron::Schedule, ScheduleError> {
        let resolved = self.vars.resolve(expr)?;
        cron::Schedule::from_str(resolved.trim()).map_err(|e| ScheduleError::InvalidCron {
            expr: resolved.clone(),
            reason: e.to_string(),
        })
    }
}

impl IntervalCalculator for SystemIntervals {
    fn next_interval(
        &self,
        spec: &ScheduleSpec,
        now: DateTime<Utc>,
    ) -> Result<Duration, ScheduleError> {
        match spec {
            ScheduleSpec::FixedRate(literal) | ScheduleSpec::FixedDelay(literal) => {
                self.parse_interval(literal)
            }
            ScheduleSpec::Cron(expr) => {
                let schedule = self.parse_cron(expr)?;
                let next = schedule
                    .after(&now)
                    .next()
                    .ok_or_else(|| ScheduleError::NoUpcomingFire(expr.clone()))?;
                Ok(duration_until(now, next))
            }
        }
    }
}

fn parse_interval(literal: &str) -> Result<Duration, ScheduleError> {
    let trimmed = literal.trim();
    let invalid = |reason: String| ScheduleError::InvalidInterval {
        literal: literal.to_string(),
        reason,
    };

    let duration = if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
        let millis: u64 = trimmed.parse().map_err(|e| invalid(format!("{}", e)))?;
        Duration::from_millis(millis)
    } else {
        humantime::parse_duration(trimmed).map_err(|e| invalid(e.to_string()))?
    };

    if duration.is_zero() {
        return Err(invalid("interval must be positive".to_string()));
    }
    Ok(duration)
}

#[cfg(test)]
#[path = "interval_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-trigger decision engine
//!
//! Every node fires its own timer for every task. On each trigger the
//! coordinator decides whether this node runs the body, using priority
//! arbitration first and the lease store second:
//!
//! 1. Tasks marked `ignore` run immediately, without touching any store.
//! 2. Level 0, or a level weaker than the strongest alive level, skips.
//!    A level stronger than every alive level (or no alive level at all)
//!    asserts itself before continuing.
//! 3. An active lease means another trigger already covers this fire.
//! 4. The lease requested is the time until the next fire minus a skew
//!    margin, so it lapses before this node's own next trigger.
//! 5. Winning `acquire_lock` runs the body.
//! 6. Delay-based schedules re-extend the lease once the body finishes,
//!    since their next fire is only known after the run.

use crate::coordination::{LevelArbiter, LockStore, StoreError};
use crate::id::TaskId;
use crate::schedule::{IntervalCalculator, ScheduleError, ScheduleKind, ScheduleSpec};
use crate::task::{ScheduledTask, TaskError};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::Instrument;

/// Subtracted from every lease to absorb local timer jitter
pub const DEFAULT_SKEW_MARGIN: Duration = Duration::from_millis(500);

/// What happened on one trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerState {
    /// Ran locally, outside cluster coordination
    Ignored,
    /// A stronger tier is alive, or this node is level 0
    SkippedByPriority,
    /// Another trigger already holds the lease for this fire
    NotEligible,
    /// This node won the lease and ran the body
    Ran,
}

impl fmt::Display for TriggerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerState::Ignored => write!(f, "ignored"),
            TriggerState::SkippedByPriority => write!(f, "skipped_by_priority"),
            TriggerState::NotEligible => write!(f, "not_eligible"),
            TriggerState::Ran => write!(f, "ran"),
        }
    }
}

/// Errors from handling one trigger
#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("unknown task: {0}")]
    UnknownTask(TaskId),
    /// The store failed before the body ran; the body was not run
    #[error("coordination store failed: {0}")]
    Coordination(#[from] StoreError),
    #[error("schedule error: {0}")]
    Schedule(#[from] ScheduleError),
    /// The body itself failed
    #[error("task {id} failed: {source}")]
    Task {
        id: TaskId,
        #[source]
        source: TaskError,
    },
}

impl TriggerError {
    /// The body's own error, if this is a body failure
    pub fn into_task_error(self) -> Option<TaskError> {
        match self {
            TriggerError::Task { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// A registered task as the coordinator sees it
#[derive(Clone)]
pub struct CoordinatedTask {
    pub id: TaskId,
    pub ignore: bool,
    pub schedule: ScheduleSpec,
    pub body: Arc<dyn ScheduledTask>,
}

impl fmt::Debug for CoordinatedTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoordinatedTask")
            .field("id", &self.id)
            .field("ignore", &self.ignore)
            .field("schedule", &self.schedule)
            .finish_non_exhaustive()
    }
}

/// Decides, per trigger, whether this node runs a task
pub struct TaskCoordinator<L, A, I> {
    store: L,
    arbiter: A,
    intervals: I,
    skew_margin: Duration,
}

impl<L, A, I> TaskCoordinator<L, A, I>
where
    L: LockStore,
    A: LevelArbiter,
    I: IntervalCalculator,
{
    pub fn new(store: L, arbiter: A, intervals: I) -> Self {
        Self {
            store,
            arbiter,
            intervals,
            skew_margin: DEFAULT_SKEW_MARGIN,
        }
    }

    pub fn with_skew_margin(mut self, margin: Duration) -> Self {
        self.skew_margin = margin;
        self
    }

    pub fn store(&self) -> &L {
        &self.store
    }

    pub fn arbiter(&self) -> &A {
        &self.arbiter
    }

    pub fn intervals(&self) -> &I {
        &self.intervals
    }

    pub fn skew_margin(&self) -> Duration {
        self.skew_margin
    }

    /// Lease to request for a fire `interval` away, `None` when the margin
    /// leaves nothing to hold
    pub fn lease_for(&self, interval: Duration) -> Option<Duration> {
        let lease = interval.saturating_sub(self.skew_margin);
        (!lease.is_zero()).then_some(lease)
    }

    /// Handle one local trigger of `task`
    pub async fn on_trigger(&self, task: &CoordinatedTask) -> Result<TriggerState, TriggerError> {
        let span = tracing::debug_span!("trigger", task = %task.id);
        self.decide_and_run(task).instrument(span).await
    }

    async fn decide_and_run(&self, task: &CoordinatedTask) -> Result<TriggerState, TriggerError> {
        if task.ignore {
            self.run_body(task).await?;
            return Ok(TriggerState::Ignored);
        }

        if !self.admitted_by_priority().await? {
            return Ok(TriggerState::SkippedByPriority);
        }

        if self.store.has_active_lock(&task.id).await? {
            tracing::debug!("lease already held");
            return Ok(TriggerState::NotEligible);
        }

        let now = self.store.server_time().await?;
        let interval = self.intervals.next_interval(&task.schedule, now)?;
        let Some(lease) = self.lease_for(interval) else {
            tracing::warn!(
                interval_ms = interval.as_millis() as u64,
                margin_ms = self.skew_margin.as_millis() as u64,
                "next fire is within the skew margin, not running"
            );
            return Ok(TriggerState::NotEligible);
        };

        if !self.store.acquire_lock(&task.id, lease).await? {
            tracing::debug!("lost lease race");
            return Ok(TriggerState::NotEligible);
        }
        tracing::debug!(lease_ms = lease.as_millis() as u64, "lease acquired");

        self.run_body(task).await?;

        if task.schedule.kind() == ScheduleKind::Delay {
            self.extend_after_run(task).await;
        }

        Ok(TriggerState::Ran)
    }

    async fn admitted_by_priority(&self) -> Result<bool, StoreError> {
        let level = self.arbiter.level();
        if level == 0 {
            tracing::debug!("level 0 never runs");
            return Ok(false);
        }

        match self.arbiter.max_alive_level().await? {
            Some(max) if level > max => {
                tracing::debug!(level, max, "stronger tier alive");
                Ok(false)
            }
            Some(max) if level == max => Ok(true),
            max => {
                tracing::info!(level, ?max, "claiming precedence");
                self.arbiter.keep_alive().await?;
                Ok(true)
            }
        }
    }

    async fn run_body(&self, task: &CoordinatedTask) -> Result<(), TriggerError> {
        let start = std::time::Instant::now();
        let result = task.body.run().await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(()) => {
                tracing::info!(elapsed_ms, "task ran");
                Ok(())
            }
            Err(source) => {
                tracing::error!(elapsed_ms, error = %source, "task failed");
                Err(TriggerError::Task {
                    id: task.id.clone(),
                    source,
                })
            }
        }
    }

    /// Re-measure the lease from the end of the run. Failures only log: the
    /// body has already run and the original lease still expires on its own.
    async fn extend_after_run(&self, task: &CoordinatedTask) {
        let lease = match self.post_run_lease(task).await {
            Ok(Some(lease)) => lease,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(error = %e, "could not compute post-run lease");
                return;
            }
        };

        match self.store.extend_lock(&task.id, lease).await {
            Ok(()) => tracing::debug!(lease_ms = lease.as_millis() as u64, "lease extended"),
            Err(e) => tracing::warn!(error = %e, "lease extension failed"),
        }
    }

    /// The full recomputed interval; the next local trigger is that far away
    /// on every node, so no margin is held back here.
    async fn post_run_lease(&self, task: &CoordinatedTask) -> Result<Option<Duration>, TriggerError> {
        let now = self.store.server_time().await?;
        let interval = self.intervals.next_interval(&task.schedule, now)?;
        Ok((!interval.is_zero()).then_some(interval))
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;

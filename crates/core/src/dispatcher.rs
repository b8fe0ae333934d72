// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local timers
//!
//! One tokio task per registered task fires triggers into the registry:
//! - fixed-rate tasks tick on a fixed grid and skip ticks missed while busy
//! - fixed-delay and cron tasks recompute their next fire after each trigger
//!
//! Tiered nodes also run a heartbeat that re-asserts their level every half
//! `heart_time`, so standbys see the leader as alive between its runs.

use crate::coordination::{LevelArbiter, LockStore};
use crate::coordinator::TriggerError;
use crate::id::TaskId;
use crate::registry::Registry;
use crate::schedule::{IntervalCalculator, ScheduleSpec};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::Instrument;

/// Floor for any computed wait, so a misbehaving calculator cannot spin
const MIN_WAIT: Duration = Duration::from_millis(1);

/// Running timers for an initialized registry
pub struct Dispatcher<L, A, I> {
    registry: Arc<Registry<L, A, I>>,
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl<L, A, I> Dispatcher<L, A, I>
where
    L: LockStore + 'static,
    A: LevelArbiter + 'static,
    I: IntervalCalculator + 'static,
{
    /// Spawn timers for every task in `registry`
    pub fn start(registry: Arc<Registry<L, A, I>>) -> Self {
        let (shutdown, _) = watch::channel(false);
        let mut handles = Vec::new();

        let arbiter = registry.coordinator().arbiter();
        if let (Some(heart_time), level) = (arbiter.heart_time(), arbiter.level()) {
            if level > 0 {
                let span = tracing::info_span!("heartbeat", level);
                handles.push(tokio::spawn(
                    heartbeat(Arc::clone(&registry), heart_time, shutdown.subscribe())
                        .instrument(span),
                ));
            }
        }

        for id in registry.ids() {
            let Some(definition) = registry.get(id) else {
                continue;
            };
            let span = tracing::info_span!("timer", task = %id);
            handles.push(tokio::spawn(
                timer(
                    Arc::clone(&registry),
                    id.clone(),
                    definition.schedule.clone(),
                    shutdown.subscribe(),
                )
                .instrument(span),
            ));
        }

        tracing::info!(tasks = registry.len(), "dispatcher started");
        Self {
            registry,
            shutdown,
            handles,
        }
    }

    pub fn registry(&self) -> &Arc<Registry<L, A, I>> {
        &self.registry
    }

    /// Stop all timers. In-flight task bodies finish first.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "timer task panicked");
            }
        }
        tracing::info!("dispatcher stopped");
    }
}

async fn timer<L, A, I>(
    registry: Arc<Registry<L, A, I>>,
    id: TaskId,
    schedule: ScheduleSpec,
    mut shutdown: watch::Receiver<bool>,
) where
    L: LockStore,
    A: LevelArbiter,
    I: IntervalCalculator,
{
    let Some(first) = next_wait(&registry, &schedule) else {
        return;
    };

    match schedule {
        ScheduleSpec::FixedRate(_) => {
            let mut ticker = tokio::time::interval_at(Instant::now() + first, first);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => fire(&registry, &id).await,
                    _ = shutdown.changed() => break,
                }
            }
        }
        ScheduleSpec::FixedDelay(_) | ScheduleSpec::Cron(_) => {
            let mut wait = first;
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(wait) => fire(&registry, &id).await,
                    _ = shutdown.changed() => break,
                }
                match next_wait(&registry, &schedule) {
                    Some(next) => wait = next,
                    None => break,
                }
            }
        }
    }
}

fn next_wait<L, A, I>(registry: &Registry<L, A, I>, schedule: &ScheduleSpec) -> Option<Duration>
where
    L: LockStore,
    A: LevelArbiter,
    I: IntervalCalculator,
{
    match registry
        .coordinator()
        .intervals()
        .next_interval(schedule, chrono::Utc::now())
    {
        Ok(wait) => Some(wait.max(MIN_WAIT)),
        Err(e) => {
            tracing::error!(error = %e, "cannot compute next fire, timer stopped");
            None
        }
    }
}

async fn fire<L, A, I>(registry: &Registry<L, A, I>, id: &TaskId)
where
    L: LockStore,
    A: LevelArbiter,
    I: IntervalCalculator,
{
    match registry.on_trigger(id).await {
        Ok(state) => tracing::debug!(%state, "trigger handled"),
        // Already logged by the coordinator with timing
        Err(TriggerError::Task { .. }) => {}
        Err(e) => tracing::warn!(error = %e, "trigger failed"),
    }
}

async fn heartbeat<L, A, I>(
    registry: Arc<Registry<L, A, I>>,
    heart_time: Duration,
    mut shutdown: watch::Receiver<bool>,
) where
    L: LockStore,
    A: LevelArbiter,
    I: IntervalCalculator,
{
    let period = (heart_time / 2).max(MIN_WAIT);
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = registry.coordinator().arbiter().keep_alive().await {
                    tracing::warn!(error = %e, "heartbeat failed");
                }
            }
            _ = shutdown.changed() => break,
        }
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;

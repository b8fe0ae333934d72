// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task registration
//!
//! The host populates a [`Registry`] at startup, then calls [`Registry::init`]
//! to start the local timers. All configuration problems surface from
//! [`Registry::register`], never at trigger time.

use crate::coordination::{LevelArbiter, LockStore, MemoryStore, SingleTier};
use crate::coordinator::{CoordinatedTask, TaskCoordinator, TriggerError, TriggerState};
use crate::dispatcher::Dispatcher;
use crate::id::TaskId;
use crate::schedule::{IntervalCalculator, ScheduleError, ScheduleSpec, SystemIntervals};
use crate::task::{ScheduledTask, TaskDefinition};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors registering a task
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("task {id} is already registered by {existing}")]
    DuplicateTask { id: TaskId, existing: String },
    #[error("task definition needs a group and a name (or an explicit id)")]
    MissingName,
    #[error("invalid schedule for {id}: {source}")]
    Schedule {
        id: TaskId,
        #[source]
        source: ScheduleError,
    },
    #[error("interval for {id} ({interval:?}) must be longer than the skew margin ({margin:?})")]
    IntervalWithinMargin {
        id: TaskId,
        interval: Duration,
        margin: Duration,
    },
}

struct Entry {
    definition: TaskDefinition,
    task: CoordinatedTask,
}

/// Registered tasks plus the coordinator that arbitrates their triggers
pub struct Registry<L, A, I> {
    coordinator: TaskCoordinator<L, A, I>,
    tasks: BTreeMap<TaskId, Entry>,
}

impl Registry<MemoryStore, SingleTier, SystemIntervals> {
    /// Registry over the process-wide in-memory store, single tier.
    ///
    /// Coordinates only tasks within this process.
    pub fn local() -> Self {
        Self::new(TaskCoordinator::new(
            MemoryStore::shared(),
            SingleTier::default(),
            SystemIntervals::default(),
        ))
    }
}

impl<L, A, I> Registry<L, A, I>
where
    L: LockStore,
    A: LevelArbiter,
    I: IntervalCalculator,
{
    pub fn new(coordinator: TaskCoordinator<L, A, I>) -> Self {
        Self {
            coordinator,
            tasks: BTreeMap::new(),
        }
    }

    pub fn coordinator(&self) -> &TaskCoordinator<L, A, I> {
        &self.coordinator
    }

    /// Register a task and return its cluster-wide id
    pub fn register(
        &mut self,
        definition: TaskDefinition,
        body: impl ScheduledTask + 'static,
    ) -> Result<TaskId, RegistryError> {
        self.register_arc(definition, Arc::new(body))
    }

    /// Register a task whose body is already shared
    pub fn register_arc(
        &mut self,
        definition: TaskDefinition,
        body: Arc<dyn ScheduledTask>,
    ) -> Result<TaskId, RegistryError> {
        let has_explicit_id = definition
            .id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty());
        if !has_explicit_id
            && (definition.group.trim().is_empty() || definition.name.trim().is_empty())
        {
            return Err(RegistryError::MissingName);
        }

        let id = definition.task_id();
        if let Some(existing) = self.tasks.get(&id) {
            return Err(RegistryError::DuplicateTask {
                id,
                existing: format!("{}.{}", existing.definition.group, existing.definition.name),
            });
        }

        self.validate(&id, &definition)?;

        tracing::info!(
            task = %id,
            schedule = %definition.schedule,
            ignore = definition.ignore,
            "registered task"
        );

        let task = CoordinatedTask {
            id: id.clone(),
            ignore: definition.ignore,
            schedule: definition.schedule.clone(),
            body,
        };
        self.tasks.insert(id.clone(), Entry { definition, task });
        Ok(id)
    }

    fn validate(&self, id: &TaskId, definition: &TaskDefinition) -> Result<(), RegistryError> {
        let interval = self
            .coordinator
            .intervals()
            .next_interval(&definition.schedule, chrono::Utc::now())
            .map_err(|source| RegistryError::Schedule {
                id: id.clone(),
                source,
            })?;

        // Cron intervals depend on the current time; only fixed periods are
        // checked against the margin up front.
        let fixed = !matches!(definition.schedule, ScheduleSpec::Cron(_));
        let margin = self.coordinator.skew_margin();
        if fixed && !definition.ignore && interval <= margin {
            return Err(RegistryError::IntervalWithinMargin {
                id: id.clone(),
                interval,
                margin,
            });
        }
        Ok(())
    }

    /// Handle one local trigger of a registered task
    pub async fn on_trigger(&self, id: &TaskId) -> Result<TriggerState, TriggerError> {
        let entry = self
            .tasks
            .get(id)
            .ok_or_else(|| TriggerError::UnknownTask(id.clone()))?;
        self.coordinator.on_trigger(&entry.task).await
    }

    pub fn get(&self, id: &TaskId) -> Option<&TaskDefinition> {
        self.tasks.get(id).map(|e| &e.definition)
    }

    /// Registered ids in order
    pub fn ids(&self) -> impl Iterator<Item = &TaskId> {
        self.tasks.keys()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl<L, A, I> Registry<L, A, I>
where
    L: LockStore + 'static,
    A: LevelArbiter + 'static,
    I: IntervalCalculator + 'static,
{
    /// Start local timers for every registered task. Requires a tokio runtime.
    pub fn init(self) -> Dispatcher<L, A, I> {
        Dispatcher::start(Arc::new(self))
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;

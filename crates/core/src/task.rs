// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduled task definitions and bodies

use crate::id::TaskId;
use crate::schedule::ScheduleSpec;
use async_trait::async_trait;
use std::future::Future;

/// Error returned by a task body, passed back to the caller untouched
pub type TaskError = Box<dyn std::error::Error + Send + Sync>;

/// The body of a scheduled task
///
/// Any `Fn() -> impl Future<Output = Result<(), TaskError>>` closure is a task.
#[async_trait]
pub trait ScheduledTask: Send + Sync {
    async fn run(&self) -> Result<(), TaskError>;
}

#[async_trait]
impl<F, Fut> ScheduledTask for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), TaskError>> + Send,
{
    async fn run(&self) -> Result<(), TaskError> {
        (self)().await
    }
}

/// Everything needed to register a task, minus its body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDefinition {
    /// Explicit identity; replaces the derived key when set
    pub id: Option<String>,
    /// Declaring group, e.g. the owning module or service
    pub group: String,
    pub name: String,
    /// Run on every node without cluster coordination
    pub ignore: bool,
    pub schedule: ScheduleSpec,
}

impl TaskDefinition {
    pub fn new(group: impl Into<String>, name: impl Into<String>, schedule: ScheduleSpec) -> Self {
        Self {
            id: None,
            group: group.into(),
            name: name.into(),
            ignore: false,
            schedule,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Opt out of cluster coordination
    pub fn ignored(mut self) -> Self {
        self.ignore = true;
        self
    }

    /// The cluster-wide key for this definition
    pub fn task_id(&self) -> TaskId {
        match self.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => TaskId::new(id),
            _ => TaskId::derive(&self.group, &self.name, &self.schedule.flag()),
        }
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;

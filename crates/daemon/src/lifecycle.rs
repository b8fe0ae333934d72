// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Node lifecycle: load config, wire stores, register tasks, run until signalled.

use std::path::Path;
use std::sync::Arc;

use solo_adapters::{FileStore, TracedStore};
use solo_core::{
    ConfigError, IntervalCalculator, LevelArbiter, LevelStore, LockStore, MemoryStore, Registry,
    RegistryError, SingleTier, SoloConfig, StoreError, SystemIntervals, TaskCoordinator, TaskId,
    Tiered,
};
use thiserror::Error;
use tokio::signal::unix::{signal, SignalKind};
use tracing::info;

use crate::shell::ShellTask;

/// Registry with the store and arbiter chosen at startup
pub type NodeRegistry = Registry<Arc<dyn LockStore>, Arc<dyn LevelArbiter>, SystemIntervals>;

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Registration failed: {0}")]
    Registry(#[from] RegistryError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("task #{index} ({label}) has no `run` command")]
    MissingRun { index: usize, label: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Load and validate a config file, then register every task against a
/// scratch in-memory store. Returns the registered ids in order.
pub fn check(path: &Path) -> Result<Vec<(TaskId, String)>, LifecycleError> {
    let config = SoloConfig::load(path)?;
    let scratch = coordinator(&config, MemoryStore::new(), SingleTier::default());
    let mut registry = Registry::new(scratch);
    register_tasks(&mut registry, &config)?;

    Ok(registry
        .ids()
        .filter_map(|id| {
            let definition = registry.get(id)?;
            let mut line = definition.schedule.flag();
            if definition.ignore {
                line.push_str(" (ignore)");
            }
            Some((id.clone(), line))
        })
        .collect())
}

/// Build the registry for `solod run`
pub fn build(config: &SoloConfig) -> Result<NodeRegistry, LifecycleError> {
    type Stores = (Arc<dyn LockStore>, Arc<dyn LevelStore>);
    let (locks, levels): Stores = match &config.node.state_dir {
        Some(dir) => {
            let store = TracedStore::new(FileStore::open(dir)?);
            info!(state_dir = %dir.display(), node = %store.inner().node(), "using file store");
            (Arc::new(store.clone()), Arc::new(store))
        }
        None => {
            let store = TracedStore::new(MemoryStore::shared());
            info!(node = %store.inner().node(), "using in-process store");
            (Arc::new(store.clone()), Arc::new(store))
        }
    };

    let arbiter: Arc<dyn LevelArbiter> = match config.node.tier() {
        Some((level, heart_time)) => {
            info!(level, heart_time_ms = heart_time.as_millis() as u64, "tiered node");
            Arc::new(Tiered::new(levels, level, heart_time))
        }
        None => Arc::new(SingleTier::default()),
    };

    let mut registry = Registry::new(coordinator(config, locks, arbiter));
    register_tasks(&mut registry, config)?;
    Ok(registry)
}

fn coordinator<L, A>(
    config: &SoloConfig,
    store: L,
    arbiter: A,
) -> TaskCoordinator<L, A, SystemIntervals>
where
    L: LockStore,
    A: LevelArbiter,
{
    TaskCoordinator::new(store, arbiter, SystemIntervals::new(config.vars()))
        .with_skew_margin(config.node.skew_margin)
}

fn register_tasks<L, A, I>(
    registry: &mut Registry<L, A, I>,
    config: &SoloConfig,
) -> Result<(), LifecycleError>
where
    L: LockStore,
    A: LevelArbiter,
    I: IntervalCalculator,
{
    for (index, task) in config.tasks.iter().enumerate() {
        let definition = task.definition().map_err(|reason| ConfigError::Task {
            index,
            label: format!("{}.{}", task.group, task.name),
            reason,
        })?;
        let run = task
            .run
            .as_deref()
            .filter(|cmd| !cmd.trim().is_empty())
            .ok_or_else(|| LifecycleError::MissingRun {
                index,
                label: definition.task_id().to_string(),
            })?;
        let shell = ShellTask::new(run);
        let command = shell.command().to_string();
        let id = registry.register(definition, shell)?;
        tracing::debug!(task = %id, %command, "shell task registered");
    }
    Ok(())
}

/// Run `registry` until SIGINT or SIGTERM, then stop timers gracefully
pub async fn run_until_signalled(registry: NodeRegistry) -> Result<(), LifecycleError> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    let dispatcher = registry.init();

    // Signal ready for parent process (e.g., systemd, scripts waiting for startup)
    println!("READY");

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        _ = sigint.recv() => info!("Received SIGINT, shutting down..."),
    }

    dispatcher.shutdown().await;
    info!("Node stopped");
    Ok(())
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Node configuration
//!
//! Mirrors the TOML layout exactly; [`SoloConfig::parse`] validates before
//! returning so callers only ever see a well-formed config.

use crate::coordination::Level;
use crate::coordinator::DEFAULT_SKEW_MARGIN;
use crate::schedule::{ScheduleSpec, Vars};
use crate::task::TaskDefinition;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors loading or validating a config file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[node] {0}")]
    Node(String),

    #[error("task #{index} ({label}): {reason}")]
    Task {
        index: usize,
        label: String,
        reason: String,
    },
}

/// A whole config file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SoloConfig {
    pub node: NodeConfig,
    /// Values for `${name}` placeholders
    pub vars: HashMap<String, toml::Value>,
    #[serde(rename = "task")]
    pub tasks: Vec<TaskConfig>,
}

/// The `[node]` table
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeConfig {
    /// Priority level; omit for single-tier mode
    pub level: Option<Level>,
    /// How long a level assertion stays alive
    #[serde(with = "humantime_serde")]
    pub heart_time: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub skew_margin: Duration,
    /// Where file-backed state lives
    pub state_dir: Option<PathBuf>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            level: None,
            heart_time: None,
            skew_margin: DEFAULT_SKEW_MARGIN,
            state_dir: None,
        }
    }
}

/// One `[[task]]` entry
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TaskConfig {
    pub id: Option<String>,
    pub group: String,
    pub name: String,
    pub ignore: bool,
    pub fixed_rate: Option<String>,
    pub fixed_delay: Option<String>,
    pub cron: Option<String>,
    /// Shell command, used by hosts that run commands as task bodies
    pub run: Option<String>,
}

impl SoloConfig {
    /// Parse and validate TOML content
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: SoloConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.node.validate()?;
        for (index, task) in self.tasks.iter().enumerate() {
            task.validate().map_err(|reason| ConfigError::Task {
                index,
                label: task.label(),
                reason,
            })?;
        }
        Ok(())
    }

    /// Placeholder values: `[vars]` first, then the environment
    pub fn vars(&self) -> Vars {
        let values = self
            .vars
            .iter()
            .map(|(name, value)| (name.clone(), value_to_string(value)))
            .collect();
        Vars::new(values)
    }
}

impl NodeConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.level.is_none() {
            return Ok(());
        }
        match self.heart_time {
            None => Err(ConfigError::Node(
                "heart_time is required when level is set".into(),
            )),
            Some(t) if t.is_zero() => Err(ConfigError::Node("heart_time must be positive".into())),
            Some(_) => Ok(()),
        }
    }

    /// Level and heart time when this node takes part in tiered arbitration
    pub fn tier(&self) -> Option<(Level, Duration)> {
        Some((self.level?, self.heart_time?))
    }
}

impl TaskConfig {
    fn validate(&self) -> Result<(), String> {
        let explicit_id = self.id.as_deref().is_some_and(|id| !id.trim().is_empty());
        if !explicit_id && (self.group.trim().is_empty() || self.name.trim().is_empty()) {
            return Err("group and name are required unless id is set".into());
        }
        self.schedule().map(|_| ())
    }

    /// The single configured schedule
    pub fn schedule(&self) -> Result<ScheduleSpec, String> {
        let set: Vec<ScheduleSpec> = [
            self.fixed_rate.clone().map(ScheduleSpec::FixedRate),
            self.fixed_delay.clone().map(ScheduleSpec::FixedDelay),
            self.cron.clone().map(ScheduleSpec::Cron),
        ]
        .into_iter()
        .flatten()
        .collect();

        match <[ScheduleSpec; 1]>::try_from(set) {
            Ok([spec]) => Ok(spec),
            Err(set) if set.is_empty() => {
                Err("one of fixed_rate, fixed_delay or cron is required".into())
            }
            Err(_) => Err("only one of fixed_rate, fixed_delay or cron may be set".into()),
        }
    }

    pub fn definition(&self) -> Result<TaskDefinition, String> {
        let mut definition = TaskDefinition::new(&self.group, &self.name, self.schedule()?);
        definition.id = self.id.clone();
        definition.ignore = self.ignore;
        Ok(definition)
    }

    fn label(&self) -> String {
        match &self.id {
            Some(id) if !id.trim().is_empty() => id.clone(),
            _ => format!("{}.{}", self.group, self.name),
        }
    }
}

fn value_to_string(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

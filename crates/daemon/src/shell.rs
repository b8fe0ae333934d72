// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shell commands as task bodies

use async_trait::async_trait;
use solo_core::{ScheduledTask, TaskError};
use std::process::ExitStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` exited with {status}")]
    Exit { command: String, status: ExitStatus },
}

/// Runs `sh -c <command>`, inheriting stdout and stderr
#[derive(Debug, Clone)]
pub struct ShellTask {
    command: String,
}

impl ShellTask {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

#[async_trait]
impl ScheduledTask for ShellTask {
    async fn run(&self) -> Result<(), TaskError> {
        tracing::debug!(command = %self.command, "running shell task");

        let status = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|source| ShellError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(Box::new(ShellError::Exit {
                command: self.command.clone(),
                status,
            }))
        }
    }
}

#[cfg(test)]
#[path = "shell_tests.rs"]
mod tests;

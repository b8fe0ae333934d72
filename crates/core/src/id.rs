// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task and node identities
//!
//! A [`TaskId`] is the cluster-wide key a task's lease is stored under. Every
//! node running the same definition must derive the same key, so derivation
//! only looks at the definition itself, never at node-local state.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Stable, cluster-wide key for one logical scheduled task
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive a key from the declaring group, the task name and the schedule.
    ///
    /// `flag` identifies the schedule (kind and literal); see
    /// [`ScheduleSpec::flag`](crate::schedule::ScheduleSpec::flag).
    ///
    /// Normalization folds `.`, `_` and every other non-word character
    /// together, so `billing.Reports`/`daily` and `billing`/`Reports.daily`
    /// read the same. The digest of the raw parts keeps them apart.
    pub fn derive(group: &str, name: &str, flag: &str) -> Self {
        let base = normalize(&format!("{}.{}", group, name));
        Self(format!(
            "{}_{}_{}",
            base,
            normalize(flag),
            digest(&[group, name, flag])
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Replace every non-word character with `_`
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// First 8 bytes of the SHA-256 over length-prefixed `parts`, as hex
fn digest(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part.as_bytes());
    }
    let result = hasher.finalize();
    result[..8].iter().map(|b| format!("{:02x}", b)).collect()
}

/// Identifies one running node, recorded as the holder of leases it takes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random id for this process
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed lease and level store
//!
//! State lives in one JSON file inside a directory. Every operation takes an
//! exclusive `fs2` lock on a sibling lock file, reads the state, applies the
//! change and writes it back through a temp file, so any number of processes
//! pointed at the same directory see atomic acquires.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use solo_core::clock::{add_duration, Clock, SystemClock};
use solo_core::{Level, LevelStore, LockStore, NodeId, StoreError, TaskId};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

const STATE_FILE: &str = "solo-state.json";
const LOCK_FILE: &str = "solo-state.lock";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct LeaseEntry {
    holder: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct State {
    leases: BTreeMap<String, LeaseEntry>,
    /// Expiry of the latest assertion per level
    levels: BTreeMap<Level, DateTime<Utc>>,
}

impl State {
    /// Drop expired records; true if anything was removed
    fn prune(&mut self, now: DateTime<Utc>) -> bool {
        let before = self.leases.len() + self.levels.len();
        self.leases.retain(|_, lease| lease.expires_at > now);
        self.levels.retain(|_, expires_at| *expires_at > now);
        before != self.leases.len() + self.levels.len()
    }
}

#[derive(Debug, Clone)]
struct Paths {
    state: PathBuf,
    tmp: PathBuf,
    lock: PathBuf,
}

/// Lease and level store shared through a directory
#[derive(Debug, Clone)]
pub struct FileStore<C: Clock = SystemClock> {
    paths: Paths,
    node: NodeId,
    clock: C,
}

impl FileStore {
    /// Open (creating if needed) the store in `dir`
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::with_clock(dir, SystemClock)
    }
}

impl<C: Clock + 'static> FileStore<C> {
    pub fn with_clock(dir: impl AsRef<Path>, clock: C) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;
        Ok(Self {
            paths: Paths {
                state: dir.join(STATE_FILE),
                tmp: dir.join(format!("{STATE_FILE}.tmp")),
                lock: dir.join(LOCK_FILE),
            },
            node: NodeId::generate(),
            clock,
        })
    }

    /// Record `node` as the holder of leases this handle acquires
    pub fn with_node(mut self, node: NodeId) -> Self {
        self.node = node;
        self
    }

    pub fn node(&self) -> &NodeId {
        &self.node
    }

    pub fn state_path(&self) -> &Path {
        &self.paths.state
    }

    /// Holder of the active lease for `id`, if any
    pub async fn holder(&self, id: &TaskId) -> Result<Option<NodeId>, StoreError> {
        let key = id.as_str().to_string();
        self.transact(move |state, now| {
            let holder = state
                .leases
                .get(&key)
                .filter(|lease| lease.expires_at > now)
                .map(|lease| NodeId::new(lease.holder.clone()));
            (holder, false)
        })
        .await
    }

    /// Run `f` against the state under the file lock. `f` returns its result
    /// and whether the state must be written back.
    async fn transact<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut State, DateTime<Utc>) -> (T, bool) + Send + 'static,
    {
        let paths = self.paths.clone();
        let clock = self.clock.clone();
        tokio::task::spawn_blocking(move || transact_blocking(&paths, &clock, f))
            .await
            .map_err(|e| StoreError::Backend(format!("state task failed: {e}")))?
    }
}

fn transact_blocking<C, T, F>(paths: &Paths, clock: &C, f: F) -> Result<T, StoreError>
where
    C: Clock,
    F: FnOnce(&mut State, DateTime<Utc>) -> (T, bool),
{
    let lock = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(&paths.lock)
        .map_err(|e| io_error(&paths.lock, e))?;
    lock.lock_exclusive()
        .map_err(|e| StoreError::Unavailable(format!("{}: {e}", paths.lock.display())))?;

    let result = read_state(&paths.state).and_then(|mut state| {
        let now = clock.now();
        let (out, dirty) = f(&mut state, now);
        if dirty {
            write_state(paths, &state)?;
        }
        Ok(out)
    });

    if let Err(e) = FileExt::unlock(&lock) {
        tracing::warn!(path = %paths.lock.display(), error = %e, "failed to release state lock");
    }
    result
}

fn read_state(path: &Path) -> Result<State, StoreError> {
    match fs::read(path) {
        Ok(bytes) if bytes.is_empty() => Ok(State::default()),
        Ok(bytes) => serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::Corrupt(format!("{}: {e}", path.display()))),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(State::default()),
        Err(e) => Err(io_error(path, e)),
    }
}

fn write_state(paths: &Paths, state: &State) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(state)
        .map_err(|e| StoreError::Backend(format!("failed to encode state: {e}")))?;
    fs::write(&paths.tmp, bytes).map_err(|e| io_error(&paths.tmp, e))?;
    fs::rename(&paths.tmp, &paths.state).map_err(|e| io_error(&paths.state, e))
}

fn io_error(path: &Path, e: std::io::Error) -> StoreError {
    StoreError::Backend(format!("{}: {e}", path.display()))
}

#[async_trait]
impl<C: Clock + 'static> LockStore for FileStore<C> {
    async fn has_active_lock(&self, id: &TaskId) -> Result<bool, StoreError> {
        let key = id.as_str().to_string();
        self.transact(move |state, now| {
            let active = state
                .leases
                .get(&key)
                .is_some_and(|lease| lease.expires_at > now);
            (active, false)
        })
        .await
    }

    async fn acquire_lock(&self, id: &TaskId, lease: Duration) -> Result<bool, StoreError> {
        let key = id.as_str().to_string();
        let holder = self.node.to_string();
        self.transact(move |state, now| {
            let pruned = state.prune(now);
            if state.leases.contains_key(&key) {
                return (false, pruned);
            }
            state.leases.insert(
                key,
                LeaseEntry {
                    holder,
                    expires_at: add_duration(now, lease),
                },
            );
            (true, true)
        })
        .await
    }

    async fn extend_lock(&self, id: &TaskId, lease: Duration) -> Result<(), StoreError> {
        let key = id.as_str().to_string();
        let holder = self.node.to_string();
        self.transact(move |state, now| {
            state.leases.insert(
                key,
                LeaseEntry {
                    holder,
                    expires_at: add_duration(now, lease),
                },
            );
            ((), true)
        })
        .await
    }

    async fn server_time(&self) -> Result<DateTime<Utc>, StoreError> {
        Ok(self.clock.now())
    }
}

#[async_trait]
impl<C: Clock + 'static> LevelStore for FileStore<C> {
    async fn assert_level(&self, level: Level, heart_time: Duration) -> Result<(), StoreError> {
        if level == 0 {
            return Ok(());
        }
        self.transact(move |state, now| {
            state.prune(now);
            let expires_at = add_duration(now, heart_time);
            let entry = state.levels.entry(level).or_insert(expires_at);
            if *entry < expires_at {
                *entry = expires_at;
            }
            ((), true)
        })
        .await
    }

    async fn max_alive_level(&self) -> Result<Option<Level>, StoreError> {
        self.transact(|state, now| {
            let max = state
                .levels
                .iter()
                .find(|(_, expires_at)| **expires_at > now)
                .map(|(level, _)| *level);
            (max, false)
        })
        .await
    }
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;

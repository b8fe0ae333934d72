//! Shared helpers for black-box specs.
//!
//! Every spec gets its own temporary project directory; `solod` runs with
//! that directory as its working directory and `RUST_LOG` pinned so output
//! does not depend on the caller's environment.

#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use std::process::{Child, Stdio};
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Upper bound for waiting on asynchronous effects (files appearing, exits)
pub const SPEC_WAIT_MAX_MS: u64 = 5_000;

/// Poll interval for [`wait_for`]
const SPEC_POLL_MS: u64 = 25;

/// A temporary directory holding configs, state and task output
pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn empty() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Directory for the file store, shared by every node of this project
    pub fn state_path(&self) -> PathBuf {
        self.dir.path().join("state")
    }

    /// Write `content` to `rel`, creating parent directories
    pub fn file(&self, rel: &str, content: &str) {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    pub fn read(&self, rel: &str) -> Option<String> {
        std::fs::read_to_string(self.dir.path().join(rel)).ok()
    }

    /// A `solod` invocation rooted in this project
    pub fn solod(&self) -> Spec {
        let mut cmd = Command::new(solod_bin());
        cmd.current_dir(self.path()).env("RUST_LOG", "info");
        Spec { cmd }
    }

    /// Start `solod run <config>` in the background
    pub fn spawn_node(&self, config: &str) -> Node {
        self.spawn(&["run", config])
    }

    /// Start `solod` with arbitrary arguments in the background
    pub fn spawn(&self, args: &[&str]) -> Node {
        let child = std::process::Command::new(solod_bin())
            .current_dir(self.path())
            .env("RUST_LOG", "info")
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .unwrap();
        Node { child }
    }
}

fn solod_bin() -> PathBuf {
    assert_cmd::cargo::cargo_bin("solod")
}

/// Builder around one `solod` invocation
pub struct Spec {
    cmd: Command,
}

impl Spec {
    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    pub fn env(mut self, key: &str, value: impl AsRef<std::ffi::OsStr>) -> Self {
        self.cmd.env(key, value);
        self
    }

    pub fn passes(mut self) -> Outcome {
        let output = self.cmd.output().unwrap();
        let outcome = Outcome::from(output);
        assert!(outcome.success, "expected success\n{}", outcome);
        outcome
    }

    pub fn fails(mut self) -> Outcome {
        let output = self.cmd.output().unwrap();
        let outcome = Outcome::from(output);
        assert!(!outcome.success, "expected failure\n{}", outcome);
        outcome
    }
}

/// Captured result of a finished invocation
pub struct Outcome {
    success: bool,
    stdout: String,
    stderr: String,
}

impl From<std::process::Output> for Outcome {
    fn from(output: std::process::Output) -> Self {
        Self {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "--- stdout ---\n{}\n--- stderr ---\n{}", self.stdout, self.stderr)
    }
}

impl Outcome {
    pub fn stdout_has(self, needle: &str) -> Self {
        assert!(self.stdout.contains(needle), "stdout lacks {needle:?}\n{self}");
        self
    }

    pub fn stdout_lacks(self, needle: &str) -> Self {
        assert!(!self.stdout.contains(needle), "stdout has {needle:?}\n{self}");
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        assert!(self.stderr.contains(needle), "stderr lacks {needle:?}\n{self}");
        self
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }
}

/// A background `solod run` process, killed on drop
pub struct Node {
    child: Child,
}

impl Node {
    pub fn pid(&self) -> i32 {
        self.child.id() as i32
    }

    /// Send `signal` and wait for exit; true if it exited successfully in time
    pub fn stop_with(mut self, signal: nix::sys::signal::Signal) -> bool {
        let pid = nix::unistd::Pid::from_raw(self.pid());
        nix::sys::signal::kill(pid, signal).unwrap();

        let deadline = Instant::now() + Duration::from_millis(SPEC_WAIT_MAX_MS);
        while Instant::now() < deadline {
            if let Some(status) = self.child.try_wait().unwrap() {
                return status.success();
            }
            std::thread::sleep(Duration::from_millis(SPEC_POLL_MS));
        }
        false
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Poll `check` until it holds or `max_ms` elapses
pub fn wait_for(max_ms: u64, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_millis(max_ms);
    loop {
        if check() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(SPEC_POLL_MS));
    }
}

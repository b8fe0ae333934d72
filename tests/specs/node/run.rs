//! `solod run` specs
//!
//! Nodes run shell commands on their schedules and stop cleanly on signals.
//! Task commands append to files in the project directory so specs can watch
//! what ran without parsing logs.

use crate::prelude::*;
use nix::sys::signal::Signal;

fn lines(temp: &Project, rel: &str) -> usize {
    temp.read(rel).map(|s| s.lines().count()).unwrap_or(0)
}

#[test]
fn run_executes_task_and_stops_on_sigterm() {
    let temp = Project::empty();
    temp.file(
        "solo.toml",
        "[[task]]\ngroup = \"jobs\"\nname = \"tick\"\nfixed_rate = \"1s\"\nrun = \"echo tick >> ticks\"\n",
    );

    let node = temp.spawn_node("solo.toml");
    assert!(
        wait_for(SPEC_WAIT_MAX_MS, || lines(&temp, "ticks") >= 2),
        "task should run every second"
    );
    assert!(node.stop_with(Signal::SIGTERM), "node should exit cleanly");
}

#[test]
fn run_stops_on_sigint() {
    let temp = Project::empty();
    temp.file(
        "solo.toml",
        "[[task]]\ngroup = \"jobs\"\nname = \"tick\"\nfixed_delay = \"1s\"\nrun = \"echo tick >> ticks\"\n",
    );

    let node = temp.spawn_node("solo.toml");
    assert!(wait_for(SPEC_WAIT_MAX_MS, || lines(&temp, "ticks") >= 1));
    assert!(node.stop_with(Signal::SIGINT), "node should exit cleanly");
}

#[test]
fn failing_task_keeps_node_running() {
    let temp = Project::empty();
    temp.file(
        "solo.toml",
        "[[task]]\ngroup = \"jobs\"\nname = \"flaky\"\nfixed_rate = \"1s\"\nignore = true\nrun = \"echo try >> tries; exit 1\"\n",
    );

    let node = temp.spawn_node("solo.toml");
    assert!(
        wait_for(SPEC_WAIT_MAX_MS, || lines(&temp, "tries") >= 2),
        "failed runs should not stop the timer"
    );
    assert!(node.stop_with(Signal::SIGTERM));
}

#[test]
fn run_writes_log_file() {
    let temp = Project::empty();
    temp.file(
        "solo.toml",
        "[[task]]\ngroup = \"jobs\"\nname = \"tick\"\nfixed_rate = \"1s\"\nrun = \"true\"\n",
    );

    let _node = temp.spawn(&["--log-file", "logs/solod.log", "run", "solo.toml"]);

    assert!(
        wait_for(SPEC_WAIT_MAX_MS, || temp
            .read("logs/solod.log")
            .is_some_and(|log| log.contains("registered task"))),
        "log file should record registration"
    );
}

#[test]
fn run_fails_fast_on_invalid_config() {
    let temp = Project::empty();
    temp.file(
        "solo.toml",
        "[[task]]\ngroup = \"jobs\"\nname = \"sweep\"\nfixed_rate = \"${nope}\"\nrun = \"true\"\n",
    );

    temp.solod()
        .args(&["run", "solo.toml"])
        .fails()
        .stderr_has("unresolved placeholder");
}

#[test]
fn standby_level_defers_to_running_primary() {
    let temp = Project::empty();
    let state = temp.state_path();
    let node_config = |level: u32, out: &str| {
        format!(
            "[node]\nlevel = {level}\nheart_time = \"4s\"\nstate_dir = \"{}\"\n\n\
             [[task]]\ngroup = \"jobs\"\nname = \"sweep\"\nfixed_rate = \"1s\"\nrun = \"echo run >> {out}\"\n",
            state.display()
        )
    };
    temp.file("primary.toml", &node_config(1, "primary_runs"));
    temp.file("standby.toml", &node_config(2, "standby_runs"));

    let primary = temp.spawn_node("primary.toml");
    assert!(wait_for(SPEC_WAIT_MAX_MS, || lines(&temp, "primary_runs") >= 1));

    let standby = temp.spawn_node("standby.toml");
    assert!(wait_for(SPEC_WAIT_MAX_MS, || lines(&temp, "primary_runs") >= 4));
    assert_eq!(lines(&temp, "standby_runs"), 0, "standby must not run while primary is alive");

    assert!(primary.stop_with(Signal::SIGTERM));
    assert!(
        wait_for(SPEC_WAIT_MAX_MS * 2, || lines(&temp, "standby_runs") >= 1),
        "standby should take over once the primary's level expires"
    );
    assert!(standby.stop_with(Signal::SIGTERM));
}

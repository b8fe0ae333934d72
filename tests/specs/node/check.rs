//! `solod check` specs
//!
//! Check validates a config the same way `run` does, without touching any
//! shared state, and prints one `<task id>\t<schedule>` line per task.

use crate::prelude::*;

#[test]
fn check_prints_derived_ids() {
    let temp = Project::empty();
    temp.file(
        "solo.toml",
        r#"
[[task]]
group = "billing.Reports"
name = "daily"
cron = "0 0 3 * * *"
run = "true"

[[task]]
group = "jobs"
name = "sweep"
fixed_delay = "30s"
run = "true"
"#,
    );

    temp.solod()
        .args(&["check", "solo.toml"])
        .passes()
        .stdout_has("billing_Reports_daily_cron_0_0_3_______5c30cd63e29d0569\tcron:0 0 3 * * *")
        .stdout_has("jobs_sweep_fixed_delay_30s_2e1ebba34d1656a2\tfixed_delay:30s");
}

#[test]
fn check_prefers_explicit_id() {
    let temp = Project::empty();
    temp.file(
        "solo.toml",
        "[[task]]\nid = \"nightly-report\"\nfixed_rate = \"1h\"\nignore = true\nrun = \"true\"\n",
    );

    temp.solod()
        .args(&["check", "solo.toml"])
        .passes()
        .stdout_has("nightly-report\tfixed_rate:1h (ignore)");
}

#[test]
fn check_resolves_placeholders_from_environment() {
    let temp = Project::empty();
    temp.file(
        "solo.toml",
        "[[task]]\ngroup = \"jobs\"\nname = \"poll\"\nfixed_rate = \"${SOLO_SPEC_POLL}\"\nrun = \"true\"\n",
    );

    temp.solod()
        .env("SOLO_SPEC_POLL", "15s")
        .args(&["check", "solo.toml"])
        .passes()
        .stdout_has("jobs_poll_fixed_rate___SOLO_SPEC_POLL__0e00c43f2fb01bde");

    temp.solod()
        .args(&["check", "solo.toml"])
        .fails()
        .stderr_has("unresolved placeholder: ${SOLO_SPEC_POLL}");
}

#[test]
fn check_uses_placeholder_default() {
    let temp = Project::empty();
    temp.file(
        "solo.toml",
        "[[task]]\ngroup = \"jobs\"\nname = \"poll\"\nfixed_rate = \"${solo_spec_unset:20s}\"\nrun = \"true\"\n",
    );

    temp.solod().args(&["check", "solo.toml"]).passes();
}

#[test]
fn check_rejects_two_schedules() {
    let temp = Project::empty();
    temp.file(
        "solo.toml",
        "[[task]]\ngroup = \"jobs\"\nname = \"sweep\"\nfixed_rate = \"10s\"\ncron = \"0 * * * * *\"\nrun = \"true\"\n",
    );

    temp.solod()
        .args(&["check", "solo.toml"])
        .fails()
        .stderr_has("only one of fixed_rate, fixed_delay or cron");
}

#[test]
fn check_rejects_malformed_cron() {
    let temp = Project::empty();
    temp.file(
        "solo.toml",
        "[[task]]\ngroup = \"jobs\"\nname = \"sweep\"\ncron = \"every day\"\nrun = \"true\"\n",
    );

    temp.solod()
        .args(&["check", "solo.toml"])
        .fails()
        .stderr_has("invalid cron expression");
}

#[test]
fn check_rejects_interval_within_skew_margin() {
    let temp = Project::empty();
    temp.file(
        "solo.toml",
        "[[task]]\ngroup = \"jobs\"\nname = \"sweep\"\nfixed_rate = \"400ms\"\nrun = \"true\"\n",
    );

    temp.solod()
        .args(&["check", "solo.toml"])
        .fails()
        .stderr_has("must be longer than the skew margin");
}

#[test]
fn check_rejects_duplicate_ids() {
    let temp = Project::empty();
    temp.file(
        "solo.toml",
        "[[task]]\nid = \"x\"\nfixed_rate = \"10s\"\nrun = \"true\"\n\n[[task]]\nid = \"x\"\nfixed_delay = \"10s\"\nrun = \"true\"\n",
    );

    temp.solod()
        .args(&["check", "solo.toml"])
        .fails()
        .stderr_has("already registered");
}

#[test]
fn check_rejects_level_without_heart_time() {
    let temp = Project::empty();
    temp.file("solo.toml", "[node]\nlevel = 1\n");

    temp.solod()
        .args(&["check", "solo.toml"])
        .fails()
        .stderr_has("heart_time is required");
}

#[test]
fn check_rejects_missing_run() {
    let temp = Project::empty();
    temp.file(
        "solo.toml",
        "[[task]]\ngroup = \"jobs\"\nname = \"sweep\"\nfixed_rate = \"10s\"\n",
    );

    temp.solod()
        .args(&["check", "solo.toml"])
        .fails()
        .stderr_has("has no `run` command");
}

#[test]
fn check_reports_missing_file() {
    let temp = Project::empty();

    temp.solod()
        .args(&["check", "absent.toml"])
        .fails()
        .stderr_has("failed to read absent.toml");
}

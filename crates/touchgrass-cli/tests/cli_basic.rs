//! Basic CLI E2E tests.
//!
//! Tests run the built binary against a throwaway data directory and check
//! its JSON output.

use serde_json::Value;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

/// Run a CLI command in `data_dir` and return (exit code, stdout, stderr).
fn run_cli(data_dir: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_touchgrass-cli"))
        .args(args)
        .env("TOUCHGRASS_DATA_DIR", data_dir)
        // Day windows are built in local time; pin it so sample dates line up
        .env("TZ", "UTC")
        .env_remove("TOUCHGRASS_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

fn run_json(data_dir: &Path, args: &[&str]) -> Value {
    let (code, stdout, stderr) = run_cli(data_dir, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    serde_json::from_str(&stdout).expect("Failed to parse JSON output")
}

fn write_samples(dir: &TempDir, name: &str, samples: &str) -> String {
    let path = dir.path().join(name);
    std::fs::write(&path, samples).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn test_quota_lifecycle() {
    let dir = TempDir::new().unwrap();

    let list = run_json(dir.path(), &["quota", "target", "com.x"]);
    assert_eq!(list[0]["package_id"], "com.x");
    assert_eq!(list[0]["quota_minutes"], 60);

    let list = run_json(dir.path(), &["quota", "set", "com.y", "15"]);
    assert_eq!(list.as_array().unwrap().len(), 2);

    let list = run_json(dir.path(), &["quota", "untarget", "com.x"]);
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["package_id"], "com.y");
}

#[test]
fn test_quota_zero_is_rejected() {
    let dir = TempDir::new().unwrap();
    let (code, _, stderr) = run_cli(dir.path(), &["quota", "set", "com.x", "0"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_evaluate_violation() {
    let dir = TempDir::new().unwrap();
    run_json(dir.path(), &["quota", "set", "com.x", "60"]);
    let samples = write_samples(
        &dir,
        "today.json",
        r#"[{"package_id":"com.x","last_foreground":"2026-03-10T12:00:00Z","foreground_duration_ms":3660000}]"#,
    );

    let result = run_json(dir.path(), &["evaluate", "--samples", &samples]);
    assert_eq!(result["top_package_id"], "com.x");
    assert_eq!(result["used_minutes"], 61);
    assert_eq!(result["violated"], true);
    assert_eq!(result["quota_minutes"], 60);
}

#[test]
fn test_evaluate_without_quotas() {
    let dir = TempDir::new().unwrap();
    let samples = write_samples(
        &dir,
        "today.json",
        r#"[{"package_id":"com.x","last_foreground":"2026-03-10T12:00:00Z","foreground_duration_ms":3660000}]"#,
    );
    let result = run_json(dir.path(), &["evaluate", "--samples", &samples]);
    assert_eq!(result["violated"], false);
}

#[test]
fn test_stats_weekly_and_breakdown() {
    let dir = TempDir::new().unwrap();
    run_json(dir.path(), &["quota", "target", "com.x"]);

    let samples: Vec<String> = (4..=10)
        .map(|day| {
            format!(
                r#"{{"package_id":"com.x","last_foreground":"2026-03-{day:02}T12:00:00Z","foreground_duration_ms":1800000}}"#
            )
        })
        .collect();
    let samples = write_samples(&dir, "week.json", &format!("[{}]", samples.join(",")));

    let weekly = run_json(dir.path(), &["stats", "weekly", "--samples", &samples, "--date", "2026-03-10"]);
    let totals: Vec<f64> = weekly.as_array().unwrap().iter().map(|v| v.as_f64().unwrap()).collect();
    assert_eq!(totals, vec![30.0; 7]);

    let breakdown = run_json(dir.path(), &["stats", "breakdown", "--samples", &samples, "--date", "2026-03-10"]);
    assert_eq!(breakdown["com.x"], 30.0);

    let history = run_json(
        dir.path(),
        &["stats", "history", "com.x", "--samples", &samples, "--date", "2026-03-10", "--days", "3"],
    );
    assert_eq!(history.as_array().unwrap().len(), 3);
    assert_eq!(history[0]["date"], "2026-03-08");
}

#[test]
fn test_streak_check_in() {
    let dir = TempDir::new().unwrap();
    let first = run_json(dir.path(), &["streak", "check-in", "--minutes", "30", "--date", "2026-03-01"]);
    assert_eq!(first["event"]["type"], "streak_updated");
    assert_eq!(first["record"]["streak_count"], 1);

    let second = run_json(dir.path(), &["streak", "check-in", "--minutes", "20", "--date", "2026-03-02"]);
    assert_eq!(second["record"]["streak_count"], 2);

    let again = run_json(dir.path(), &["streak", "check-in", "--minutes", "25", "--date", "2026-03-02"]);
    assert!(again["event"].is_null());
    assert_eq!(again["record"]["streak_count"], 2);
}

#[test]
fn test_gate_simulate_sunlight_unlocks() {
    let dir = TempDir::new().unwrap();
    let result = run_json(dir.path(), &["gate", "simulate", "--lux", "9000", "--hour", "12"]);
    assert_eq!(result["outcome"], "unlocked");
    assert_eq!(result["snapshot"]["state"], "unlocked");
    assert_eq!(result["snapshot"]["required_hold_ms"], 3000);
    assert_eq!(result["haptics"].as_array().unwrap().last().unwrap(), "success");
}

#[test]
fn test_gate_simulate_shade_fails() {
    let dir = TempDir::new().unwrap();
    let result = run_json(
        dir.path(),
        &["gate", "simulate", "--lux", "100", "--magnitude", "1.0", "--hold-ms", "5000", "--hour", "12"],
    );
    assert_eq!(result["outcome"], "failed");
    assert_eq!(result["snapshot"]["state"], "idle");
    assert_eq!(result["snapshot"]["progress"], 0.0);
    assert_eq!(result["haptics"][0], "error");
}

#[test]
fn test_gate_early_release() {
    let dir = TempDir::new().unwrap();
    let result = run_json(
        dir.path(),
        &["gate", "simulate", "--magnitude", "1.5", "--hold-ms", "2000", "--hour", "12"],
    );
    assert_eq!(result["outcome"], "released");
    assert_eq!(result["snapshot"]["progress"], 0.0);
}

#[test]
fn test_config_get_set() {
    let dir = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(dir.path(), &["config", "get", "gate.sun_hold_ms"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "3000");

    let (code, _, _) = run_cli(dir.path(), &["config", "set", "gate.sun_hold_ms", "2500"]);
    assert_eq!(code, 0);
    let (_, stdout, _) = run_cli(dir.path(), &["config", "get", "gate.sun_hold_ms"]);
    assert_eq!(stdout.trim(), "2500");

    let (code, _, stderr) = run_cli(dir.path(), &["config", "get", "gate.nope"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("unknown key"));
}

#[test]
fn test_onboarding_flag() {
    let dir = TempDir::new().unwrap();
    let status = run_json(dir.path(), &["onboarding", "status"]);
    assert_eq!(status["completed"], false);
    assert_eq!(status["initial_route"], "onboarding");

    let (code, _, _) = run_cli(dir.path(), &["onboarding", "complete"]);
    assert_eq!(code, 0);
    let status = run_json(dir.path(), &["onboarding", "status"]);
    assert_eq!(status["initial_route"], "home");
}

// tests/cli_tests.rs
//
// Smoke tests for the `prospector` binary.

use std::fs;
use std::process::{Command, Output};

use tempfile::tempdir;

fn run_cli(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_prospector"))
        .args(args)
        .env_remove("PROSPECTOR_TIME_MAX")
        .env_remove("PROSPECTOR_INVALID_ACTION_PENALTY")
        .env_remove("PROSPECTOR_TRACE_MODE")
        .env_remove("PROSPECTOR_TRACE_PATH")
        .output()
        .expect("Failed to execute prospector binary")
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

#[test]
fn rollout_thread_count_does_not_change_output() {
    let args = |threads: &'static str| {
        vec![
            "rollout", "--seeds", "5", "--steps", "200", "--time-max", "500", "--threads", threads,
        ]
    };
    let one = run_cli(&args("1"));
    let four = run_cli(&args("4"));
    assert!(one.status.success(), "{}", String::from_utf8_lossy(&one.stderr));
    assert!(four.status.success(), "{}", String::from_utf8_lossy(&four.stderr));

    // Header mentions the thread count; everything after it must match.
    let body = |s: String| s.lines().skip(1).collect::<Vec<_>>().join("\n");
    assert_eq!(body(stdout(&one)), body(stdout(&four)));
    assert_eq!(stdout(&one).lines().filter(|l| l.starts_with("seed=")).count(), 5);
}

#[test]
fn rollout_writes_jsonl_trace() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("rollout.jsonl");
    let out = run_cli(&[
        "rollout",
        "--seeds",
        "2",
        "--steps",
        "30",
        "--policy",
        "cycle",
        "--pattern",
        "8,6,7",
        "--jsonl",
        path.to_str().unwrap(),
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let content = fs::read_to_string(&path).expect("trace written");
    let records: Vec<serde_json::Value> = content
        .lines()
        .map(|l| serde_json::from_str(l).expect("valid JSON line"))
        .collect();
    let steps = records.iter().filter(|r| r["event"] == "step").count();
    let episodes = records.iter().filter(|r| r["event"] == "episode").count();
    assert_eq!(steps, 60);
    assert_eq!(episodes, 2);
}

#[test]
fn parity_record_then_compare_passes() {
    let dir = tempdir().expect("tempdir");
    let a = dir.path().join("a.jsonl");
    let b = dir.path().join("b.jsonl");
    for path in [&a, &b] {
        let out = run_cli(&[
            "parity",
            "record",
            "--suite",
            "b",
            "--seed",
            "7",
            "--steps",
            "100",
            "--out",
            path.to_str().unwrap(),
        ]);
        assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    }

    let out = run_cli(&[
        "parity",
        "compare",
        "--reference",
        a.to_str().unwrap(),
        "--candidate",
        b.to_str().unwrap(),
    ]);
    assert!(out.status.success());
    assert!(stdout(&out).starts_with("PASS"));
}

#[test]
fn parity_compare_fails_on_different_cases() {
    let dir = tempdir().expect("tempdir");
    let a = dir.path().join("a.jsonl");
    let b = dir.path().join("b.jsonl");
    for (path, seed) in [(&a, "1"), (&b, "2")] {
        let out = run_cli(&[
            "parity", "record", "--suite", "c", "--seed", seed, "--steps", "20", "--out",
            path.to_str().unwrap(),
        ]);
        assert!(out.status.success());
    }
    let out = run_cli(&[
        "parity",
        "compare",
        "--reference",
        a.to_str().unwrap(),
        "--candidate",
        b.to_str().unwrap(),
    ]);
    assert!(!out.status.success());
}

#[test]
fn parity_self_check_passes() {
    let out = run_cli(&[
        "parity",
        "self-check",
        "--seeds",
        "2",
        "--steps",
        "150",
        "--time-max",
        "300",
    ]);
    assert!(out.status.success(), "{}", stdout(&out));
    assert!(stdout(&out).contains("Completed 6 self-check cases. Failed: 0."));
}

#[test]
fn invalid_config_is_rejected() {
    let out = run_cli(&["rollout", "--seeds", "1", "--time-max", "0"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("invalid engine configuration"));
}

#[test]
fn inspect_prints_world_json() {
    let out = run_cli(&["inspect", "--seed", "3"]);
    assert!(out.status.success());
    let world: serde_json::Value = serde_json::from_str(&stdout(&out)).expect("world JSON");
    assert!(world["node_count"].as_u64().unwrap() >= 1);
    assert!(world["market"].is_object());
}

//! Operator CLI specs against a live worker and dispatcher.

use crate::prelude::*;
use serial_test::serial;
use std::process::Command;

fn rf(harness: &Harness, args: &[&str]) -> std::process::Output {
    Command::new(rf_binary())
        .arg("--worker")
        .arg(format!("127.0.0.1:{}", harness.worker_port))
        .args(args)
        .output()
        .unwrap()
}

#[tokio::test]
#[serial]
async fn pause_and_resume_via_cli() {
    let harness = Harness::boot();

    let output = rf(&harness, &["pause"]);
    assert!(output.status.success(), "{:?}", output);
    wait_until!("worker PAUSED", {
        harness.stats().await["rendernodes"]["renderNodesByStatus"]["PAUSED"] == 1
    });

    let output = rf(&harness, &["resume"]);
    assert!(output.status.success());
    wait_until!("worker IDLE", {
        harness.stats().await["rendernodes"]["renderNodesByStatus"]["IDLE"] == 1
    });
}

#[tokio::test]
#[serial]
async fn stop_unknown_command_reports_error() {
    let harness = Harness::boot();

    let output = rf(&harness, &["stop", "42"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown command"), "got: {stderr}");
}

#[tokio::test]
#[serial]
async fn stats_prints_summary() {
    let harness = Harness::boot();

    wait_until!("worker IDLE", {
        harness.stats().await["rendernodes"]["renderNodesByStatus"]["IDLE"] == 1
    });

    let output = Command::new(rf_binary())
        .args([
            "stats",
            "--dispatcher",
            &format!("127.0.0.1:{}", harness.dispatcher_port),
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("commands:"));
    assert!(stdout.contains("render nodes:"));
    assert!(stdout.contains("licenses:"));
}

#[tokio::test]
#[serial]
async fn refresh_is_accepted() {
    let harness = Harness::boot();
    let output = rf(&harness, &["refresh"]);
    assert!(output.status.success(), "{:?}", output);
}

//! Command lifecycle specs: assignment, progress, completion.

use crate::prelude::*;
use serial_test::serial;

#[tokio::test]
#[serial]
async fn happy_path_command_runs_to_done() {
    let harness = Harness::boot();
    let client = reqwest::Client::new();

    // Dispatcher assigns command 7.
    let response = client
        .post(harness.worker_url("/commands/"))
        .json(&command_body(7))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success(), "addCommand rejected");

    // The watcher's initial RUNNING delta reaches the dispatcher.
    wait_until!("RUNNING visible at dispatcher", {
        harness.stats().await["commands"]["RUNNING"] == 1
    });

    // The child reports progress, then completion.
    for body in [
        serde_json::json!({ "status": "RUNNING", "completion": 0.5 }),
        serde_json::json!({ "status": "DONE", "completion": 1.0, "message": "rendered" }),
    ] {
        let response = client
            .put(harness.worker_url("/commands/7/"))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());
    }

    wait_until!("DONE visible at dispatcher", {
        harness.stats().await["commands"]["DONE"] == 1
    });

    // Terminal status acknowledged: the watcher is gone, so further
    // updates bounce with 404.
    wait_until!("watcher removed", {
        let response = client
            .put(harness.worker_url("/commands/7/"))
            .json(&serde_json::json!({ "completion": 1.0 }))
            .send()
            .await
            .unwrap();
        response.status() == reqwest::StatusCode::NOT_FOUND
    });

    // Registry drained: the worker settles back to IDLE.
    wait_until!("worker IDLE again", {
        harness.stats().await["rendernodes"]["renderNodesByStatus"]["IDLE"] == 1
    });

    // PID file cleaned up.
    assert!(!harness.state_dir.path().join("pids/cw7.pid").exists());
}

#[tokio::test]
#[serial]
async fn stop_command_cancels_at_dispatcher() {
    let harness = Harness::boot();
    let client = reqwest::Client::new();

    client
        .post(harness.worker_url("/commands/"))
        .json(&command_body(11))
        .send()
        .await
        .unwrap();

    wait_until!("RUNNING visible at dispatcher", {
        harness.stats().await["commands"]["RUNNING"] == 1
    });

    let response = client
        .delete(harness.worker_url("/commands/11/"))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    wait_until!("CANCELED visible at dispatcher", {
        harness.stats().await["commands"]["CANCELED"] == 1
    });
}

#[tokio::test]
#[serial]
async fn duplicate_command_is_rejected() {
    let harness = Harness::boot();
    let client = reqwest::Client::new();

    let first = client
        .post(harness.worker_url("/commands/"))
        .json(&command_body(5))
        .send()
        .await
        .unwrap();
    assert!(first.status().is_success());

    let second = client
        .post(harness.worker_url("/commands/"))
        .json(&command_body(5))
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), reqwest::StatusCode::CONFLICT);
}

#[tokio::test]
#[serial]
async fn validation_report_is_accepted() {
    let harness = Harness::boot();
    let client = reqwest::Client::new();

    client
        .post(harness.worker_url("/commands/"))
        .json(&command_body(6))
        .send()
        .await
        .unwrap();

    let response = client
        .put(harness.worker_url("/commands/6/validation/"))
        .json(&serde_json::json!({
            "validatorMessage": "frame range mismatch",
            "errorInfos": [{ "frame": 3, "reason": "missing asset" }],
        }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    // Unknown command bounces.
    let response = client
        .put(harness.worker_url("/commands/999/validation/"))
        .json(&serde_json::json!({ "validatorMessage": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}

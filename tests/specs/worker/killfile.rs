//! Kill-file sentinel specs.

use crate::prelude::*;
use serial_test::serial;

#[tokio::test]
#[serial]
async fn empty_kill_file_pauses_without_killing() {
    let harness = Harness::boot();
    let client = reqwest::Client::new();

    client
        .post(harness.worker_url("/commands/"))
        .json(&command_body(7))
        .send()
        .await
        .unwrap();
    wait_until!("RUNNING visible", {
        harness.stats().await["commands"]["RUNNING"] == 1
    });

    std::fs::write(harness.kill_file(), "").unwrap();
    wait_until!("worker PAUSED at dispatcher", {
        harness.stats().await["rendernodes"]["renderNodesByStatus"]["PAUSED"] == 1
    });

    // Pause only: the command is still known and RUNNING.
    let stats = harness.stats().await;
    assert_eq!(stats["commands"]["RUNNING"], 1);
    assert_eq!(stats["commands"]["CANCELED"], 0);

    // New assignments are rejected while paused.
    let response = client
        .post(harness.worker_url("/commands/"))
        .json(&command_body(8))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::CONFLICT);

    // Deleting the kill-file unpauses on the next tick.
    std::fs::remove_file(harness.kill_file()).unwrap();
    wait_until!("worker leaves PAUSED", {
        harness.stats().await["rendernodes"]["renderNodesByStatus"]["PAUSED"] == 0
    });
}

#[tokio::test]
#[serial]
async fn kill_flag_aborts_watchers() {
    let harness = Harness::boot();
    let client = reqwest::Client::new();

    for id in [1, 2] {
        client
            .post(harness.worker_url("/commands/"))
            .json(&command_body(id))
            .send()
            .await
            .unwrap();
    }
    wait_until!("both RUNNING", {
        harness.stats().await["commands"]["RUNNING"] == 2
    });

    std::fs::write(harness.kill_file(), "-1").unwrap();
    wait_until!("worker PAUSED", {
        harness.stats().await["rendernodes"]["renderNodesByStatus"]["PAUSED"] == 1
    });

    // Watchers drain out: both commands disappear from the worker
    // (deltas stay at the dispatcher with their last reported state).
    wait_until!("updates for killed commands bounce", {
        let response = client
            .put(harness.worker_url("/commands/1/"))
            .json(&serde_json::json!({ "completion": 0.9 }))
            .send()
            .await
            .unwrap();
        response.status() == reqwest::StatusCode::NOT_FOUND
    });

    std::fs::remove_file(harness.kill_file()).unwrap();
    wait_until!("worker back to IDLE", {
        harness.stats().await["rendernodes"]["renderNodesByStatus"]["IDLE"] == 1
    });
}

#[tokio::test]
#[serial]
async fn restart_flag_emits_restart_file() {
    let harness = Harness::boot();

    std::fs::write(harness.kill_file(), "-3").unwrap();
    wait_until!("worker PAUSED", {
        harness.stats().await["rendernodes"]["renderNodesByStatus"]["PAUSED"] == 1
    });
    wait_until!("restart file emitted", harness.restart_file().exists());

    // Kill-file removal clears restart intent and unpauses.
    std::fs::remove_file(harness.kill_file()).unwrap();
    wait_until!("worker back to IDLE", {
        harness.stats().await["rendernodes"]["renderNodesByStatus"]["IDLE"] == 1
    });
}

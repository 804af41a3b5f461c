//! Command timeout specs.

use crate::prelude::*;
use serial_test::serial;

#[tokio::test]
#[serial]
async fn running_command_is_canceled_after_timeout() {
    let harness = Harness::boot();
    let client = reqwest::Client::new();

    let mut body = command_body(9);
    body["timeout"] = serde_json::json!(0.5);
    client
        .post(harness.worker_url("/commands/"))
        .json(&body)
        .send()
        .await
        .unwrap();

    wait_until!("RUNNING visible", {
        harness.stats().await["commands"]["RUNNING"] == 1
    });

    // After the budget expires the worker kills the child and reports
    // CANCELED without touching completion.
    wait_until!("CANCELED visible", {
        harness.stats().await["commands"]["CANCELED"] == 1
    });

    // The watcher is removed once the cancellation is acknowledged.
    wait_until!("watcher removed", {
        let response = client
            .put(harness.worker_url("/commands/9/"))
            .json(&serde_json::json!({ "completion": 0.9 }))
            .send()
            .await
            .unwrap();
        response.status() == reqwest::StatusCode::NOT_FOUND
    });
}

#[tokio::test]
#[serial]
async fn command_without_timeout_keeps_running() {
    let harness = Harness::boot();
    let client = reqwest::Client::new();

    client
        .post(harness.worker_url("/commands/"))
        .json(&command_body(4))
        .send()
        .await
        .unwrap();

    wait_until!("RUNNING visible", {
        harness.stats().await["commands"]["RUNNING"] == 1
    });

    // Give the reconciler a generous number of ticks; nothing cancels.
    tokio::time::sleep(std::time::Duration::from_millis(600)).await;
    let stats = harness.stats().await;
    assert_eq!(stats["commands"]["RUNNING"], 1);
    assert_eq!(stats["commands"]["CANCELED"], 0);
}

//! Worker boot and registration specs.

use crate::prelude::*;
use serial_test::serial;

#[tokio::test]
#[serial]
async fn worker_registers_and_goes_idle() {
    let harness = Harness::boot();

    // Registration already happened (READY comes after it); the
    // heartbeat drives the dispatcher's view to IDLE.
    wait_until!("worker IDLE at dispatcher", {
        harness.stats().await["rendernodes"]["renderNodesByStatus"]["IDLE"] == 1
    });

    let stats = harness.stats().await;
    assert_eq!(stats["rendernodes"]["missingRenderNodes"], 0);
    assert!(stats["rendernodes"]["totalCores"].as_u64().unwrap() >= 1);
}

#[tokio::test]
#[serial]
async fn heartbeats_keep_flowing() {
    let harness = Harness::boot();

    wait_until!("worker IDLE at dispatcher", {
        harness.stats().await["rendernodes"]["renderNodesByStatus"]["IDLE"] == 1
    });

    // Perturb the dispatcher's view; the next heartbeat restores it.
    let client = reqwest::Client::new();
    let response = client
        .put(harness.dispatcher_url(&format!(
            "/rendernodes/{}/sysinfos",
            harness.worker_name()
        )))
        .json(&serde_json::json!({ "status": "UNKNOWN" }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    wait_until!("heartbeat restores IDLE", {
        harness.stats().await["rendernodes"]["renderNodesByStatus"]["IDLE"] == 1
    });
}

#[tokio::test]
#[serial]
async fn performance_index_reaches_dispatcher() {
    let harness = Harness::boot();
    let client = reqwest::Client::new();

    let response = client
        .put(harness.worker_url("/performance/"))
        .json(&serde_json::json!({ "performance": 1.7 }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    wait_until!("performance recorded at dispatcher", {
        let node: serde_json::Value = reqwest::get(
            harness.dispatcher_url(&format!("/rendernodes/{}/", harness.worker_name())),
        )
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
        node["performance"] == 1.7
    });

    // The node also shows up on the mobile summary.
    let html = reqwest::get(harness.dispatcher_url("/mobile/"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains(&harness.worker_name()));
}

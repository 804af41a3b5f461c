// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP surface of the dispatcher stub.
//!
//! The render-node endpoints consumed by workers, plus the read-only
//! operator summaries (`/stats/`, `/system/`, `/mobile/`).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::json;
use tracing::info;

use rf_core::{CommandDelta, PausedUpdate, RegisterPayload, SysInfoUpdate};

use crate::state::DispatchState;

pub type SharedState = Arc<Mutex<DispatchState>>;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/rendernodes/:name/", post(register_node).get(get_node))
        .route("/rendernodes/:name/sysinfos", put(update_sysinfos))
        .route("/rendernodes/:name/commands/:id/", put(update_command))
        .route("/rendernodes/:name/paused/", put(set_paused))
        .route("/stats/", get(stats))
        .route("/system/", get(system))
        .route("/mobile/", get(mobile))
        .with_state(state)
}

async fn register_node(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    Json(payload): Json<RegisterPayload>,
) -> (StatusCode, Json<serde_json::Value>) {
    let registered = state.lock().register(&name, payload);
    if registered {
        info!(node = %name, "render node registered");
        (StatusCode::OK, Json(json!({ "registered": true })))
    } else {
        (
            StatusCode::CONFLICT,
            Json(json!({ "error": "already registered" })),
        )
    }
}

async fn get_node(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> (StatusCode, Json<serde_json::Value>) {
    let state = state.lock();
    match state.node(&name) {
        Some(node) => (
            StatusCode::OK,
            Json(json!({
                "name": name,
                "status": node.status,
                "paused": node.paused,
                "performance": node.performance,
                "commands": node.commands.len(),
                "cores": node.registration.cores,
                "ram": node.registration.ram,
            })),
        ),
        None => not_found("unknown render node"),
    }
}

async fn update_sysinfos(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    Json(update): Json<SysInfoUpdate>,
) -> (StatusCode, Json<serde_json::Value>) {
    if state.lock().update_sysinfos(&name, &update) {
        (StatusCode::OK, Json(json!({ "ok": true })))
    } else {
        not_found("unknown render node")
    }
}

async fn update_command(
    State(state): State<SharedState>,
    Path((name, _id)): Path<(String, u32)>,
    Json(delta): Json<CommandDelta>,
) -> (StatusCode, Json<serde_json::Value>) {
    if state.lock().update_command(&name, delta) {
        (StatusCode::OK, Json(json!({ "ok": true })))
    } else {
        not_found("unknown render node")
    }
}

async fn set_paused(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    Json(update): Json<PausedUpdate>,
) -> (StatusCode, Json<serde_json::Value>) {
    if state.lock().set_paused(&name, &update) {
        info!(node = %name, paused = update.paused, "pause state changed");
        (StatusCode::OK, Json(json!({ "ok": true })))
    } else {
        not_found("unknown render node")
    }
}

async fn stats(State(state): State<SharedState>) -> Json<serde_json::Value> {
    Json(state.lock().stats())
}

async fn system() -> Json<serde_json::Value> {
    let env: serde_json::Map<String, serde_json::Value> = std::env::vars()
        .map(|(k, v)| (k, serde_json::Value::String(v)))
        .collect();
    Json(serde_json::Value::Object(env))
}

async fn mobile(State(state): State<SharedState>) -> Html<String> {
    Html(state.lock().mobile_html())
}

fn not_found(message: &str) -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "error": message })))
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inbound control RPC listener.
//!
//! Serves the worker's HTTP surface on the configured port. Handlers
//! run on the server's tasks and never mutate worker state directly:
//! every operation goes through the [`OpQueue`] and is applied by the
//! worker loop.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{post, put};
use axum::{Json, Router};
use serde_json::json;
use tracing::info;

use rf_core::{CommandId, CommandSpec};

use crate::ops::{OpError, OpQueue, WorkerOp};
use crate::protocol::{Ack, CommandUpdateBody, PausedBody, PerformanceBody, ValidationBody};

/// Build the control router.
pub fn router(ops: OpQueue) -> Router {
    Router::new()
        .route("/commands/", post(add_command))
        .route("/commands/:id/", put(update_command).delete(stop_command))
        .route("/commands/:id/validation/", put(update_validation))
        .route("/sysinfos/", put(refresh_sysinfos))
        .route("/performance/", put(set_performance))
        .route("/paused/", put(set_paused))
        .with_state(ops)
}

/// Serve the control surface until the process exits.
pub async fn serve(listener: tokio::net::TcpListener, ops: OpQueue) {
    if let Ok(addr) = listener.local_addr() {
        info!("control RPC listening on {}", addr);
    }
    if let Err(e) = axum::serve(listener, router(ops)).await {
        tracing::error!("control listener failed: {}", e);
    }
}

/// RPC failure with its HTTP mapping.
struct RpcError(StatusCode, String);

impl From<OpError> for RpcError {
    fn from(err: OpError) -> Self {
        let status = match err {
            OpError::WorkerPaused | OpError::DuplicateCommand(_) => StatusCode::CONFLICT,
            OpError::UnknownCommand(_) => StatusCode::NOT_FOUND,
            OpError::Spawn(_) => StatusCode::INTERNAL_SERVER_ERROR,
            OpError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        };
        Self(status, err.to_string())
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        (self.0, Json(json!({ "error": self.1 }))).into_response()
    }
}

async fn add_command(
    State(ops): State<OpQueue>,
    Json(spec): Json<CommandSpec>,
) -> Result<Json<Ack>, RpcError> {
    ops.submit(|reply| WorkerOp::AddCommand { spec, reply })
        .await?;
    Ok(Json(Ack::ok()))
}

async fn stop_command(
    State(ops): State<OpQueue>,
    Path(id): Path<u32>,
) -> Result<Json<Ack>, RpcError> {
    ops.submit(|reply| WorkerOp::StopCommand {
        id: CommandId(id),
        reply,
    })
    .await?;
    Ok(Json(Ack::ok()))
}

async fn update_command(
    State(ops): State<OpQueue>,
    Path(id): Path<u32>,
    Json(update): Json<CommandUpdateBody>,
) -> Result<Json<Ack>, RpcError> {
    ops.submit(|reply| WorkerOp::UpdateCommand {
        id: CommandId(id),
        update,
        reply,
    })
    .await?;
    Ok(Json(Ack::ok()))
}

async fn update_validation(
    State(ops): State<OpQueue>,
    Path(id): Path<u32>,
    Json(update): Json<ValidationBody>,
) -> Result<Json<Ack>, RpcError> {
    ops.submit(|reply| WorkerOp::UpdateValidation {
        id: CommandId(id),
        update,
        reply,
    })
    .await?;
    Ok(Json(Ack::ok()))
}

async fn refresh_sysinfos(State(ops): State<OpQueue>) -> Result<Json<Ack>, RpcError> {
    ops.submit(|reply| WorkerOp::RefreshSysInfos { reply })
        .await?;
    Ok(Json(Ack::ok()))
}

async fn set_performance(
    State(ops): State<OpQueue>,
    Json(update): Json<PerformanceBody>,
) -> Result<Json<Ack>, RpcError> {
    ops.submit(|reply| WorkerOp::SetPerformance { update, reply })
        .await?;
    Ok(Json(Ack::ok()))
}

async fn set_paused(
    State(ops): State<OpQueue>,
    Json(update): Json<PausedBody>,
) -> Result<Json<Ack>, RpcError> {
    ops.submit(|reply| WorkerOp::SetPaused { update, reply })
        .await?;
    Ok(Json(Ack::ok()))
}

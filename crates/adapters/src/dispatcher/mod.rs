// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatcher client adapter.
//!
//! Every outbound call lands in one of four outcome classes the
//! reconciler keys on: transient failures are retried, 404 means the
//! dispatcher has forgotten us, 409 on registration means we already
//! exist, and anything else non-2xx is surfaced for logging.

mod http;

pub use http::HttpDispatcher;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{DispatcherCall, FakeDispatcher};

use async_trait::async_trait;
use thiserror::Error;

use rf_core::{CommandDelta, CommandId, PausedUpdate, RegisterPayload, SysInfoUpdate};

/// Failure classes for dispatcher traffic.
#[derive(Debug, Clone, Error)]
pub enum DispatcherError {
    /// Connection refused, socket error, or a malformed response
    /// line. Retry policy applies.
    #[error("transient dispatcher error: {0}")]
    Transient(String),

    /// HTTP 404: the dispatcher no longer tracks this worker or
    /// command.
    #[error("not found at dispatcher")]
    NotFound,

    /// HTTP 409: already registered. Callers treat this as success.
    #[error("already registered at dispatcher")]
    Conflict,

    /// Any other non-2xx answer.
    #[error("unexpected dispatcher response {status}: {body}")]
    Unexpected { status: u16, body: String },
}

/// Adapter for talking to the dispatcher.
#[async_trait]
pub trait Dispatcher: Clone + Send + Sync + 'static {
    /// `POST /rendernodes/{name}/` with the full capability payload.
    async fn register(&self, name: &str, payload: &RegisterPayload)
        -> Result<(), DispatcherError>;

    /// `PUT /rendernodes/{name}/sysinfos` for heartbeats and
    /// performance-index updates.
    async fn send_sysinfos(&self, name: &str, update: &SysInfoUpdate)
        -> Result<(), DispatcherError>;

    /// `PUT /rendernodes/{name}/commands/{id}/` with a command delta.
    async fn update_command(
        &self,
        name: &str,
        id: CommandId,
        delta: &CommandDelta,
    ) -> Result<(), DispatcherError>;

    /// `PUT /rendernodes/{name}/paused/` with the pause intent.
    async fn set_paused(&self, name: &str, update: &PausedUpdate)
        -> Result<(), DispatcherError>;
}

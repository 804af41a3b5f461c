// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control RPC bodies.
//!
//! The dispatcher (and the command-watcher children reporting
//! progress) drive the worker through a small JSON-over-HTTP surface;
//! these are the request and response shapes. The `addCommand` body
//! is [`rf_core::CommandSpec`].

use serde::{Deserialize, Serialize};

use rf_core::CommandStatus;

/// Body of `PUT /commands/{id}/`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandUpdateBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CommandStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Body of `PUT /commands/{id}/validation/`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validator_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_infos: Option<serde_json::Value>,
}

/// Body of `PUT /paused/`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PausedBody {
    pub paused: bool,
    #[serde(default)]
    pub killproc: bool,
}

/// Body of `PUT /performance/`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceBody {
    pub performance: f64,
}

/// Success response for every control operation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ack {
    pub ok: bool,
}

impl Ack {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;

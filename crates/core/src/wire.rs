// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON bodies exchanged with the dispatcher.
//!
//! Field spellings here are the dispatcher's wire contract and must
//! not be "fixed": `caracteristics` and `mikdistrib` are historical.

use serde::{Deserialize, Serialize};

use crate::command::{Command, CommandId, CommandStatus};
use crate::status::WorkerStatus;

/// Node capability block sent at registration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Caracteristics {
    pub os: String,
    pub softs: Vec<String>,
    pub cpuname: String,
    pub distribname: String,
    pub mikdistrib: String,
    pub openglversion: String,
}

/// Body of `POST /rendernodes/{name}/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterPayload {
    pub cores: u32,
    /// Total physical RAM in MiB.
    pub ram: u64,
    pub caracteristics: Caracteristics,
    pub name: String,
    pub port: u16,
    pub status: WorkerStatus,
    pub pools: Vec<String>,
    pub speed: f64,
    /// Commands already in flight on this worker, included when
    /// re-registering after dispatcher amnesia.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commands: Option<Vec<CommandDelta>>,
}

/// Body of `PUT /rendernodes/{name}/sysinfos`.
///
/// Heartbeats send `{status}`; performance-index updates send
/// `{performance}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SysInfoUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<WorkerStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance: Option<f64>,
}

impl SysInfoUpdate {
    pub fn status(status: WorkerStatus) -> Self {
        Self {
            status: Some(status),
            performance: None,
        }
    }

    pub fn performance(performance: f64) -> Self {
        Self {
            status: None,
            performance: Some(performance),
        }
    }
}

/// Body of `PUT /rendernodes/{name}/paused/`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PausedUpdate {
    pub paused: bool,
    pub killproc: bool,
}

/// Body of `PUT /rendernodes/{name}/commands/{id}/`.
///
/// Idempotent on identical content: replaying the last delta yields
/// an equivalent dispatcher state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandDelta {
    pub id: CommandId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CommandStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion: Option<f32>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validator_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_infos: Option<serde_json::Value>,
}

impl CommandDelta {
    /// Snapshot the fields the dispatcher tracks for a command.
    pub fn from_command(command: &Command) -> Self {
        Self {
            id: command.id,
            status: Some(command.status),
            completion: command.completion,
            message: command.message.clone(),
            validator_message: command.validator_message.clone(),
            error_infos: command.error_infos.clone(),
        }
    }
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;

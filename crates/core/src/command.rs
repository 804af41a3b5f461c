// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command model and status state machine.
//!
//! A command is a single executable unit assigned to this worker by
//! the dispatcher. The dispatcher owns command identity; the worker
//! owns the local lifecycle (spawn, progress, terminal status).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Dispatcher-assigned command identifier, unique within one worker
/// for its lifetime.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CommandId(pub u32);

impl CommandId {
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for CommandId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for CommandId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Command status as exchanged with the dispatcher.
///
/// `Finishing` may show up as a transient reported value from the
/// runner; the worker treats it as non-terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandStatus {
    Blocked,
    Ready,
    Assigned,
    Running,
    Finishing,
    Done,
    Canceled,
    Error,
    Timeout,
    Paused,
}

impl CommandStatus {
    /// Terminal statuses admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CommandStatus::Done
                | CommandStatus::Canceled
                | CommandStatus::Error
                | CommandStatus::Timeout
        )
    }
}

impl std::fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CommandStatus::Blocked => "BLOCKED",
            CommandStatus::Ready => "READY",
            CommandStatus::Assigned => "ASSIGNED",
            CommandStatus::Running => "RUNNING",
            CommandStatus::Finishing => "FINISHING",
            CommandStatus::Done => "DONE",
            CommandStatus::Canceled => "CANCELED",
            CommandStatus::Error => "ERROR",
            CommandStatus::Timeout => "TIMEOUT",
            CommandStatus::Paused => "PAUSED",
        };
        write!(f, "{}", name)
    }
}

/// Immutable description of a command as assigned by the dispatcher.
///
/// This is also the body of the `addCommand` control RPC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandSpec {
    pub id: CommandId,
    pub runner: String,
    #[serde(default)]
    pub arguments: IndexMap<String, String>,
    #[serde(default)]
    pub validation_expression: String,
    #[serde(default)]
    pub task_name: String,
    #[serde(default)]
    pub relative_log_path: String,
    #[serde(default)]
    pub environment: IndexMap<String, String>,
    /// Wall-clock timeout in seconds, enforced while the command is
    /// RUNNING. Absent means the command may run indefinitely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<f64>,
}

/// Result of applying an update to a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The command already reached a terminal status; the update was
    /// dropped.
    Ignored,
    /// Fields were updated. `terminal` is true when this update moved
    /// the command into the terminal set.
    Applied { terminal: bool },
}

/// A command plus its mutable progress fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    pub id: CommandId,
    pub runner: String,
    pub arguments: IndexMap<String, String>,
    pub validation_expression: String,
    pub task_name: String,
    pub relative_log_path: String,
    pub environment: IndexMap<String, String>,
    pub status: CommandStatus,
    pub completion: Option<f32>,
    pub message: String,
    pub validator_message: Option<String>,
    pub error_infos: Option<serde_json::Value>,
}

impl Command {
    /// Create a command from its assignment. Commands arrive ASSIGNED;
    /// the supervisor moves them to RUNNING once the watcher child is
    /// spawned.
    pub fn new(spec: &CommandSpec) -> Self {
        Self {
            id: spec.id,
            runner: spec.runner.clone(),
            arguments: spec.arguments.clone(),
            validation_expression: spec.validation_expression.clone(),
            task_name: spec.task_name.clone(),
            relative_log_path: spec.relative_log_path.clone(),
            environment: spec.environment.clone(),
            status: CommandStatus::Assigned,
            completion: None,
            message: String::new(),
            validator_message: None,
            error_infos: None,
        }
    }

    /// Apply a progress update. Terminal statuses are absorbing: once
    /// the command is DONE/CANCELED/ERROR/TIMEOUT no field changes.
    pub fn apply_update(
        &mut self,
        completion: Option<f32>,
        status: Option<CommandStatus>,
        message: Option<String>,
    ) -> UpdateOutcome {
        if self.status.is_terminal() {
            return UpdateOutcome::Ignored;
        }
        if let Some(completion) = completion {
            self.completion = Some(completion);
        }
        if let Some(message) = message {
            self.message = message;
        }
        let mut terminal = false;
        if let Some(status) = status {
            self.status = status;
            terminal = status.is_terminal();
        }
        UpdateOutcome::Applied { terminal }
    }

    /// Record validator output from the runner.
    pub fn apply_validation(
        &mut self,
        validator_message: Option<String>,
        error_infos: Option<serde_json::Value>,
    ) {
        self.validator_message = validator_message;
        self.error_infos = error_infos;
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;

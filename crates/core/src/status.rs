// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker (render node) status.

use serde::{Deserialize, Serialize};

/// Operational state of a worker as reported to the dispatcher.
///
/// A worker holding at least one non-terminal watcher is `Running`
/// unless it has been paused; a worker whose registry empties goes
/// back to `Idle` on the next reconciler tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerStatus {
    Booting,
    Idle,
    Running,
    Paused,
    Unknown,
}

impl std::fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WorkerStatus::Booting => "BOOTING",
            WorkerStatus::Idle => "IDLE",
            WorkerStatus::Running => "RUNNING",
            WorkerStatus::Paused => "PAUSED",
            WorkerStatus::Unknown => "UNKNOWN",
        };
        write!(f, "{}", name)
    }
}

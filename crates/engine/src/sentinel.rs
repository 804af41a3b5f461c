// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operator control files.
//!
//! Operators pause a worker by creating the kill-file; its integer
//! content selects how aggressive the pause is. The worker polls the
//! file every tick; the polling cadence is the operator contract, so
//! this deliberately does not use filesystem notifications. When the
//! worker is paused and marked for restart it emits the restart file
//! as a signal to the external supervisor that relaunches it.

use std::io;
use std::path::{Path, PathBuf};

/// Parsed kill-file intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillSwitch {
    /// Empty file or `0`: pause only, children untouched.
    Pause,
    /// `-1`: pause and kill all current watchers.
    PauseAndKill,
    /// `-2`: pause and mark the worker for restart.
    PauseAndRestart,
    /// `-3`: pause, kill all watchers, and mark for restart.
    PauseKillAndRestart,
}

impl KillSwitch {
    /// Parse kill-file contents. Anything unrecognized is a plain
    /// pause.
    pub fn parse(contents: &str) -> Self {
        match contents.trim().parse::<i64>() {
            Ok(-1) => KillSwitch::PauseAndKill,
            Ok(-2) => KillSwitch::PauseAndRestart,
            Ok(-3) => KillSwitch::PauseKillAndRestart,
            _ => KillSwitch::Pause,
        }
    }

    /// Should current watchers be killed?
    pub fn kill_watchers(self) -> bool {
        matches!(
            self,
            KillSwitch::PauseAndKill | KillSwitch::PauseKillAndRestart
        )
    }

    /// Should the worker be marked for restart?
    pub fn restart(self) -> bool {
        matches!(
            self,
            KillSwitch::PauseAndRestart | KillSwitch::PauseKillAndRestart
        )
    }
}

/// The worker's pair of sentinel files.
#[derive(Debug, Clone)]
pub struct ControlFiles {
    kill_file: PathBuf,
    restart_file: PathBuf,
}

impl ControlFiles {
    pub fn new(kill_file: impl Into<PathBuf>, restart_file: impl Into<PathBuf>) -> Self {
        Self {
            kill_file: kill_file.into(),
            restart_file: restart_file.into(),
        }
    }

    /// Read the kill-file. `None` means it is absent (worker should
    /// be unpaused). An unreadable-but-present file still pauses.
    pub fn poll(&self) -> Option<KillSwitch> {
        match std::fs::read_to_string(&self.kill_file) {
            Ok(contents) => Some(KillSwitch::parse(&contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(
                    path = %self.kill_file.display(),
                    "kill-file present but unreadable: {}",
                    e
                );
                Some(KillSwitch::Pause)
            }
        }
    }

    /// Whether the kill-file currently exists.
    pub fn kill_file_present(&self) -> bool {
        self.kill_file.exists()
    }

    /// Ensure the restart file exists for the external supervisor.
    pub fn touch_restart_file(&self) -> io::Result<()> {
        if let Some(parent) = self.restart_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.restart_file, b"")
    }

    pub fn restart_file(&self) -> &Path {
        &self.restart_file
    }
}

#[cfg(test)]
#[path = "sentinel_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Child-process supervision for command watchers.
//!
//! The supervisor owns the OS side of a command: it spawns the
//! runner-watcher helper in its own process group, keeps its PID file
//! and log file, signals the whole group on kill, and reaps exited
//! children without blocking the reconciler.

use std::fs::{DirBuilder, OpenOptions};
use std::io;
use std::os::unix::fs::DirBuilderExt;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command as OsCommand};

use nix::sys::signal::{killpg, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use thiserror::Error;

use rf_core::{Command, CommandId};

/// Spawn failures. No watcher record exists when spawn fails; the
/// control RPC layer surfaces the error to the dispatcher.
#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: io::Error,
    },

    #[error("failed to open log file {path}: {source}")]
    OpenLog {
        path: PathBuf,
        source: io::Error,
    },

    #[error("failed to spawn watcher {program}: {source}")]
    Spawn {
        program: PathBuf,
        source: io::Error,
    },

    #[error("failed to write pid file {path}: {source}")]
    WritePidFile {
        path: PathBuf,
        source: io::Error,
    },
}

/// Handle to a spawned command-watcher child.
#[derive(Debug)]
pub struct WatcherProcess {
    pid: u32,
    pid_file: PathBuf,
    log_file: PathBuf,
    // Held so the OS handle outlives the watcher record; reaping goes
    // through waitpid, never through this handle.
    #[allow(dead_code)]
    child: Option<Child>,
}

impl WatcherProcess {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn pid_file(&self) -> &Path {
        &self.pid_file
    }

    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    /// Process-less handle for tests that exercise registry and
    /// worker logic without spawning children.
    #[cfg(any(test, feature = "test-support"))]
    pub fn detached(pid: u32) -> Self {
        Self {
            pid,
            pid_file: PathBuf::from(format!("/tmp/cw{}.pid", pid)),
            log_file: PathBuf::from(format!("/tmp/cw{}.log", pid)),
            child: None,
        }
    }
}

/// Outcome of a non-blocking wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReapedChild {
    pub pid: i32,
    /// Human-readable exit detail ("exit status 0", "signal SIGTERM").
    pub detail: String,
}

/// Spawner for command-watcher children.
#[derive(Debug, Clone)]
pub struct Supervisor {
    pid_dir: PathBuf,
    log_root: PathBuf,
    watcher_program: PathBuf,
    control_port: u16,
}

impl Supervisor {
    pub fn new(
        pid_dir: impl Into<PathBuf>,
        log_root: impl Into<PathBuf>,
        watcher_program: impl Into<PathBuf>,
        control_port: u16,
    ) -> Self {
        Self {
            pid_dir: pid_dir.into(),
            log_root: log_root.into(),
            watcher_program: watcher_program.into(),
            control_port,
        }
    }

    /// Path of the PID file for a command.
    pub fn pid_file(&self, id: CommandId) -> PathBuf {
        self.pid_dir.join(format!("cw{}.pid", id))
    }

    /// Spawn the watcher child for `command`.
    ///
    /// Creates the log and PID directories (world-writable, matching
    /// the farm's historical operator tooling; a known security
    /// smell), truncates the log file, starts the watcher program in
    /// its own process group with the fixed argument vector, and
    /// records the child PID in `cw<id>.pid`.
    pub fn spawn(&self, command: &Command) -> Result<WatcherProcess, SpawnError> {
        let log_dir = self.log_root.join(&command.relative_log_path);
        create_permissive_dir(&log_dir)?;
        create_permissive_dir(&self.pid_dir)?;

        let log_path = log_dir.join(format!("{}.log", command.id));
        let log_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&log_path)
            .map_err(|source| SpawnError::OpenLog {
                path: log_path.clone(),
                source,
            })?;
        let log_for_stderr = log_file
            .try_clone()
            .map_err(|source| SpawnError::OpenLog {
                path: log_path.clone(),
                source,
            })?;

        let mut cmd = OsCommand::new(&self.watcher_program);
        cmd.arg(&log_path)
            .arg(self.control_port.to_string())
            .arg(command.id.to_string())
            .arg(&command.runner)
            .arg(&command.validation_expression);
        for (name, value) in &command.arguments {
            cmd.arg(format!("{}={}", name, value));
        }
        cmd.envs(&command.environment)
            .stdout(log_file)
            .stderr(log_for_stderr)
            // Own process group: the child survives worker restarts
            // and group-wide signals reach the runner's descendants.
            .process_group(0);

        let child = cmd.spawn().map_err(|source| SpawnError::Spawn {
            program: self.watcher_program.clone(),
            source,
        })?;
        let pid = child.id();

        let pid_file = self.pid_file(command.id);
        std::fs::write(&pid_file, format!("{}\n", pid)).map_err(|source| {
            SpawnError::WritePidFile {
                path: pid_file.clone(),
                source,
            }
        })?;

        tracing::info!(
            command_id = %command.id,
            pid,
            log = %log_path.display(),
            "started command watcher"
        );

        Ok(WatcherProcess {
            pid,
            pid_file,
            log_file: log_path,
            child: Some(child),
        })
    }

    /// SIGTERM the watcher's whole process group. A group that is
    /// already gone is not an error.
    pub fn kill(&self, process: &WatcherProcess) {
        let pgid = Pid::from_raw(process.pid() as i32);
        match killpg(pgid, Signal::SIGTERM) {
            Ok(()) => {
                tracing::info!(pid = process.pid(), "sent SIGTERM to watcher group");
            }
            Err(nix::errno::Errno::ESRCH) => {
                tracing::debug!(pid = process.pid(), "watcher group already exited");
            }
            Err(e) => {
                tracing::warn!(pid = process.pid(), "failed to signal watcher group: {}", e);
            }
        }
    }

    /// Delete a command's PID file. A file already gone is tolerated;
    /// anything else is logged.
    pub fn remove_pid_file(&self, id: CommandId) {
        let path = self.pid_file(id);
        if let Err(e) = std::fs::remove_file(&path) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), "failed to remove pid file: {}", e);
            }
        }
    }
}

/// Non-blocking wait for any exited child.
///
/// Returns `None` when no child has exited (or there are no children
/// at all). Call in a loop each tick until it returns `None`.
pub fn reap_any() -> Option<ReapedChild> {
    match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
        Ok(WaitStatus::Exited(pid, code)) => Some(ReapedChild {
            pid: pid.as_raw(),
            detail: format!("exit status {}", code),
        }),
        Ok(WaitStatus::Signaled(pid, signal, _)) => Some(ReapedChild {
            pid: pid.as_raw(),
            detail: format!("signal {:?}", signal),
        }),
        Ok(_) => None,
        // ECHILD: nothing to reap.
        Err(_) => None,
    }
}

/// `mkdir -p` with 0o777, tolerating concurrent creation.
fn create_permissive_dir(path: &Path) -> Result<(), SpawnError> {
    DirBuilder::new()
        .recursive(true)
        .mode(0o777)
        .create(path)
        .map_err(|source| SpawnError::CreateDir {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;

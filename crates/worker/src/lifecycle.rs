// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker lifecycle management: configuration, startup checks.

use std::io;
use std::os::unix::fs::DirBuilderExt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::env;

/// Worker configuration, assembled from defaults, an optional TOML
/// file, and `RF_*` environment overrides. Passed into the worker
/// constructor; there is no global settings object.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address this worker advertises to the dispatcher. Together
    /// with `port` it forms the render-node name `address:port`.
    pub address: String,
    /// Control RPC port, bound on all interfaces.
    pub port: u16,
    /// Dispatcher base URL (e.g. `http://10.0.0.1:8004`).
    pub dispatcher_url: String,
    /// Root under which per-command log files are written.
    pub log_root: PathBuf,
    /// Directory holding `cw<id>.pid` files. Boot-fatal if unusable.
    pub pid_dir: PathBuf,
    /// Operator kill-file (pause sentinel).
    pub kill_file: PathBuf,
    /// Restart sentinel emitted for the external supervisor.
    pub restart_file: PathBuf,
    /// Runner-watcher helper executable.
    pub watcher_program: PathBuf,
    /// Reconciler tick period.
    pub tick_period: Duration,
    /// Heartbeat period.
    pub heartbeat_period: Duration,
    /// Timeout for each outbound dispatcher request.
    pub request_timeout: Duration,
    /// Sleep between registration attempts.
    pub register_retry_delay: Duration,
    /// Path to the worker's own log file.
    pub log_path: PathBuf,
}

/// On-disk configuration file shape (every field optional).
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    worker: WorkerSection,
    #[serde(default)]
    dispatcher: DispatcherSection,
    #[serde(default)]
    paths: PathsSection,
    #[serde(default)]
    timing: TimingSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct WorkerSection {
    address: Option<String>,
    port: Option<u16>,
    watcher_program: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DispatcherSection {
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PathsSection {
    log_root: Option<PathBuf>,
    pid_dir: Option<PathBuf>,
    kill_file: Option<PathBuf>,
    restart_file: Option<PathBuf>,
    log_file: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TimingSection {
    tick_ms: Option<u64>,
    heartbeat_ms: Option<u64>,
    request_timeout_ms: Option<u64>,
    register_retry_ms: Option<u64>,
}

impl Config {
    /// Load configuration.
    ///
    /// Precedence: `RF_*` environment > config file (`RF_CONFIG` or
    /// `<state_dir>/worker.toml`) > defaults under the state
    /// directory.
    pub fn load() -> Result<Self, LifecycleError> {
        let state_dir = env::state_dir()?;

        let file_path = env::config_path().unwrap_or_else(|| state_dir.join("worker.toml"));
        let file: ConfigFile = match std::fs::read_to_string(&file_path) {
            Ok(contents) => toml::from_str(&contents)
                .map_err(|e| LifecycleError::Config(file_path.clone(), e.to_string()))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => ConfigFile::default(),
            Err(e) => return Err(LifecycleError::Io(e)),
        };

        let port = env::port()
            .or(file.worker.port)
            .unwrap_or(8000);

        Ok(Self {
            address: env::address()
                .or(file.worker.address)
                .unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            dispatcher_url: env::dispatcher_url()
                .or(file.dispatcher.url)
                .unwrap_or_else(|| "http://127.0.0.1:8004".to_string()),
            log_root: file.paths.log_root.unwrap_or_else(|| state_dir.join("logs")),
            pid_dir: file.paths.pid_dir.unwrap_or_else(|| state_dir.join("pids")),
            kill_file: file
                .paths
                .kill_file
                .unwrap_or_else(|| state_dir.join("KILLFILE")),
            restart_file: file
                .paths
                .restart_file
                .unwrap_or_else(|| state_dir.join("RESTARTFILE")),
            watcher_program: env::watcher_program()
                .or(file.worker.watcher_program)
                .unwrap_or_else(|| PathBuf::from("rf-command-watcher")),
            tick_period: env::tick_ms()
                .or(file.timing.tick_ms.map(Duration::from_millis))
                .unwrap_or(Duration::from_millis(50)),
            heartbeat_period: env::heartbeat_ms()
                .or(file.timing.heartbeat_ms.map(Duration::from_millis))
                .unwrap_or(Duration::from_secs(6)),
            request_timeout: env::request_timeout_ms()
                .or(file.timing.request_timeout_ms.map(Duration::from_millis))
                .unwrap_or(Duration::from_secs(5)),
            register_retry_delay: env::register_retry_ms()
                .or(file.timing.register_retry_ms.map(Duration::from_millis))
                .unwrap_or(Duration::from_secs(10)),
            log_path: file
                .paths
                .log_file
                .unwrap_or_else(|| state_dir.join("worker.log")),
        })
    }

    /// Render-node name as known to the dispatcher.
    pub fn worker_name(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Invalid config file {0}: {1}")]
    Config(PathBuf, String),

    #[error("Invalid dispatcher URL {0}: {1}")]
    Dispatcher(String, String),

    #[error("PID directory {0} is unusable: {1}")]
    PidDir(PathBuf, #[source] io::Error),

    #[error("Failed to bind control port {0}: {1}")]
    BindFailed(u16, #[source] io::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Boot-time filesystem checks.
///
/// The PID directory must exist (created world-writable like the
/// rest of the farm's shared paths) and be writable; anything less is
/// fatal at boot per the error-handling contract.
pub fn ensure_pid_dir(config: &Config) -> Result<(), LifecycleError> {
    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(0o777)
        .create(&config.pid_dir)
        .map_err(|e| LifecycleError::PidDir(config.pid_dir.clone(), e))?;

    let probe = config.pid_dir.join(".access-check");
    std::fs::write(&probe, b"")
        .map_err(|e| LifecycleError::PidDir(config.pid_dir.clone(), e))?;
    let _ = std::fs::remove_file(&probe);
    Ok(())
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;

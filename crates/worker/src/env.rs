// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the worker daemon.

use std::path::PathBuf;
use std::time::Duration;

use crate::lifecycle::LifecycleError;

/// Resolve state directory: RF_STATE_DIR > XDG_STATE_HOME/rf > ~/.local/state/rf
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("RF_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("rf"));
    }
    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/rf"))
}

/// Config file path override
pub fn config_path() -> Option<PathBuf> {
    std::env::var("RF_CONFIG").ok().map(PathBuf::from)
}

pub fn address() -> Option<String> {
    std::env::var("RF_ADDRESS").ok()
}

pub fn port() -> Option<u16> {
    std::env::var("RF_PORT").ok().and_then(|s| s.parse().ok())
}

pub fn dispatcher_url() -> Option<String> {
    std::env::var("RF_DISPATCHER_URL").ok()
}

pub fn watcher_program() -> Option<PathBuf> {
    std::env::var("RF_WATCHER_PROGRAM").ok().map(PathBuf::from)
}

/// Reconciler tick override
pub fn tick_ms() -> Option<Duration> {
    duration_ms("RF_TICK_MS")
}

/// Heartbeat period override
pub fn heartbeat_ms() -> Option<Duration> {
    duration_ms("RF_HEARTBEAT_MS")
}

/// Registration retry delay override
pub fn register_retry_ms() -> Option<Duration> {
    duration_ms("RF_REGISTER_RETRY_MS")
}

/// Outbound request timeout override
pub fn request_timeout_ms() -> Option<Duration> {
    duration_ms("RF_REQUEST_TIMEOUT_MS")
}

fn duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

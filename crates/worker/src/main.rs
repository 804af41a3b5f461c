// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Renderfarm Worker Daemon (rfwd)
//!
//! Long-lived agent running on each render node. Accepts command
//! assignments from the dispatcher, supervises them as child
//! processes, reports progress and terminal status back, and obeys
//! the operator sentinel files.
//!
//! Architecture:
//! - Listener Task: axum server handling the control RPC, enqueues ops
//! - Worker Loop: main task applying ops and running the reconciler tick

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod env;
mod lifecycle;
mod listener;
mod ops;
mod protocol;
mod worker;

use rf_adapters::HttpDispatcher;
use rf_core::SystemClock;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::lifecycle::{Config, LifecycleError};
use crate::ops::OpQueue;
use crate::worker::Worker;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle info flags before any config loading
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("rfwd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("rfwd {}", env!("CARGO_PKG_VERSION"));
                println!("Renderfarm Worker Daemon - supervises dispatcher-assigned commands on this node");
                println!();
                println!("USAGE:");
                println!("    rfwd");
                println!();
                println!("Configuration comes from <state-dir>/worker.toml (or RF_CONFIG)");
                println!("plus RF_* environment overrides. The daemon registers itself");
                println!("with the dispatcher and serves the control RPC on RF_PORT.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: rfwd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    // Load configuration
    let config = Config::load()?;

    // Rotate log file if it has grown too large
    rotate_log_if_needed(&config.log_path);

    // Set up logging
    let log_guard = setup_logging(&config)?;

    info!("Starting worker daemon on {}", config.worker_name());

    // Boot-fatal filesystem check: the PID directory must be usable.
    if let Err(e) = lifecycle::ensure_pid_dir(&config) {
        error!("Failed to prepare PID directory: {}", e);
        drop(log_guard);
        return Err(e.into());
    }

    // Bind the control port before registering so the dispatcher can
    // reach us as soon as it learns our name.
    let bind_addr = format!("0.0.0.0:{}", config.port);
    let control_listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| LifecycleError::BindFailed(config.port, e))?;

    let dispatcher = HttpDispatcher::new(config.dispatcher_url.clone(), config.request_timeout)
        .map_err(|e| LifecycleError::Dispatcher(config.dispatcher_url.clone(), e.to_string()))?;

    let tick_period = config.tick_period;
    let mut worker = Worker::new(config, dispatcher, SystemClock);

    // Spawn listener task
    let (op_tx, mut op_rx) = mpsc::channel(64);
    tokio::spawn(listener::serve(control_listener, OpQueue::new(op_tx)));

    // Initial registration handshake (retries until the dispatcher
    // answers), then kill-file evaluation and first heartbeat.
    worker.register().await;

    // Set up signal handlers
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!("Worker {} ready, listening on {}", worker.name(), bind_addr);

    // Signal ready for parent process (e.g. an init script or test
    // harness waiting for startup)
    println!("READY");

    // Reconciler tick interval.
    // NOTE: Must be created outside the loop - tokio::select! re-evaluates
    // branches on each iteration, so using sleep() inside would reset on
    // every op, starving the reconciler under control traffic.
    let mut tick = tokio::time::interval(tick_period);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    // Worker loop - applies control ops and runs the reconciler pass
    loop {
        tokio::select! {
            // Control operations from the listener
            op = op_rx.recv() => {
                match op {
                    Some(op) => worker.handle_op(op).await,
                    None => {
                        info!("Control channel closed, shutting down...");
                        break;
                    }
                }
            }

            // Graceful shutdown on SIGTERM
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down...");
                break;
            }

            // Graceful shutdown on SIGINT
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down...");
                break;
            }

            // Reconciler pass
            _ = tick.tick() => {
                worker.tick().await;
            }
        }
    }

    // Watcher children run in their own process groups and survive a
    // worker shutdown; the dispatcher reconciles on re-registration.
    info!("Worker stopped");
    Ok(())
}

/// Maximum log file size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated log files to keep (worker.log.1, .2, .3).
const MAX_ROTATED_LOGS: u32 = 3;

/// Rotate the worker log file if it exceeds [`MAX_LOG_SIZE`].
///
/// Shifts `worker.log` → `worker.log.1` → `worker.log.2` →
/// `worker.log.3`, deleting the oldest. Best-effort: rotation
/// failures are silently ignored so the daemon still starts.
fn rotate_log_if_needed(log_path: &std::path::Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };

    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();

    // Shift older rotations: .3 is deleted, .2→.3, .1→.2
    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }

    // Rotate current log → .1
    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    // Create log directory if needed
    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Set up file appender (rotation happens at startup via rotate_log_if_needed)
    let file_appender = tracing_appender::rolling::never(
        config.log_path.parent().ok_or(LifecycleError::NoStateDir)?,
        config
            .log_path
            .file_name()
            .ok_or(LifecycleError::NoStateDir)?,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Set up subscriber with env filter
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}

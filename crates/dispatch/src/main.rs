// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Renderfarm Dispatcher Stub (rfdd)
//!
//! Minimal dispatcher peer: accepts worker registrations, heartbeats,
//! pause transitions and command deltas, and serves the read-only
//! operator summaries. Carries no scheduling policy; it exists for
//! operator visibility and as the integration peer for workers.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod listener;
mod state;

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use crate::state::DispatchState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("rfdd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("rfdd {}", env!("CARGO_PKG_VERSION"));
                println!("Renderfarm Dispatcher Stub - tracks render nodes and serves operator summaries");
                println!();
                println!("USAGE:");
                println!("    rfdd");
                println!();
                println!("Listens on RFD_PORT (default 8004).");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: rfdd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let port: u16 = std::env::var("RFD_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8004);

    let state = Arc::new(Mutex::new(DispatchState::new()));
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("dispatcher stub listening on port {}", port);

    // Signal ready for parent process
    println!("READY");

    axum::serve(listener, listener::router(state)).await?;
    Ok(())
}

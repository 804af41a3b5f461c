// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! rf: operator CLI for renderfarm workers.
//!
//! Thin HTTP client over a worker's control RPC and the dispatcher's
//! read-only summaries. Pausing through the CLI reaches the same code
//! path as the kill-file; the sentinel files remain the offline
//! fallback.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use rf_worker::{PausedBody, PerformanceBody};

#[derive(Parser)]
#[command(name = "rf", version, about = "Operator CLI for renderfarm workers")]
struct Cli {
    /// Worker control address (host:port)
    #[arg(long, global = true, default_value = "127.0.0.1:8000")]
    worker: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pause the worker (stops accepting commands)
    Pause {
        /// Also kill the running command watchers
        #[arg(long)]
        kill: bool,
    },
    /// Resume a paused worker
    Resume,
    /// Stop one command (kills its child, reports CANCELED)
    Stop {
        /// Command id
        id: u32,
    },
    /// Force a capability refresh and heartbeat
    Refresh,
    /// Record a performance index and forward it to the dispatcher
    Perf {
        /// Performance index (e.g. 1.7)
        performance: f64,
    },
    /// Show dispatcher statistics
    Stats {
        /// Dispatcher address (host:port)
        #[arg(long, default_value = "127.0.0.1:8004")]
        dispatcher: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Pause { kill } => {
            put_worker(
                &client,
                &cli.worker,
                "/paused/",
                &PausedBody {
                    paused: true,
                    killproc: kill,
                },
            )
            .await?;
            println!("worker {} paused{}", cli.worker, if kill { " (killed watchers)" } else { "" });
        }
        Commands::Resume => {
            put_worker(
                &client,
                &cli.worker,
                "/paused/",
                &PausedBody {
                    paused: false,
                    killproc: false,
                },
            )
            .await?;
            println!("worker {} resumed", cli.worker);
        }
        Commands::Stop { id } => {
            let url = format!("http://{}/commands/{}/", cli.worker, id);
            let response = client
                .delete(&url)
                .send()
                .await
                .with_context(|| format!("worker {} not reachable", cli.worker))?;
            check(response).await?;
            println!("command {} stopped", id);
        }
        Commands::Refresh => {
            let url = format!("http://{}/sysinfos/", cli.worker);
            let response = client
                .put(&url)
                .json(&serde_json::json!({}))
                .send()
                .await
                .with_context(|| format!("worker {} not reachable", cli.worker))?;
            check(response).await?;
            println!("capability refresh requested");
        }
        Commands::Perf { performance } => {
            put_worker(
                &client,
                &cli.worker,
                "/performance/",
                &PerformanceBody { performance },
            )
            .await?;
            println!("performance index set to {}", performance);
        }
        Commands::Stats { dispatcher } => {
            let url = format!("http://{}/stats/", dispatcher);
            let response = client
                .get(&url)
                .send()
                .await
                .with_context(|| format!("dispatcher {} not reachable", dispatcher))?;
            let stats: serde_json::Value = check(response).await?.json().await?;
            print_stats(&stats);
        }
    }

    Ok(())
}

async fn put_worker<T: serde::Serialize>(
    client: &reqwest::Client,
    worker: &str,
    path: &str,
    body: &T,
) -> Result<()> {
    let url = format!("http://{}{}", worker, path);
    let response = client
        .put(&url)
        .json(body)
        .send()
        .await
        .with_context(|| format!("worker {} not reachable", worker))?;
    check(response).await?;
    Ok(())
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
        .unwrap_or(body);
    bail!("{}: {}", status, message);
}

fn print_stats(stats: &serde_json::Value) {
    println!("commands:");
    if let Some(commands) = stats.get("commands").and_then(|c| c.as_object()) {
        for (status, count) in commands {
            if count.as_u64().unwrap_or(0) > 0 || status == "TOTAL" {
                println!("  {:<10} {}", status, count);
            }
        }
    }
    if let Some(nodes) = stats.get("rendernodes") {
        println!("render nodes:");
        println!("  total cores   {}", nodes["totalCores"]);
        println!("  idle cores    {}", nodes["idleCores"]);
        println!("  missing       {}", nodes["missingRenderNodes"]);
        if let Some(by_status) = nodes["renderNodesByStatus"].as_object() {
            for (status, count) in by_status {
                if count.as_u64().unwrap_or(0) > 0 {
                    println!("  {:<10} {}", status, count);
                }
            }
        }
    }
    if let Some(jobs) = stats.get("jobs") {
        println!("jobs: {}", jobs["total"]);
    }
    if let Some(licenses) = stats.get("licenses").and_then(|l| l.as_str()) {
        println!("licenses: {}", licenses);
    }
}

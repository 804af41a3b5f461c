//! Test helpers for behavioral specifications.
//!
//! Provides a harness that boots a dispatcher stub plus a worker
//! daemon in a private state directory and exposes HTTP helpers for
//! driving and observing them.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::io::{BufRead, BufReader};
use std::net::TcpListener;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

// Aggressive cadences for fast tests.
const SPEC_TICK_MS: &str = "20";
const SPEC_HEARTBEAT_MS: &str = "150";
const SPEC_REGISTER_RETRY_MS: &str = "50";
const SPEC_REQUEST_TIMEOUT_MS: &str = "2000";

/// Maximum time to wait for a polled condition.
pub const SPEC_WAIT_MAX: Duration = Duration::from_secs(10);
/// Poll interval.
pub const SPEC_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Returns the path to a binary built by this workspace.
/// Falls back to resolving relative to the test binary itself when
/// CARGO_MANIFEST_DIR is stale (e.g. a shared target directory).
fn binary_path(name: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    let standard = manifest_dir.join("target/debug").join(name);
    if standard.exists() {
        return standard;
    }

    // The test binary lives at target/debug/deps/specs-<hash>, so its
    // grandparent is target/debug/ where rfwd and rfdd are built.
    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join(name);
            if fallback.exists() {
                return fallback;
            }
        }
    }

    standard
}

pub fn rfwd_binary() -> PathBuf {
    binary_path("rfwd")
}

pub fn rfdd_binary() -> PathBuf {
    binary_path("rfdd")
}

pub fn rf_binary() -> PathBuf {
    binary_path("rf")
}

/// Reserve a free localhost port.
///
/// Racy by construction (the port is released before the daemon binds
/// it), but collisions are vanishingly rare with ephemeral ports and
/// the specs run serially.
fn free_port() -> u16 {
    let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
    listener.local_addr().unwrap().port()
}

/// Wait for a line equal to `READY` on the child's stdout.
fn wait_for_ready(child: &mut Child, what: &str) {
    let stdout = child.stdout.take().unwrap();
    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let mut reader = BufReader::new(stdout);
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) if line.trim() == "READY" => {
                    let _ = tx.send(());
                    break;
                }
                Ok(_) => continue,
                Err(_) => break,
            }
        }
    });
    rx.recv_timeout(SPEC_WAIT_MAX)
        .unwrap_or_else(|_| panic!("{what} did not report READY"));
}

/// A dispatcher stub plus a worker daemon in a private state dir.
pub struct Harness {
    pub state_dir: tempfile::TempDir,
    pub worker_port: u16,
    pub dispatcher_port: u16,
    dispatcher: Child,
    worker: Child,
}

impl Harness {
    /// Boot dispatcher and worker, waiting for both READY markers.
    pub fn boot() -> Self {
        let state_dir = tempfile::tempdir().unwrap();
        write_watcher_script(state_dir.path());

        let dispatcher_port = free_port();
        let mut dispatcher = Command::new(rfdd_binary())
            .env("RFD_PORT", dispatcher_port.to_string())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .unwrap();
        wait_for_ready(&mut dispatcher, "rfdd");

        let worker_port = free_port();
        let mut worker = Command::new(rfwd_binary())
            .env("RF_STATE_DIR", state_dir.path())
            .env("RF_PORT", worker_port.to_string())
            .env(
                "RF_DISPATCHER_URL",
                format!("http://127.0.0.1:{dispatcher_port}"),
            )
            .env(
                "RF_WATCHER_PROGRAM",
                state_dir.path().join("fake-watcher.sh"),
            )
            .env("RF_TICK_MS", SPEC_TICK_MS)
            .env("RF_HEARTBEAT_MS", SPEC_HEARTBEAT_MS)
            .env("RF_REGISTER_RETRY_MS", SPEC_REGISTER_RETRY_MS)
            .env("RF_REQUEST_TIMEOUT_MS", SPEC_REQUEST_TIMEOUT_MS)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .unwrap();
        wait_for_ready(&mut worker, "rfwd");

        Self {
            state_dir,
            worker_port,
            dispatcher_port,
            dispatcher,
            worker,
        }
    }

    pub fn worker_name(&self) -> String {
        format!("127.0.0.1:{}", self.worker_port)
    }

    pub fn worker_url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.worker_port, path)
    }

    pub fn dispatcher_url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.dispatcher_port, path)
    }

    pub fn kill_file(&self) -> PathBuf {
        self.state_dir.path().join("KILLFILE")
    }

    pub fn restart_file(&self) -> PathBuf {
        self.state_dir.path().join("RESTARTFILE")
    }

    /// Fetch `/stats/` from the dispatcher.
    pub async fn stats(&self) -> serde_json::Value {
        reqwest::get(self.dispatcher_url("/stats/"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        let _ = self.worker.kill();
        let _ = self.worker.wait();
        let _ = self.dispatcher.kill();
        let _ = self.dispatcher.wait();
    }
}

/// Inert stand-in for the runner-watcher helper: holds the child slot
/// open; progress reports come from the specs themselves.
fn write_watcher_script(dir: &Path) {
    let path = dir.join("fake-watcher.sh");
    std::fs::write(&path, "#!/bin/sh\nsleep 45\n").unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
}

/// Poll until a condition expression passes or the spec deadline
/// expires. A macro so the condition can await freely on locals.
macro_rules! wait_until {
    ($what:expr, $cond:expr) => {{
        let deadline = std::time::Instant::now() + $crate::prelude::SPEC_WAIT_MAX;
        loop {
            if $cond {
                break;
            }
            if std::time::Instant::now() > deadline {
                panic!("timed out waiting for {}", $what);
            }
            tokio::time::sleep($crate::prelude::SPEC_POLL_INTERVAL).await;
        }
    }};
}
pub(crate) use wait_until;

/// Minimal addCommand body.
pub fn command_body(id: u32) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "runner": "mock",
        "arguments": {},
        "validationExpression": "",
        "taskName": "spec",
        "relativeLogPath": "spec",
        "environment": {},
    })
}

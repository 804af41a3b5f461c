// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host capability probes.
//!
//! All probes are best-effort: missing data yields the documented
//! fallback (1 core, 1 MiB RAM, empty strings) and never an error.
//! Probes run only when a refresh is explicitly requested: at boot,
//! at registration, and on the sysinfos control RPC.

use std::path::PathBuf;
use std::time::Duration;

use tokio::process::Command;

use crate::subprocess::{run_with_timeout, GL_PROBE_TIMEOUT};

/// Vendor release file carrying MIK-VERSION / distribution lines.
const RELEASE_FILE: &str = "/etc/mik-release";

/// Probed node capabilities.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeInfo {
    /// Logical CPU count. Fallback: 1.
    pub cores: u32,
    /// Total physical RAM in MiB. Fallback: 1.
    pub ram_mib: u64,
    pub cpu_name: String,
    /// Base CPU clock in GHz, rounded to one decimal.
    pub clock_ghz: f64,
    /// Distribution label from the release file.
    pub distrib_name: String,
    /// Vendor (MIK) release tag from the release file.
    pub vendor_distrib: String,
    /// `d.d.d` extracted from `glxinfo` output.
    pub gl_version: String,
    /// Lowercased OS family (e.g. "linux").
    pub os: String,
}

impl Default for NodeInfo {
    fn default() -> Self {
        Self {
            cores: 1,
            ram_mib: 1,
            cpu_name: String::new(),
            clock_ghz: 1.0,
            distrib_name: String::new(),
            vendor_distrib: String::new(),
            gl_version: String::new(),
            os: std::env::consts::OS.to_string(),
        }
    }
}

/// Capability prober for the local host.
#[derive(Debug, Clone)]
pub struct SystemProbe {
    release_file: PathBuf,
    gl_timeout: Duration,
}

impl SystemProbe {
    pub fn new() -> Self {
        Self {
            release_file: PathBuf::from(RELEASE_FILE),
            gl_timeout: GL_PROBE_TIMEOUT,
        }
    }

    /// Probe with an alternate release file, for tests.
    pub fn with_release_file(release_file: impl Into<PathBuf>) -> Self {
        Self {
            release_file: release_file.into(),
            ..Self::new()
        }
    }

    /// Run every probe group and return a fresh capability record.
    pub async fn refresh(&self) -> NodeInfo {
        let mut info = NodeInfo::default();

        let mut sys = sysinfo::System::new();
        sys.refresh_memory();
        sys.refresh_cpu_all();

        let cores = sys.cpus().len() as u32;
        if cores > 0 {
            info.cores = cores;
        }
        let ram_mib = sys.total_memory() / (1024 * 1024);
        if ram_mib > 0 {
            info.ram_mib = ram_mib;
        }
        if let Some(cpu) = sys.cpus().first() {
            info.cpu_name = cpu.brand().trim().to_string();
            let mhz = cpu.frequency();
            if mhz > 0 {
                info.clock_ghz = (mhz as f64 / 100.0).round() / 10.0;
            }
        }

        if let Ok(contents) = std::fs::read_to_string(&self.release_file) {
            let (vendor, distrib) = parse_release(&contents);
            info.vendor_distrib = vendor;
            info.distrib_name = distrib;
        }

        info.gl_version = self.probe_gl_version().await.unwrap_or_default();

        tracing::debug!(
            cores = info.cores,
            ram_mib = info.ram_mib,
            cpu = %info.cpu_name,
            gl = %info.gl_version,
            "capability probe complete"
        );

        info
    }

    async fn probe_gl_version(&self) -> Option<String> {
        let cmd = Command::new("glxinfo");
        match run_with_timeout(cmd, self.gl_timeout, "glxinfo").await {
            Ok(output) => parse_gl_version(&String::from_utf8_lossy(&output.stdout)),
            Err(e) => {
                tracing::debug!("glxinfo probe skipped: {}", e);
                None
            }
        }
    }
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract `(vendor_distrib, distrib_name)` from a release file.
///
/// `MIK-VERSION`/`MIK-RELEASE` lines carry the vendor tag as their
/// second token; the first `openSUSE` line carries the distribution
/// label, either after `=` or as the whole line.
pub fn parse_release(contents: &str) -> (String, String) {
    let mut vendor = String::new();
    let mut distrib = String::new();

    for line in contents.lines() {
        if line.contains("MIK-VERSION") || line.contains("MIK-RELEASE") {
            if let Some(tag) = line.split_whitespace().nth(1) {
                vendor = tag.to_string();
            }
        } else if line.contains("openSUSE") {
            distrib = match line.split_once('=') {
                Some((_, value)) => value.trim().to_string(),
                None => line.trim().to_string(),
            };
            break;
        }
    }

    (vendor, distrib)
}

/// Pull the `d.d.d` version out of glxinfo output.
pub fn parse_gl_version(output: &str) -> Option<String> {
    let line = output
        .lines()
        .find(|line| line.contains("OpenGL version string"))?;
    let pattern = regex::Regex::new(r"(\d\.\d\.\d)").ok()?;
    pattern
        .find(line)
        .map(|version| version.as_str().to_string())
}

#[cfg(test)]
#[path = "introspect_tests.rs"]
mod tests;

//! Binary help/version specs.

use crate::prelude::*;
use std::process::Command;

#[test]
fn rfwd_version_prints_and_exits() {
    let output = Command::new(rfwd_binary()).arg("--version").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("rfwd "), "got: {stdout}");
}

#[test]
fn rfwd_help_describes_daemon() {
    let output = Command::new(rfwd_binary()).arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Renderfarm Worker Daemon"));
    assert!(stdout.contains("USAGE"));
}

#[test]
fn rfwd_rejects_unknown_argument() {
    let output = Command::new(rfwd_binary()).arg("--bogus").output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unexpected argument"));
}

#[test]
fn rfdd_version_prints_and_exits() {
    let output = Command::new(rfdd_binary()).arg("--version").output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("rfdd "));
}

#[test]
fn rf_help_lists_subcommands() {
    let output = Command::new(rf_binary()).arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for subcommand in ["pause", "resume", "stop", "refresh", "perf", "stats"] {
        assert!(stdout.contains(subcommand), "missing {subcommand}: {stdout}");
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    empty = { "", KillSwitch::Pause },
    zero = { "0", KillSwitch::Pause },
    kill = { "-1", KillSwitch::PauseAndKill },
    restart = { "-2", KillSwitch::PauseAndRestart },
    kill_restart = { "-3", KillSwitch::PauseKillAndRestart },
    trailing_newline = { "-1\n", KillSwitch::PauseAndKill },
    garbage = { "shutdown please", KillSwitch::Pause },
    positive = { "7", KillSwitch::Pause },
)]
fn kill_switch_parse(contents: &str, expected: KillSwitch) {
    assert_eq!(KillSwitch::parse(contents), expected);
}

#[parameterized(
    pause = { KillSwitch::Pause, false, false },
    kill = { KillSwitch::PauseAndKill, true, false },
    restart = { KillSwitch::PauseAndRestart, false, true },
    kill_restart = { KillSwitch::PauseKillAndRestart, true, true },
)]
fn kill_switch_flags(switch: KillSwitch, kills: bool, restarts: bool) {
    assert_eq!(switch.kill_watchers(), kills);
    assert_eq!(switch.restart(), restarts);
}

fn control_files(dir: &std::path::Path) -> ControlFiles {
    ControlFiles::new(dir.join("KILLFILE"), dir.join("RESTARTFILE"))
}

#[test]
fn poll_absent_kill_file() {
    let dir = tempfile::tempdir().unwrap();
    let files = control_files(dir.path());
    assert_eq!(files.poll(), None);
}

#[test]
fn poll_reads_flag() {
    let dir = tempfile::tempdir().unwrap();
    let files = control_files(dir.path());
    std::fs::write(dir.path().join("KILLFILE"), "-3").unwrap();
    assert_eq!(files.poll(), Some(KillSwitch::PauseKillAndRestart));
}

#[test]
fn poll_empty_file_pauses() {
    let dir = tempfile::tempdir().unwrap();
    let files = control_files(dir.path());
    std::fs::write(dir.path().join("KILLFILE"), "").unwrap();
    assert_eq!(files.poll(), Some(KillSwitch::Pause));
}

#[test]
fn restart_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let files = control_files(dir.path());
    assert!(!files.restart_file().exists());
    files.touch_restart_file().unwrap();
    assert!(files.restart_file().exists());
    // Idempotent.
    files.touch_restart_file().unwrap();
}

#[test]
fn restart_file_creates_parent_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let files = ControlFiles::new(
        dir.path().join("KILLFILE"),
        dir.path().join("render/restartfile"),
    );
    files.touch_restart_file().unwrap();
    assert!(files.restart_file().exists());
}

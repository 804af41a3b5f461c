// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory registry of active commands and their watchers.
//!
//! One entry per command, holding the command record and its
//! supervision record side by side (no back-references; both are
//! removed together). The worker loop is the registry's single
//! owner; every mutation funnels through it.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use rf_core::{Command, CommandId, CommandStatus, UpdateOutcome};

use crate::supervisor::WatcherProcess;

/// Supervision record for one in-flight command.
#[derive(Debug)]
pub struct CommandWatcher {
    pub command_id: CommandId,
    pub process: WatcherProcess,
    /// Monotonic spawn timestamp; timeouts count from here.
    pub start_time: Instant,
    pub timeout: Option<Duration>,
    /// Unsent changes pending; cleared when the dispatcher confirms
    /// the latest delta.
    pub modified: bool,
    /// Child exited or a terminal status was observed. A finished,
    /// unmodified watcher is eligible for removal.
    pub finished: bool,
}

impl CommandWatcher {
    /// A fresh watcher starts modified so its initial status is
    /// flushed to the dispatcher on the first update pass.
    pub fn new(
        command_id: CommandId,
        process: WatcherProcess,
        start_time: Instant,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            command_id,
            process,
            start_time,
            timeout,
            modified: true,
            finished: false,
        }
    }
}

/// Command plus watcher, stored as sibling records.
#[derive(Debug)]
pub struct Entry {
    pub command: Command,
    pub watcher: CommandWatcher,
}

/// commandId → (Command, CommandWatcher), keys always matching.
#[derive(Debug, Default)]
pub struct Registry {
    entries: BTreeMap<CommandId, Entry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, command: Command, watcher: CommandWatcher) {
        debug_assert_eq!(command.id, watcher.command_id);
        self.entries.insert(command.id, Entry { command, watcher });
    }

    pub fn remove(&mut self, id: CommandId) -> Option<Entry> {
        self.entries.remove(&id)
    }

    pub fn get(&self, id: CommandId) -> Option<&Entry> {
        self.entries.get(&id)
    }

    pub fn get_mut(&mut self, id: CommandId) -> Option<&mut Entry> {
        self.entries.get_mut(&id)
    }

    pub fn contains(&self, id: CommandId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entry> {
        self.entries.values_mut()
    }

    /// Watchers with unsent changes.
    pub fn modified_ids(&self) -> Vec<CommandId> {
        self.entries
            .values()
            .filter(|entry| entry.watcher.modified)
            .map(|entry| entry.watcher.command_id)
            .collect()
    }

    /// Watchers that are finished with nothing left to send,
    /// eligible for removal.
    pub fn finished_quiescent_ids(&self) -> Vec<CommandId> {
        self.entries
            .values()
            .filter(|entry| entry.watcher.finished && !entry.watcher.modified)
            .map(|entry| entry.watcher.command_id)
            .collect()
    }

    /// Apply a progress update to a command.
    ///
    /// Any update marks the watcher modified; entering a terminal
    /// status also marks it finished. Updates to a command already in
    /// a terminal status are dropped (CANCELED is absorbing).
    ///
    /// Returns `None` when the command is not registered.
    pub fn update_completion_and_status(
        &mut self,
        id: CommandId,
        completion: Option<f32>,
        status: Option<CommandStatus>,
        message: Option<String>,
    ) -> Option<UpdateOutcome> {
        let entry = self.entries.get_mut(&id)?;
        entry.watcher.modified = true;
        let outcome = entry.command.apply_update(completion, status, message);
        if let UpdateOutcome::Applied { terminal: true } = outcome {
            entry.watcher.finished = true;
        }
        Some(outcome)
    }

    /// Record validator output for a command. Returns false when the
    /// command is not registered.
    pub fn update_validation(
        &mut self,
        id: CommandId,
        validator_message: Option<String>,
        error_infos: Option<serde_json::Value>,
    ) -> bool {
        let Some(entry) = self.entries.get_mut(&id) else {
            return false;
        };
        entry.command.apply_validation(validator_message, error_infos);
        entry.watcher.modified = true;
        true
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory render-node table.
//!
//! Tracks what workers report: registrations, heartbeats, pause
//! state, and per-command deltas. Holds no scheduling state; command
//! entries appear here only because workers report them.

use std::collections::BTreeMap;

use rf_core::{
    CommandDelta, CommandId, PausedUpdate, RegisterPayload, SysInfoUpdate, WorkerStatus,
};

/// Everything known about one render node.
#[derive(Debug, Clone)]
pub struct NodeRecord {
    pub registration: RegisterPayload,
    pub status: WorkerStatus,
    pub paused: bool,
    pub performance: Option<f64>,
    pub commands: BTreeMap<CommandId, CommandDelta>,
}

/// Render-node table keyed by node name (`address:port`).
#[derive(Debug, Default)]
pub struct DispatchState {
    nodes: BTreeMap<String, NodeRecord>,
}

impl DispatchState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node. `false` when the name is already taken (409).
    pub fn register(&mut self, name: &str, payload: RegisterPayload) -> bool {
        if self.nodes.contains_key(name) {
            return false;
        }
        let status = payload.status;
        let commands = payload
            .commands
            .clone()
            .unwrap_or_default()
            .into_iter()
            .map(|delta| (delta.id, delta))
            .collect();
        self.nodes.insert(
            name.to_string(),
            NodeRecord {
                registration: payload,
                status,
                paused: false,
                performance: None,
                commands,
            },
        );
        true
    }

    /// Apply a sysinfos update. `false` when the node is unknown (404).
    pub fn update_sysinfos(&mut self, name: &str, update: &SysInfoUpdate) -> bool {
        let Some(node) = self.nodes.get_mut(name) else {
            return false;
        };
        if let Some(status) = update.status {
            node.status = status;
        }
        if let Some(performance) = update.performance {
            node.performance = Some(performance);
        }
        true
    }

    /// Record a command delta. `false` when the node is unknown (404).
    pub fn update_command(&mut self, name: &str, delta: CommandDelta) -> bool {
        let Some(node) = self.nodes.get_mut(name) else {
            return false;
        };
        node.commands.insert(delta.id, delta);
        true
    }

    /// Apply a pause transition. `false` when the node is unknown (404).
    pub fn set_paused(&mut self, name: &str, update: &PausedUpdate) -> bool {
        let Some(node) = self.nodes.get_mut(name) else {
            return false;
        };
        node.paused = update.paused;
        node.status = if update.paused {
            WorkerStatus::Paused
        } else {
            WorkerStatus::Idle
        };
        true
    }

    pub fn node(&self, name: &str) -> Option<&NodeRecord> {
        self.nodes.get(name)
    }

    /// Aggregate counters served at `/stats/`.
    pub fn stats(&self) -> serde_json::Value {
        let mut commands_by_status: BTreeMap<&'static str, usize> = BTreeMap::new();
        for status in COMMAND_STATUS_NAMES {
            commands_by_status.insert(status, 0);
        }
        let mut total_commands = 0usize;
        for node in self.nodes.values() {
            for delta in node.commands.values() {
                total_commands += 1;
                if let Some(status) = delta.status {
                    if let Some(count) = commands_by_status.get_mut(status.to_string().as_str()) {
                        *count += 1;
                    }
                }
            }
        }

        let mut nodes_by_status: BTreeMap<&'static str, usize> = BTreeMap::new();
        for status in WORKER_STATUS_NAMES {
            nodes_by_status.insert(status, 0);
        }
        let mut total_cores = 0u64;
        let mut idle_cores = 0u64;
        let mut missing = 0usize;
        for node in self.nodes.values() {
            if node.status == WorkerStatus::Unknown {
                missing += 1;
            } else {
                total_cores += u64::from(node.registration.cores);
                if node.status == WorkerStatus::Idle {
                    idle_cores += u64::from(node.registration.cores);
                }
            }
            if let Some(count) = nodes_by_status.get_mut(node.status.to_string().as_str()) {
                *count += 1;
            }
        }

        let mut commands = serde_json::Map::new();
        for (name, count) in &commands_by_status {
            commands.insert((*name).to_string(), serde_json::json!(count));
        }
        commands.insert("TOTAL".to_string(), serde_json::json!(total_commands));

        serde_json::json!({
            "commands": commands,
            "rendernodes": {
                "totalCores": total_cores,
                "idleCores": idle_cores,
                "missingRenderNodes": missing,
                "renderNodesByStatus": nodes_by_status,
            },
            "jobs": { "total": total_commands },
            "licenses": "no licenses in use",
        })
    }

    /// Small HTML summary served at `/mobile/`.
    pub fn mobile_html(&self) -> String {
        let stats = self.stats();
        let mut html = String::from(
            "<meta name = \"viewport\" content = \"width = device-width\">\n\
             <meta name = \"viewport\" content = \"width = 320\">\n",
        );
        html.push_str(&format!(
            "<p>render nodes: {}</p>\n",
            self.nodes.len()
        ));
        html.push_str(&format!(
            "<p>commands: {}</p>\n",
            stats["commands"]["TOTAL"]
        ));
        for (name, node) in &self.nodes {
            let mut line = format!("<p>{} &mdash; {}", name, node.status);
            if node.paused {
                line.push_str(" (paused)");
            }
            if let Some(performance) = node.performance {
                line.push_str(&format!(" perf {:.2}", performance));
            }
            line.push_str("</p>\n");
            html.push_str(&line);
        }
        html
    }
}

const COMMAND_STATUS_NAMES: [&str; 10] = [
    "BLOCKED",
    "READY",
    "ASSIGNED",
    "RUNNING",
    "FINISHING",
    "DONE",
    "CANCELED",
    "ERROR",
    "TIMEOUT",
    "PAUSED",
];

const WORKER_STATUS_NAMES: [&str; 5] = ["BOOTING", "IDLE", "RUNNING", "PAUSED", "UNKNOWN"];

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;

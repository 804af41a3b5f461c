// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker state machine.
//!
//! One `Worker` supervises every command assigned to this node. The
//! main loop is its only driver: control operations arrive through
//! [`crate::ops::WorkerOp`] and the reconciler tick runs the fixed
//! pass (sentinel sweep, zombie reap, update flush, removal sweep,
//! timeout enforcement, heartbeat). One monotonic `now` is taken per
//! tick.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use rf_adapters::{Dispatcher, DispatcherError, NodeInfo, SystemProbe};
use rf_core::{
    Caracteristics, Clock, Command, CommandDelta, CommandId, CommandSpec, CommandStatus,
    PausedUpdate, RegisterPayload, SysInfoUpdate, WorkerStatus,
};
use rf_engine::{reap_any, CommandWatcher, ControlFiles, Registry, Supervisor};

use crate::lifecycle::Config;
use crate::ops::{OpError, WorkerOp};
use crate::protocol::{CommandUpdateBody, PausedBody, PerformanceBody, ValidationBody};

pub struct Worker<D: Dispatcher, C: Clock> {
    config: Config,
    dispatcher: D,
    clock: C,
    probe: SystemProbe,
    pub(crate) supervisor: Supervisor,
    control: ControlFiles,
    pub(crate) registry: Registry,
    /// Render-node name, `address:port`.
    name: String,
    pub(crate) status: WorkerStatus,
    pub(crate) paused: bool,
    restart_pending: bool,
    /// Probe refresh requested (boot, registration, sysinfos RPC).
    update_sys: bool,
    node_info: NodeInfo,
    performance: Option<f64>,
    last_heartbeat: Option<Instant>,
}

impl<D: Dispatcher, C: Clock> Worker<D, C> {
    pub fn new(config: Config, dispatcher: D, clock: C) -> Self {
        let supervisor = Supervisor::new(
            &config.pid_dir,
            &config.log_root,
            &config.watcher_program,
            config.port,
        );
        let control = ControlFiles::new(&config.kill_file, &config.restart_file);
        let name = config.worker_name();

        Self {
            config,
            dispatcher,
            clock,
            probe: SystemProbe::new(),
            supervisor,
            control,
            registry: Registry::new(),
            name,
            status: WorkerStatus::Booting,
            paused: false,
            restart_pending: false,
            update_sys: true,
            node_info: NodeInfo::default(),
            performance: None,
            last_heartbeat: None,
        }
    }

    /// Probe with an alternate release file, for tests.
    #[cfg(test)]
    pub(crate) fn with_probe(mut self, probe: SystemProbe) -> Self {
        self.probe = probe;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // ------------------------------------------------------------------
    // Registration & heartbeat
    // ------------------------------------------------------------------

    /// Register this node with the dispatcher.
    ///
    /// Retries until the dispatcher answers; 409 means it already
    /// knows us and counts as success. Afterwards the kill-file
    /// decides the initial pause state and one heartbeat is emitted.
    pub async fn register(&mut self) {
        self.update_sys = true;
        self.refresh_node_info().await;

        loop {
            let payload = self.registration_payload();
            info!("registering with dispatcher as {}", self.name);
            match self.dispatcher.register(&self.name, &payload).await {
                Ok(()) => {
                    info!("worker registered");
                    break;
                }
                Err(DispatcherError::Conflict) => {
                    info!("worker already registered");
                    break;
                }
                Err(DispatcherError::Transient(e)) => {
                    warn!(
                        "dispatcher {} not reachable, will retry: {}",
                        self.config.dispatcher_url, e
                    );
                }
                Err(e) => {
                    warn!("worker registration failed, will retry: {}", e);
                }
            }
            tokio::time::sleep(self.config.register_retry_delay).await;
        }

        // Establish the pause state the kill-file demands before the
        // first heartbeat goes out.
        if self.control.kill_file_present() {
            self.pause_worker(true, false).await;
        } else {
            self.pause_worker(false, false).await;
        }

        if let Err(e) = self.send_status_heartbeat().await {
            warn!("initial heartbeat failed: {}", e);
        }

        // A re-registering worker restores its recorded performance
        // index; the dispatcher lost it along with the node entry.
        if let Some(performance) = self.performance {
            let body = SysInfoUpdate::performance(performance);
            if let Err(e) = self.dispatcher.send_sysinfos(&self.name, &body).await {
                warn!("failed to restore performance index: {}", e);
            }
        }
    }

    fn registration_payload(&self) -> RegisterPayload {
        let commands: Vec<CommandDelta> = self
            .registry
            .iter()
            .map(|entry| CommandDelta::from_command(&entry.command))
            .collect();

        RegisterPayload {
            cores: self.node_info.cores,
            ram: self.node_info.ram_mib,
            caracteristics: Caracteristics {
                os: self.node_info.os.clone(),
                softs: Vec::new(),
                cpuname: self.node_info.cpu_name.clone(),
                distribname: self.node_info.distrib_name.clone(),
                mikdistrib: self.node_info.vendor_distrib.clone(),
                openglversion: self.node_info.gl_version.clone(),
            },
            name: self.name.clone(),
            port: self.config.port,
            status: self.status,
            pools: Vec::new(),
            speed: self.node_info.clock_ghz,
            commands: if commands.is_empty() {
                None
            } else {
                Some(commands)
            },
        }
    }

    async fn refresh_node_info(&mut self) {
        if self.update_sys {
            self.node_info = self.probe.refresh().await;
            self.update_sys = false;
        }
    }

    /// Send a `{status}` heartbeat. Suppressed while paused; the
    /// dispatcher already learned of the pause via the paused PUT.
    async fn send_status_heartbeat(&mut self) -> Result<(), DispatcherError> {
        if self.status == WorkerStatus::Paused {
            return Ok(());
        }
        self.dispatcher
            .send_sysinfos(&self.name, &SysInfoUpdate::status(self.status))
            .await
    }

    fn heartbeat_due(&self, now: Instant) -> bool {
        match self.last_heartbeat {
            None => true,
            Some(last) => now.duration_since(last) >= self.config.heartbeat_period,
        }
    }

    // ------------------------------------------------------------------
    // Pause
    // ------------------------------------------------------------------

    /// Tell the dispatcher about a pause transition; local state only
    /// changes once the dispatcher confirms. A failed PUT is retried
    /// by the next tick's sentinel sweep.
    async fn pause_worker(&mut self, paused: bool, killproc: bool) {
        let update = PausedUpdate { paused, killproc };
        match self.dispatcher.set_paused(&self.name, &update).await {
            Ok(()) => {
                if paused {
                    self.paused = true;
                    self.status = WorkerStatus::Paused;
                    info!("worker has been put in paused mode");
                } else {
                    self.paused = false;
                    self.status = if self.registry.is_empty() {
                        WorkerStatus::Idle
                    } else {
                        WorkerStatus::Running
                    };
                    info!("worker awakes from paused mode");
                }
            }
            Err(e) => {
                warn!("paused update failed, will retry next tick: {}", e);
            }
        }
    }

    fn kill_all_watchers(&mut self) {
        for entry in self.registry.iter_mut() {
            warn!(command_id = %entry.watcher.command_id, "aborting command");
            self.supervisor.kill(&entry.watcher.process);
            entry.watcher.finished = true;
        }
    }

    // ------------------------------------------------------------------
    // Control operations
    // ------------------------------------------------------------------

    pub async fn handle_op(&mut self, op: WorkerOp) {
        match op {
            WorkerOp::AddCommand { spec, reply } => {
                let result = self.add_command(spec);
                let _ = reply.send(result);
            }
            WorkerOp::StopCommand { id, reply } => {
                let _ = reply.send(self.stop_command(id));
            }
            WorkerOp::UpdateCommand { id, update, reply } => {
                let _ = reply.send(self.update_command(id, update));
            }
            WorkerOp::UpdateValidation { id, update, reply } => {
                let _ = reply.send(self.update_validation(id, update));
            }
            WorkerOp::RefreshSysInfos { reply } => {
                let _ = reply.send(Ok(()));
                self.refresh_sysinfos().await;
            }
            WorkerOp::SetPerformance { update, reply } => {
                let _ = reply.send(Ok(()));
                self.set_performance(update).await;
            }
            WorkerOp::SetPaused { update, reply } => {
                let _ = reply.send(Ok(()));
                self.apply_pause_request(update).await;
            }
        }
    }

    /// `addCommand`: create the command and spawn its watcher.
    /// Rejected while paused; spawn failure leaves no trace.
    fn add_command(&mut self, spec: CommandSpec) -> Result<(), OpError> {
        if self.paused {
            return Err(OpError::WorkerPaused);
        }
        if self.registry.contains(spec.id) {
            return Err(OpError::DuplicateCommand(spec.id));
        }

        let mut command = Command::new(&spec);
        let process = self
            .supervisor
            .spawn(&command)
            .map_err(|e| OpError::Spawn(e.to_string()))?;

        command.apply_update(None, Some(CommandStatus::Running), None);
        let timeout = spec
            .timeout
            .filter(|t| t.is_finite() && *t >= 0.0)
            .map(Duration::from_secs_f64);
        let watcher = CommandWatcher::new(spec.id, process, self.clock.now(), timeout);
        self.registry.insert(command, watcher);
        self.status = WorkerStatus::Running;

        info!(
            command_id = %spec.id,
            runner = %spec.runner,
            "added command"
        );
        Ok(())
    }

    /// `stopCommand`: kill the child and cancel with completion 0.
    fn stop_command(&mut self, id: CommandId) -> Result<(), OpError> {
        let Some(entry) = self.registry.get(id) else {
            return Err(OpError::UnknownCommand(id));
        };
        self.supervisor.kill(&entry.watcher.process);
        self.registry.update_completion_and_status(
            id,
            Some(0.0),
            Some(CommandStatus::Canceled),
            Some("killed".to_string()),
        );
        info!(command_id = %id, "stopped command");
        Ok(())
    }

    /// `updateCommand`: progress report from the command watcher.
    fn update_command(&mut self, id: CommandId, update: CommandUpdateBody) -> Result<(), OpError> {
        match self.registry.update_completion_and_status(
            id,
            update.completion,
            update.status,
            update.message.clone(),
        ) {
            Some(_) => {
                debug!(
                    command_id = %id,
                    status = ?update.status,
                    completion = ?update.completion,
                    "updated command"
                );
                Ok(())
            }
            None => {
                warn!(command_id = %id, "update for unregistered command");
                Err(OpError::UnknownCommand(id))
            }
        }
    }

    /// `updateValidation`: validator verdict from the runner.
    fn update_validation(&mut self, id: CommandId, update: ValidationBody) -> Result<(), OpError> {
        if self
            .registry
            .update_validation(id, update.validator_message, update.error_infos)
        {
            Ok(())
        } else {
            Err(OpError::UnknownCommand(id))
        }
    }

    /// `PUT /sysinfos/`: force a capability refresh and heartbeat.
    async fn refresh_sysinfos(&mut self) {
        self.update_sys = true;
        self.refresh_node_info().await;
        match self.send_status_heartbeat().await {
            Ok(()) => {}
            Err(DispatcherError::NotFound) => self.register().await,
            Err(e) => warn!("sysinfos update failed: {}", e),
        }
    }

    /// `PUT /performance/`: record the index and forward it.
    async fn set_performance(&mut self, update: PerformanceBody) {
        self.performance = Some(update.performance);
        let body = SysInfoUpdate::performance(update.performance);
        match self.dispatcher.send_sysinfos(&self.name, &body).await {
            Ok(()) => {}
            Err(DispatcherError::NotFound) => {
                // Dispatcher forgot us; registration resends the
                // recorded index.
                self.register().await;
            }
            Err(e) => warn!("performance update failed: {}", e),
        }
    }

    /// `PUT /paused/`: programmatic pause, optionally killing children.
    async fn apply_pause_request(&mut self, update: PausedBody) {
        if update.paused {
            if update.killproc {
                self.kill_all_watchers();
            }
            self.pause_worker(true, update.killproc).await;
        } else {
            self.pause_worker(false, false).await;
        }
    }

    // ------------------------------------------------------------------
    // Reconciler tick
    // ------------------------------------------------------------------

    pub async fn tick(&mut self) {
        let now = self.clock.now();

        // 1. Sentinel sweep
        self.sentinel_sweep().await;

        // 2. Zombie reap
        while let Some(reaped) = reap_any() {
            debug!(pid = reaped.pid, detail = %reaped.detail, "cleaned up child process");
        }

        // 3. Pending updates flush
        self.flush_updates().await;

        // 4. Removal sweep
        for id in self.registry.finished_quiescent_ids() {
            info!(command_id = %id, "removing finished command watcher");
            self.remove_watcher(id);
        }

        // 5. Timeout enforcement
        self.enforce_timeouts(now);

        // 6. Heartbeat
        if self.heartbeat_due(now) {
            match self.send_status_heartbeat().await {
                Ok(()) => {}
                Err(DispatcherError::NotFound) => {
                    warn!("dispatcher no longer knows this worker, re-registering");
                    self.register().await;
                }
                Err(e) => warn!("heartbeat failed: {}", e),
            }
            self.last_heartbeat = Some(now);
        }
    }

    async fn sentinel_sweep(&mut self) {
        match self.control.poll() {
            Some(switch) => {
                if !self.paused {
                    warn!("kill-file detected, pausing worker");
                    if switch.kill_watchers() {
                        warn!("kill flag set, aborting all watchers");
                        self.kill_all_watchers();
                    }
                    if switch.restart() {
                        warn!("restart flag set, scheduling restart");
                        self.restart_pending = true;
                    }
                    self.pause_worker(true, switch.kill_watchers()).await;
                }
            }
            None => {
                self.restart_pending = false;
                if self.paused {
                    self.pause_worker(false, false).await;
                }
            }
        }

        // Paused and marked for restart: signal the external
        // supervisor through the restart file.
        if self.paused && self.restart_pending {
            warn!("worker paused for restart, emitting restart file");
            if let Err(e) = self.control.touch_restart_file() {
                warn!("failed to write restart file: {}", e);
            }
        }
    }

    /// PUT the delta of every modified watcher. 200 clears the flag,
    /// 404 drops the watcher as stale, anything else retries next
    /// tick.
    async fn flush_updates(&mut self) {
        for id in self.registry.modified_ids() {
            let Some(delta) = self
                .registry
                .get(id)
                .map(|entry| CommandDelta::from_command(&entry.command))
            else {
                continue;
            };
            match self.dispatcher.update_command(&self.name, id, &delta).await {
                Ok(()) => {
                    if let Some(entry) = self.registry.get_mut(id) {
                        entry.watcher.modified = false;
                    }
                }
                Err(DispatcherError::NotFound) => {
                    warn!(command_id = %id, "removing stale command");
                    self.remove_watcher(id);
                }
                Err(e) => {
                    warn!(command_id = %id, "command update failed, will retry: {}", e);
                }
            }
        }
    }

    fn remove_watcher(&mut self, id: CommandId) {
        self.supervisor.remove_pid_file(id);
        self.registry.remove(id);
        if self.registry.is_empty() && !self.paused {
            self.status = WorkerStatus::Idle;
        }
    }

    /// Cancel RUNNING commands whose wall-clock budget is spent. The
    /// status change flushes on the next update pass; completion is
    /// left untouched.
    fn enforce_timeouts(&mut self, now: Instant) {
        let mut expired = Vec::new();
        for entry in self.registry.iter() {
            if entry.command.status != CommandStatus::Running {
                continue;
            }
            if let Some(timeout) = entry.watcher.timeout {
                if now.duration_since(entry.watcher.start_time) > timeout {
                    expired.push(entry.command.id);
                }
            }
        }

        for id in expired {
            warn!(command_id = %id, "timeout reached, canceling command");
            if let Some(entry) = self.registry.get(id) {
                self.supervisor.kill(&entry.watcher.process);
            }
            self.registry
                .update_completion_and_status(id, None, Some(CommandStatus::Canceled), None);
        }
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;

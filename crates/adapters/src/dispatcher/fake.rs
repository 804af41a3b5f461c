// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake dispatcher adapter for testing

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use rf_core::{CommandDelta, CommandId, PausedUpdate, RegisterPayload, SysInfoUpdate};

use super::{Dispatcher, DispatcherError};

/// Recorded dispatcher call
#[derive(Debug, Clone)]
pub enum DispatcherCall {
    Register {
        name: String,
        payload: RegisterPayload,
    },
    SysInfos {
        name: String,
        update: SysInfoUpdate,
    },
    UpdateCommand {
        name: String,
        id: CommandId,
        delta: CommandDelta,
    },
    SetPaused {
        name: String,
        update: PausedUpdate,
    },
}

#[derive(Default)]
struct FakeDispatcherState {
    calls: Vec<DispatcherCall>,
    register_results: VecDeque<Result<(), DispatcherError>>,
    sysinfo_results: VecDeque<Result<(), DispatcherError>>,
    update_results: VecDeque<Result<(), DispatcherError>>,
    paused_results: VecDeque<Result<(), DispatcherError>>,
}

/// Scriptable in-memory dispatcher double.
///
/// Every method succeeds unless a result has been queued for it;
/// queued results are consumed in FIFO order.
#[derive(Clone, Default)]
pub struct FakeDispatcher {
    inner: Arc<Mutex<FakeDispatcherState>>,
}

impl FakeDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the outcome of the next `register` call.
    pub fn queue_register(&self, result: Result<(), DispatcherError>) {
        self.inner.lock().register_results.push_back(result);
    }

    /// Queue the outcome of the next `send_sysinfos` call.
    pub fn queue_sysinfos(&self, result: Result<(), DispatcherError>) {
        self.inner.lock().sysinfo_results.push_back(result);
    }

    /// Queue the outcome of the next `update_command` call.
    pub fn queue_update(&self, result: Result<(), DispatcherError>) {
        self.inner.lock().update_results.push_back(result);
    }

    /// Queue the outcome of the next `set_paused` call.
    pub fn queue_paused(&self, result: Result<(), DispatcherError>) {
        self.inner.lock().paused_results.push_back(result);
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<DispatcherCall> {
        self.inner.lock().calls.clone()
    }

    /// Command deltas sent so far, in order.
    pub fn command_deltas(&self) -> Vec<CommandDelta> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                DispatcherCall::UpdateCommand { delta, .. } => Some(delta.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of registration attempts seen.
    pub fn register_count(&self) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|call| matches!(call, DispatcherCall::Register { .. }))
            .count()
    }
}

#[async_trait]
impl Dispatcher for FakeDispatcher {
    async fn register(
        &self,
        name: &str,
        payload: &RegisterPayload,
    ) -> Result<(), DispatcherError> {
        let mut state = self.inner.lock();
        state.calls.push(DispatcherCall::Register {
            name: name.to_string(),
            payload: payload.clone(),
        });
        state.register_results.pop_front().unwrap_or(Ok(()))
    }

    async fn send_sysinfos(
        &self,
        name: &str,
        update: &SysInfoUpdate,
    ) -> Result<(), DispatcherError> {
        let mut state = self.inner.lock();
        state.calls.push(DispatcherCall::SysInfos {
            name: name.to_string(),
            update: update.clone(),
        });
        state.sysinfo_results.pop_front().unwrap_or(Ok(()))
    }

    async fn update_command(
        &self,
        name: &str,
        id: CommandId,
        delta: &CommandDelta,
    ) -> Result<(), DispatcherError> {
        let mut state = self.inner.lock();
        state.calls.push(DispatcherCall::UpdateCommand {
            name: name.to_string(),
            id,
            delta: delta.clone(),
        });
        state.update_results.pop_front().unwrap_or(Ok(()))
    }

    async fn set_paused(
        &self,
        name: &str,
        update: &PausedUpdate,
    ) -> Result<(), DispatcherError> {
        let mut state = self.inner.lock();
        state.calls.push(DispatcherCall::SetPaused {
            name: name.to_string(),
            update: *update,
        });
        state.paused_results.pop_front().unwrap_or(Ok(()))
    }
}

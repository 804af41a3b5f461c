// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control operations queued for the worker loop.
//!
//! RPC handlers run on listener tasks and never touch the registry:
//! each operation is enqueued here with a oneshot responder and the
//! worker loop (the registry's only mutator) replies after applying
//! it.

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use rf_core::{CommandId, CommandSpec};

use crate::protocol::{CommandUpdateBody, PausedBody, PerformanceBody, ValidationBody};

/// Operation failures reported back to the RPC caller.
#[derive(Debug, Clone, Error)]
pub enum OpError {
    #[error("worker is paused")]
    WorkerPaused,

    #[error("unknown command {0}")]
    UnknownCommand(CommandId),

    #[error("command {0} is already registered")]
    DuplicateCommand(CommandId),

    #[error("failed to spawn command watcher: {0}")]
    Spawn(String),

    #[error("worker is shutting down")]
    Unavailable,
}

/// Reply channel for one operation.
pub type Reply = oneshot::Sender<Result<(), OpError>>;

/// One queued control operation.
#[derive(Debug)]
pub enum WorkerOp {
    AddCommand {
        spec: CommandSpec,
        reply: Reply,
    },
    StopCommand {
        id: CommandId,
        reply: Reply,
    },
    UpdateCommand {
        id: CommandId,
        update: CommandUpdateBody,
        reply: Reply,
    },
    UpdateValidation {
        id: CommandId,
        update: ValidationBody,
        reply: Reply,
    },
    RefreshSysInfos {
        reply: Reply,
    },
    SetPerformance {
        update: PerformanceBody,
        reply: Reply,
    },
    SetPaused {
        update: PausedBody,
        reply: Reply,
    },
}

/// Sender half handed to the RPC listener.
#[derive(Clone)]
pub struct OpQueue {
    tx: mpsc::Sender<WorkerOp>,
}

impl OpQueue {
    pub fn new(tx: mpsc::Sender<WorkerOp>) -> Self {
        Self { tx }
    }

    /// Enqueue an operation and wait for the worker loop's verdict.
    pub async fn submit<F>(&self, make_op: F) -> Result<(), OpError>
    where
        F: FnOnce(Reply) -> WorkerOp,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(make_op(reply_tx))
            .await
            .map_err(|_| OpError::Unavailable)?;
        reply_rx.await.map_err(|_| OpError::Unavailable)?
    }
}

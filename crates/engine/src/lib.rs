// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rf-engine: worker mechanics. Child-process supervision, the
//! command registry, and the operator control files.

pub mod registry;
pub mod sentinel;
pub mod supervisor;

pub use registry::{CommandWatcher, Entry, Registry};
pub use sentinel::{ControlFiles, KillSwitch};
pub use supervisor::{reap_any, ReapedChild, SpawnError, Supervisor, WatcherProcess};

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Renderfarm worker daemon library
//!
//! This module exposes the control-RPC protocol types for use by
//! operator tooling (the `rf` CLI).

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod protocol;

pub use protocol::{Ack, CommandUpdateBody, PausedBody, PerformanceBody, ValidationBody};

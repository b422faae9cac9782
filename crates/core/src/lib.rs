// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session/command core for Centaurx: the Scrollback Buffer, Event Bus,
//! Service, Runner Provider contract, and Command Handler. No
//! networking lives here — the `centaurx` server crate wires these onto
//! an SSH front door.

pub mod auth;
pub mod command;
pub mod error;
pub mod event_bus;
pub mod model;
pub mod runner;
pub mod scrollback;
pub mod service;
pub mod usage_cache;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use error::{CentaurxError, Result};
pub use model::SYSTEM_SHELL_TAB_ID;

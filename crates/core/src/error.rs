// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unified error kinds shared across the Command Handler, Service, and
//! Runner Provider.

use thiserror::Error;

/// Semantic error kinds produced by the session/command core.
///
/// Mirrors the error-handling design in the core specification: each
/// variant maps to exactly one recovery policy at the call site (return
/// to the caller, log-and-abort, or silent-drop).
#[derive(Debug, Error)]
pub enum CentaurxError {
    #[error("usage: {0}")]
    InvalidUsage(String),

    #[error("{0}")]
    NotFound(String),

    #[error("tab busy")]
    TabBusy,

    #[error("{0} not configured")]
    Unconfigured(&'static str),

    #[error("runner error: {0}")]
    RunnerFailure(String),

    #[error("agent error: {0}")]
    AgentFailure(String),

    #[error("canceled")]
    Canceled,

    #[error("io error: {0}")]
    Io(String),
}

impl CentaurxError {
    /// Stable wire-format tag, used in audit/debug logs and tests.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidUsage(_) => "invalid_usage",
            Self::NotFound(_) => "not_found",
            Self::TabBusy => "tab_busy",
            Self::Unconfigured(_) => "unconfigured",
            Self::RunnerFailure(_) => "runner_failure",
            Self::AgentFailure(_) => "agent_failure",
            Self::Canceled => "canceled",
            Self::Io(_) => "io",
        }
    }

    /// True for errors that should be appended to the tab's buffer as
    /// `error: <msg>` in addition to being returned to the caller.
    ///
    /// `Canceled` is explicitly excluded: spec §7 says cancellation
    /// produces no buffer noise.
    pub fn visible_in_buffer(&self) -> bool {
        !matches!(self, Self::Canceled)
    }
}

pub type Result<T> = std::result::Result<T, CentaurxError>;

impl From<std::io::Error> for CentaurxError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;

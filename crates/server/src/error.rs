// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server-level error codes: the SSH front door and its concrete stores
//! fail in ways the core library's [`centaurx_core::CentaurxError`]
//! doesn't model (auth rejection, host-key I/O, persistence corruption).

use serde::{Deserialize, Serialize};

/// Unified error codes for the server crate's own failure modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerErrorCode {
    AuthRejected,
    PtyRequired,
    HostKeyIo,
    PersistenceCorrupt,
    Internal,
}

impl ServerErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthRejected => "AUTH_REJECTED",
            Self::PtyRequired => "PTY_REQUIRED",
            Self::HostKeyIo => "HOST_KEY_IO",
            Self::PersistenceCorrupt => "PERSISTENCE_CORRUPT",
            Self::Internal => "INTERNAL",
        }
    }
}

impl std::fmt::Display for ServerErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("authentication rejected")]
    AuthRejected,
    #[error("pty required")]
    PtyRequired,
    #[error("host key error: {0}")]
    HostKeyIo(String),
    #[error("persisted state is corrupt: {0}")]
    PersistenceCorrupt(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn code(&self) -> ServerErrorCode {
        match self {
            Self::AuthRejected => ServerErrorCode::AuthRejected,
            Self::PtyRequired => ServerErrorCode::PtyRequired,
            Self::HostKeyIo(_) => ServerErrorCode::HostKeyIo,
            Self::PersistenceCorrupt(_) => ServerErrorCode::PersistenceCorrupt,
            Self::Internal(_) => ServerErrorCode::Internal,
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;

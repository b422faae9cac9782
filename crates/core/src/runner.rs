// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runner Provider and command/agent execution contract.
//!
//! A `Runner` is a per-user sandboxed container. Acquisition (via
//! [`RunnerProvider::runner_for`]) is the only suspension point; once
//! obtained, a runner supports many concurrent exec/agent streams.
//! Containers themselves, and the agent binary they host, are out of
//! scope (spec §1) — this module only defines the contract the rest of
//! the core consumes.
//!
//! Trait objects here return manually-boxed futures (no `async-trait`),
//! matching `Detector` in the teacher's driver module.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::model::{RunnerInfo, UsageInfo, UserId};

/// Key identifying which runner (and, for logging, which tab) a call is for.
#[derive(Debug, Clone)]
pub struct RunnerKey {
    pub user_id: UserId,
    pub tab_id: String,
}

/// Errors specific to runner acquisition and execution.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RunnerError {
    #[error("runner unavailable: {0}")]
    Unavailable(String),
    #[error("canceled")]
    Canceled,
    #[error("image pull failed: {0}")]
    ImagePullFailed(String),
}

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A request to run a shell command inside a runner.
#[derive(Debug, Clone)]
pub struct RunCommandRequest {
    pub working_dir: String,
    pub command: String,
    pub use_shell: bool,
    pub ssh_auth_sock: String,
}

/// A request to drive the agent inside a runner.
#[derive(Debug, Clone)]
pub struct AgentRunRequest {
    pub prompt: String,
    pub model: String,
    pub resume_session_id: String,
    pub json: bool,
}

/// Which stream a line of shell output arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// One chunk of streamed shell output.
#[derive(Debug, Clone)]
pub struct OutputLine {
    pub stream: Stream,
    pub text: String,
}

/// Typed events yielded by an agent turn.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    AgentMessage { text: String },
    ItemOutput { text: String },
    TurnCompleted,
    TurnFailed { reason: String },
    Error { message: String },
}

/// Exit outcome of a completed command.
#[derive(Debug, Clone, Copy)]
pub struct ExitResult {
    pub exit_code: i32,
}

/// A single in-flight execution (shell command or agent turn).
///
/// Object-safe: `Box<dyn Handle>` is held by the Command Tracker so
/// `/stop` can find and cancel it.
pub trait Handle: Send {
    /// Pull the next output line. `None` signals EOF.
    fn next_output(&mut self) -> BoxFuture<'_, Option<OutputLine>>;

    /// Pull the next agent event. `None` signals the stream ended.
    fn next_event(&mut self) -> BoxFuture<'_, Option<AgentEvent>>;

    /// Wait for process exit. Safe to call after EOF.
    fn wait(&mut self) -> BoxFuture<'_, ExitResult>;

    /// Idempotent: cancels the underlying execution.
    fn close(&mut self);
}

/// Reads current quota/usage windows for a user. Optional capability —
/// not every runner backend can report usage.
pub trait UsageReader: Send + Sync {
    fn usage(&self, user_id: &UserId) -> BoxFuture<'_, Result<UsageInfo, RunnerError>>;
}

/// A live, acquired runner.
pub trait Runner: Send + Sync {
    fn run_command(&self, req: RunCommandRequest) -> BoxFuture<'_, Result<Box<dyn Handle>, RunnerError>>;
    fn run(&self, req: AgentRunRequest) -> BoxFuture<'_, Result<Box<dyn Handle>, RunnerError>>;
    fn usage_reader(&self) -> Option<&dyn UsageReader> {
        None
    }
}

/// Acquires (lazily starting) per-user runtime containers.
///
/// Idempotent per user: repeated calls for the same user return the
/// same live runner until it exits.
pub trait RunnerProvider: Send + Sync {
    fn runner_for(&self, key: RunnerKey) -> BoxFuture<'_, Result<(std::sync::Arc<dyn Runner>, RunnerInfo), RunnerError>>;
}

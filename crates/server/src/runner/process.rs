// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A `Runner`/`RunnerProvider` pair backed by local OS processes rather
//! than a per-user container. Host and in-container paths are identical
//! here (`RunnerInfo::repo_root == config repo_root`), so the Command
//! Handler's host-to-container path mapping (spec §4.2.1) is a no-op.
//!
//! Shell output streaming mirrors `coop::driver::process::ProcessMonitor`'s
//! shape: an `mpsc` channel fed by a spawned task, drained by the
//! `Handle` on the other end.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;

use centaurx_core::model::{RunnerInfo, UserId};
use centaurx_core::runner::{
    AgentEvent, AgentRunRequest, BoxFuture, ExitResult, Handle, OutputLine, Runner, RunnerError, RunnerKey, RunnerProvider, Stream as OutputStream,
};
use parking_lot::RwLock;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Child;
use tokio::sync::mpsc;
use tracing::warn;

/// A running (or exited, not yet waited-on) child process, exposed as a
/// [`Handle`].
pub struct ProcessHandle {
    child: Option<Child>,
    output_rx: Option<mpsc::Receiver<OutputLine>>,
    events_rx: Option<mpsc::Receiver<AgentEvent>>,
}

impl Handle for ProcessHandle {
    fn next_output(&mut self) -> BoxFuture<'_, Option<OutputLine>> {
        Box::pin(async move {
            match self.output_rx.as_mut() {
                Some(rx) => rx.recv().await,
                None => None,
            }
        })
    }

    fn next_event(&mut self) -> BoxFuture<'_, Option<AgentEvent>> {
        Box::pin(async move {
            match self.events_rx.as_mut() {
                Some(rx) => rx.recv().await,
                None => None,
            }
        })
    }

    fn wait(&mut self) -> BoxFuture<'_, ExitResult> {
        Box::pin(async move {
            match self.child.as_mut() {
                Some(child) => {
                    let status = child.wait().await;
                    let code = status.ok().and_then(|s| s.code()).unwrap_or(-1);
                    ExitResult { exit_code: code }
                }
                None => ExitResult { exit_code: 0 },
            }
        })
    }

    fn close(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.start_kill();
        }
    }
}

/// One user's process-based runner. Stateless beyond the SSH-agent
/// socket path, since every command is its own process.
pub struct ProcessRunner {
    ssh_auth_sock: String,
    /// Path to the agent binary invoked by [`Runner::run`]. `None` means
    /// agent turns always fail with `Unavailable` — the agent binary is
    /// out of scope for this crate (spec §1) and must be supplied by the
    /// deployment.
    agent_binary: Option<String>,
}

impl ProcessRunner {
    fn new(ssh_auth_sock: String, agent_binary: Option<String>) -> Self {
        Self { ssh_auth_sock, agent_binary }
    }
}

fn spawn_output_pump(mut cmd: tokio::process::Command) -> Result<(Child, mpsc::Receiver<OutputLine>), RunnerError> {
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    let mut child = cmd.spawn().map_err(|e| RunnerError::Unavailable(e.to_string()))?;

    let (tx, rx) = mpsc::channel(256);
    let stdout = child.stdout.take().ok_or_else(|| RunnerError::Unavailable("no stdout pipe".to_string()))?;
    let stderr = child.stderr.take().ok_or_else(|| RunnerError::Unavailable("no stderr pipe".to_string()))?;

    let stdout_tx = tx.clone();
    tokio::spawn(async move {
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if stdout_tx.send(OutputLine { stream: OutputStream::Stdout, text: line }).await.is_err() {
                break;
            }
        }
    });
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(OutputLine { stream: OutputStream::Stderr, text: line }).await.is_err() {
                break;
            }
        }
    });

    Ok((child, rx))
}

impl Runner for ProcessRunner {
    fn run_command(&self, req: centaurx_core::runner::RunCommandRequest) -> BoxFuture<'_, Result<Box<dyn Handle>, RunnerError>> {
        Box::pin(async move {
            let mut cmd = if req.use_shell {
                let mut c = tokio::process::Command::new("sh");
                c.arg("-c").arg(&req.command);
                c
            } else {
                let mut parts = req.command.split_whitespace();
                let program = parts.next().ok_or_else(|| RunnerError::Unavailable("empty command".to_string()))?;
                let mut c = tokio::process::Command::new(program);
                c.args(parts);
                c
            };
            cmd.current_dir(&req.working_dir);
            if !req.ssh_auth_sock.is_empty() {
                cmd.env("SSH_AUTH_SOCK", &req.ssh_auth_sock);
            }
            let (child, output_rx) = spawn_output_pump(cmd)?;
            Ok(Box::new(ProcessHandle { child: Some(child), output_rx: Some(output_rx), events_rx: None }) as Box<dyn Handle>)
        })
    }

    fn run(&self, req: AgentRunRequest) -> BoxFuture<'_, Result<Box<dyn Handle>, RunnerError>> {
        Box::pin(async move {
            let binary = self.agent_binary.as_ref().ok_or_else(|| RunnerError::Unavailable("no agent binary configured".to_string()))?;
            let mut cmd = tokio::process::Command::new(binary);
            cmd.arg("--model").arg(&req.model);
            if !req.resume_session_id.is_empty() {
                cmd.arg("--resume").arg(&req.resume_session_id);
            }
            if req.json {
                cmd.arg("--json");
            }
            cmd.arg("--prompt").arg(&req.prompt);
            if !self.ssh_auth_sock.is_empty() {
                cmd.env("SSH_AUTH_SOCK", &self.ssh_auth_sock);
            }
            let (child, output_rx) = spawn_output_pump(cmd)?;
            let (events_tx, events_rx) = mpsc::channel(256);
            tokio::spawn(pump_agent_events(output_rx, events_tx));
            Ok(Box::new(ProcessHandle { child: Some(child), output_rx: None, events_rx: Some(events_rx) }) as Box<dyn Handle>)
        })
    }
}

/// Parses each stdout line as a JSON agent event; stderr lines are
/// surfaced as `AgentEvent::Error`, matching the `--json` contract spec
/// §4.2.2 drives the agent with.
async fn pump_agent_events(mut output_rx: mpsc::Receiver<OutputLine>, events_tx: mpsc::Sender<AgentEvent>) {
    #[derive(serde::Deserialize)]
    #[serde(tag = "type", rename_all = "snake_case")]
    enum Wire {
        AgentMessage { text: String },
        ItemOutput { text: String },
        TurnCompleted,
        TurnFailed { reason: String },
        Error { message: String },
    }

    while let Some(line) = output_rx.recv().await {
        let event = match line.stream {
            OutputStream::Stderr => AgentEvent::Error { message: line.text },
            OutputStream::Stdout => match serde_json::from_str::<Wire>(&line.text) {
                Ok(Wire::AgentMessage { text }) => AgentEvent::AgentMessage { text },
                Ok(Wire::ItemOutput { text }) => AgentEvent::ItemOutput { text },
                Ok(Wire::TurnCompleted) => AgentEvent::TurnCompleted,
                Ok(Wire::TurnFailed { reason }) => AgentEvent::TurnFailed { reason },
                Ok(Wire::Error { message }) => AgentEvent::Error { message },
                Err(e) => {
                    warn!(error = %e, line = %line.text, "unparseable agent event line");
                    continue;
                }
            },
        };
        if events_tx.send(event).await.is_err() {
            break;
        }
    }
}

/// Acquires one [`ProcessRunner`] per user, reused across calls until
/// the provider is dropped. There is no real container to tear down, so
/// "acquisition" here never fails once constructed.
pub struct ProcessRunnerProvider {
    repo_root: String,
    home_dir: String,
    runners: RwLock<HashMap<UserId, Arc<ProcessRunner>>>,
    agent_binary: Option<String>,
}

impl ProcessRunnerProvider {
    pub fn new(repo_root: impl Into<String>, home_dir: impl Into<String>, agent_binary: Option<String>) -> Self {
        Self { repo_root: repo_root.into(), home_dir: home_dir.into(), runners: RwLock::new(HashMap::new()), agent_binary }
    }
}

impl RunnerProvider for ProcessRunnerProvider {
    fn runner_for(&self, key: RunnerKey) -> BoxFuture<'_, Result<(Arc<dyn Runner>, RunnerInfo), RunnerError>> {
        Box::pin(async move {
            let ssh_auth_sock = std::env::var("SSH_AUTH_SOCK").unwrap_or_default();
            let runner = if let Some(existing) = self.runners.read().get(&key.user_id) {
                Arc::clone(existing)
            } else {
                let created = Arc::new(ProcessRunner::new(ssh_auth_sock.clone(), self.agent_binary.clone()));
                self.runners.write().entry(key.user_id.clone()).or_insert_with(|| created).clone()
            };
            let info = RunnerInfo { home_dir: self.home_dir.clone(), repo_root: self.repo_root.clone(), ssh_auth_sock };
            Ok((runner as Arc<dyn Runner>, info))
        })
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;

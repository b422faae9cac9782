// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: scripted fakes for the Runner Provider and
//! auth capability traits, so the Command Handler can be exercised without
//! a real container backend or SSH front door.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::auth::{GitKeyRotator, GitKeyStore, LoginAuthStore, LoginPubKey, LoginPubKeyStore, TotpValidator};
use crate::error::{CentaurxError, Result};
use crate::model::{RunnerInfo, UsageInfo, UserId};
use crate::runner::{AgentEvent, AgentRunRequest, BoxFuture, ExitResult, Handle, OutputLine, Runner, RunnerError, RunnerKey, RunnerProvider, UsageReader};

/// A scripted [`Handle`]: yields a fixed sequence of output lines or agent
/// events, then a fixed exit result.
pub struct FakeHandle {
    output: VecDeque<OutputLine>,
    events: VecDeque<AgentEvent>,
    exit: ExitResult,
    pub closed: Arc<AtomicBool>,
}

impl FakeHandle {
    pub fn with_output(lines: Vec<OutputLine>, exit: ExitResult) -> Self {
        Self { output: lines.into(), events: VecDeque::new(), exit, closed: Arc::new(AtomicBool::new(false)) }
    }

    pub fn with_events(events: Vec<AgentEvent>) -> Self {
        Self { output: VecDeque::new(), events: events.into(), exit: ExitResult { exit_code: 0 }, closed: Arc::new(AtomicBool::new(false)) }
    }
}

impl Handle for FakeHandle {
    fn next_output(&mut self) -> BoxFuture<'_, Option<OutputLine>> {
        Box::pin(async move { self.output.pop_front() })
    }

    fn next_event(&mut self) -> BoxFuture<'_, Option<AgentEvent>> {
        Box::pin(async move { self.events.pop_front() })
    }

    fn wait(&mut self) -> BoxFuture<'_, ExitResult> {
        Box::pin(async move { self.exit })
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::Release);
    }
}

/// A scripted [`UsageReader`]: always returns the same configured result.
pub struct FakeUsageReader {
    result: Mutex<Option<std::result::Result<UsageInfo, RunnerError>>>,
}

impl FakeUsageReader {
    pub fn new(result: std::result::Result<UsageInfo, RunnerError>) -> Self {
        Self { result: Mutex::new(Some(result)) }
    }
}

impl UsageReader for FakeUsageReader {
    fn usage(&self, _user_id: &UserId) -> BoxFuture<'_, std::result::Result<UsageInfo, RunnerError>> {
        Box::pin(async move { self.result.lock().clone().unwrap_or_else(|| Err(RunnerError::Unavailable("no usage configured".to_string()))) })
    }
}

/// A scripted [`Runner`]: each call to `run_command`/`run` pops the next
/// queued response, recording the request it was given so tests can assert
/// on working directory, command text, etc.
#[derive(Default)]
pub struct FakeRunner {
    command_outputs: Mutex<VecDeque<(Vec<OutputLine>, ExitResult)>>,
    agent_outputs: Mutex<VecDeque<Vec<AgentEvent>>>,
    pub recorded_commands: Mutex<Vec<RunCommandRequestRecord>>,
    pub recorded_agent_runs: Mutex<Vec<AgentRunRequest>>,
    /// Set once at construction; `Runner::usage_reader` hands back a plain
    /// borrow, so this isn't mutated behind the `&self` it's read through.
    usage_reader: Option<Arc<FakeUsageReader>>,
}

/// A captured `run_command` call, cheap to assert against without pulling
/// in the full request type everywhere.
#[derive(Debug, Clone)]
pub struct RunCommandRequestRecord {
    pub working_dir: String,
    pub command: String,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next `run_command` response: a successful exit with the
    /// given output lines.
    pub fn queue_command_ok(&self, lines: Vec<OutputLine>, exit_code: i32) {
        self.command_outputs.lock().push_back((lines, ExitResult { exit_code }));
    }

    /// Queue the next `run` (agent) response.
    pub fn queue_agent_events(&self, events: Vec<AgentEvent>) {
        self.agent_outputs.lock().push_back(events);
    }

    pub fn with_usage_reader(mut self, reader: Arc<FakeUsageReader>) -> Self {
        self.usage_reader = Some(reader);
        self
    }
}

impl Runner for FakeRunner {
    fn run_command(&self, req: crate::runner::RunCommandRequest) -> BoxFuture<'_, std::result::Result<Box<dyn Handle>, RunnerError>> {
        Box::pin(async move {
            self.recorded_commands.lock().push(RunCommandRequestRecord { working_dir: req.working_dir, command: req.command });
            match self.command_outputs.lock().pop_front() {
                Some((lines, exit)) => Ok(Box::new(FakeHandle::with_output(lines, exit)) as Box<dyn Handle>),
                None => Err(RunnerError::Unavailable("no scripted command output".to_string())),
            }
        })
    }

    fn run(&self, req: AgentRunRequest) -> BoxFuture<'_, std::result::Result<Box<dyn Handle>, RunnerError>> {
        Box::pin(async move {
            self.recorded_agent_runs.lock().push(req);
            match self.agent_outputs.lock().pop_front() {
                Some(events) => Ok(Box::new(FakeHandle::with_events(events)) as Box<dyn Handle>),
                None => Err(RunnerError::Unavailable("no scripted agent output".to_string())),
            }
        })
    }

    fn usage_reader(&self) -> Option<&dyn UsageReader> {
        self.usage_reader.as_deref().map(|r| r as &dyn UsageReader)
    }
}

/// A scripted [`RunnerProvider`] backing a single shared [`FakeRunner`].
pub struct FakeRunnerProvider {
    pub runner: Arc<FakeRunner>,
    info: RunnerInfo,
    fail: AtomicBool,
}

impl FakeRunnerProvider {
    pub fn new(info: RunnerInfo) -> Self {
        Self { runner: Arc::new(FakeRunner::new()), info, fail: AtomicBool::new(false) }
    }

    pub fn with_runner(runner: Arc<FakeRunner>, info: RunnerInfo) -> Self {
        Self { runner, info, fail: AtomicBool::new(false) }
    }

    /// Make the next (and all subsequent) `runner_for` calls fail.
    pub fn fail_acquisition(&self) {
        self.fail.store(true, Ordering::Release);
    }
}

impl RunnerProvider for FakeRunnerProvider {
    fn runner_for(&self, key: RunnerKey) -> BoxFuture<'_, std::result::Result<(Arc<dyn Runner>, RunnerInfo), RunnerError>> {
        Box::pin(async move {
            let _ = key;
            if self.fail.load(Ordering::Acquire) {
                return Err(RunnerError::Unavailable("fake runner unavailable".to_string()));
            }
            Ok((Arc::clone(&self.runner) as Arc<dyn Runner>, self.info.clone()))
        })
    }
}

/// Default [`RunnerInfo`] for tests that don't care about container-path
/// remapping: host and container repo roots match.
pub fn test_runner_info(repo_root: &str) -> RunnerInfo {
    RunnerInfo { home_dir: "/home/centaurx".to_string(), repo_root: repo_root.to_string(), ssh_auth_sock: String::new() }
}

/// In-memory [`LoginPubKeyStore`]/[`LoginAuthStore`].
#[derive(Default)]
pub struct FakeLoginPubKeyStore {
    keys: Mutex<HashMap<UserId, Vec<LoginPubKey>>>,
    next_id: AtomicU64,
}

impl FakeLoginPubKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoginPubKeyStore for FakeLoginPubKeyStore {
    fn add(&self, user_id: &UserId, pubkey: &str) -> Result<LoginPubKey> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed).to_string();
        let key = LoginPubKey { id, pubkey: pubkey.to_string() };
        self.keys.lock().entry(user_id.clone()).or_default().push(key.clone());
        Ok(key)
    }

    fn list(&self, user_id: &UserId) -> Vec<LoginPubKey> {
        self.keys.lock().get(user_id).cloned().unwrap_or_default()
    }

    fn remove(&self, user_id: &UserId, id: &str) -> Result<()> {
        let mut keys = self.keys.lock();
        let list = keys.entry(user_id.clone()).or_default();
        let before = list.len();
        list.retain(|k| k.id != id);
        if list.len() == before {
            return Err(CentaurxError::NotFound(format!("login pubkey not found: {id}")));
        }
        Ok(())
    }
}

impl LoginAuthStore for FakeLoginPubKeyStore {
    fn has_login_pubkey(&self, user_id: &UserId, key: &str) -> bool {
        self.keys.lock().get(user_id).is_some_and(|keys| keys.iter().any(|k| k.pubkey == key))
    }
}

/// A fixed git SSH public key, as if read from a per-user keypair on disk.
pub struct FakeGitKeyStore {
    key: String,
}

impl FakeGitKeyStore {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl GitKeyStore for FakeGitKeyStore {
    fn public_key(&self, _user_id: &UserId) -> Result<String> {
        Ok(self.key.clone())
    }
}

/// A git key rotator that hands back a new fake key on every call.
#[derive(Default)]
pub struct FakeGitKeyRotator {
    rotations: Mutex<u64>,
}

impl FakeGitKeyRotator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rotation_count(&self) -> u64 {
        *self.rotations.lock()
    }
}

impl GitKeyRotator for FakeGitKeyRotator {
    fn rotate(&self, _user_id: &UserId) -> Result<String> {
        let mut n = self.rotations.lock();
        *n += 1;
        Ok(format!("ssh-ed25519 FAKEKEY{n}"))
    }
}

/// A TOTP validator backed by one configured valid code per user.
#[derive(Default)]
pub struct FakeTotpValidator {
    valid_codes: Mutex<HashMap<UserId, String>>,
}

impl FakeTotpValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_valid_code(&self, user_id: impl Into<UserId>, code: impl Into<String>) {
        self.valid_codes.lock().insert(user_id.into(), code.into());
    }
}

impl TotpValidator for FakeTotpValidator {
    fn validate_totp(&self, user_id: &UserId, code: &str) -> bool {
        self.valid_codes.lock().get(user_id).is_some_and(|c| c == code)
    }
}

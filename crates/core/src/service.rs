// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Service: tabs, repos, usage, preferences — the single source of
//! truth for user state.
//!
//! State is sharded per user behind its own lock (`UserState`), the way
//! `coop::profile::ProfileState` and `coop::switch::SwitchState` keep
//! per-resource state behind `RwLock`s rather than one global lock —
//! unrelated users never contend (spec §5, §9).

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::error::{CentaurxError, Result};
use crate::event_bus::EventBus;
use crate::model::{Event, EventKind, Preferences, Repo, Tab, TabSnapshot, TabStatus, UserId};
use crate::scrollback::{PersistedBuffer, ScrollbackBuffer, Snapshot};

/// Tracks in-flight command/agent-turn cancellation handles so `/stop`
/// can find and sever them, keyed by tab id (or the synthetic
/// `SYSTEM_SHELL_TAB_ID`).
#[derive(Default)]
pub struct CommandTracker {
    inner: Mutex<HashMap<String, CancellationToken>>,
}

impl CommandTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the cancellation handle for a newly-dispatched command.
    /// Replaces any prior registration for the same tab (there should
    /// never be one, since a tab only allows one in-flight command).
    pub fn register(&self, tab_id: &str, token: CancellationToken) {
        self.inner.lock().insert(tab_id.to_string(), token);
    }

    /// Remove the registration once a command completes (any exit path).
    pub fn unregister(&self, tab_id: &str) {
        self.inner.lock().remove(tab_id);
    }

    /// Cancel the in-flight command for a tab, if any. Returns `true` if
    /// something was actually canceled.
    pub fn stop(&self, tab_id: &str) -> bool {
        if let Some(token) = self.inner.lock().get(tab_id) {
            token.cancel();
            true
        } else {
            false
        }
    }
}

struct UserState {
    repos: Vec<Repo>,
    tabs: Vec<Tab>,
    active_tab_id: Option<String>,
    preferences: Preferences,
    next_tab_seq: u64,
    /// Scrollback for shell commands run with no tab bound (spec §4.2.1
    /// step 4's "no repo" branch) — not a real [`Tab`], so it lives here
    /// rather than in `tabs`.
    system_shell_buffer: ScrollbackBuffer,
}

impl UserState {
    fn new(max_lines: usize) -> Self {
        Self {
            repos: Vec::new(),
            tabs: Vec::new(),
            active_tab_id: None,
            preferences: Preferences::default(),
            next_tab_seq: 0,
            system_shell_buffer: ScrollbackBuffer::new(max_lines),
        }
    }

    fn find_tab_idx(&self, tab_id: &str) -> Option<usize> {
        self.tabs.iter().position(|t| t.id == tab_id)
    }

    /// Resolve a `/rm`-style reference: a 1-based index into the current
    /// tab list, or a case-insensitive name match (spec §4.2, S2).
    fn resolve_ref(&self, reference: &str) -> Result<usize> {
        if let Ok(n) = reference.parse::<i64>() {
            if n < 1 || n as usize > self.tabs.len() {
                return Err(CentaurxError::NotFound("tab index out of range".to_string()));
            }
            return Ok((n - 1) as usize);
        }
        self.tabs
            .iter()
            .position(|t| t.name.eq_ignore_ascii_case(reference))
            .ok_or_else(|| CentaurxError::NotFound(format!("tab not found: {reference}")))
    }
}

/// Owns all per-user tab/repo/preferences state.
pub struct Service {
    max_lines: usize,
    users: RwLock<HashMap<UserId, Arc<Mutex<UserState>>>>,
    pub commands: CommandTracker,
    /// Fans out state-change notifications per spec §2's data flow
    /// ("Service emits events -> Event Bus"). Unset by default so
    /// existing callers (tests, anything not wired to an SSH front door)
    /// pay nothing for it; the server crate attaches one at startup via
    /// [`Self::set_event_bus`].
    event_bus: RwLock<Option<Arc<EventBus>>>,
}

impl Service {
    pub fn new(max_lines: usize) -> Self {
        Self { max_lines, users: RwLock::new(HashMap::new()), commands: CommandTracker::new(), event_bus: RwLock::new(None) }
    }

    /// Attach an [`EventBus`] so subsequent state mutations fan out to
    /// subscribed UIs. Idempotent to call again (replaces the prior bus).
    pub fn set_event_bus(&self, bus: Arc<EventBus>) {
        *self.event_bus.write() = Some(bus);
    }

    fn emit(&self, user_id: &str, kind: EventKind, payload: serde_json::Value) {
        if let Some(bus) = self.event_bus.read().as_ref() {
            bus.publish(Event { user_id: user_id.to_string(), kind, payload });
        }
    }

    /// Notify subscribers that fresh usage info is available for a user
    /// (spec §4.2.4). Called by the Command Handler after an uncached
    /// usage fetch, since usage itself isn't part of `UserState`.
    pub fn publish_usage_updated(&self, user_id: &str) {
        self.emit(user_id, EventKind::UsageUpdated, serde_json::Value::Null);
    }

    fn user_lock(&self, user_id: &str) -> Arc<Mutex<UserState>> {
        if let Some(existing) = self.users.read().get(user_id) {
            return Arc::clone(existing);
        }
        let max_lines = self.max_lines;
        Arc::clone(self.users.write().entry(user_id.to_string()).or_insert_with(|| Arc::new(Mutex::new(UserState::new(max_lines)))))
    }

    // -- Repos ---------------------------------------------------------

    pub fn list_repos(&self, user_id: &str) -> Vec<Repo> {
        self.user_lock(user_id).lock().repos.clone()
    }

    /// Register a repo if it's not already known for this user; returns
    /// the (possibly pre-existing) repo. This is the "open existing"
    /// fallback for `/new <name>` collisions (spec §9a).
    pub fn register_repo(&self, user_id: &str, repo: Repo) -> Repo {
        let lock = self.user_lock(user_id);
        let mut state = lock.lock();
        if let Some(existing) = state.repos.iter().find(|r| r.name == repo.name) {
            return existing.clone();
        }
        state.repos.push(repo.clone());
        repo
    }

    pub fn find_repo(&self, user_id: &str, name: &str) -> Option<Repo> {
        self.user_lock(user_id).lock().repos.iter().find(|r| r.name == name).cloned()
    }

    // -- Tabs ------------------------------------------------------------

    pub fn list_tabs(&self, user_id: &str) -> Vec<TabSnapshot> {
        self.user_lock(user_id).lock().tabs.iter().map(Tab::snapshot).collect()
    }

    pub fn active_tab(&self, user_id: &str) -> Option<TabSnapshot> {
        let lock = self.user_lock(user_id);
        let state = lock.lock();
        let id = state.active_tab_id.as_ref()?;
        state.tabs.iter().find(|t| &t.id == id).map(Tab::snapshot)
    }

    pub fn get_tab(&self, user_id: &str, tab_id: &str) -> Result<TabSnapshot> {
        let lock = self.user_lock(user_id);
        let state = lock.lock();
        state
            .tabs
            .iter()
            .find(|t| t.id == tab_id)
            .map(Tab::snapshot)
            .ok_or_else(|| CentaurxError::NotFound(format!("tab not found: {tab_id}")))
    }

    /// Resolve a `/rm`-style numeric-or-name reference to a tab id.
    pub fn resolve_tab_ref(&self, user_id: &str, reference: &str) -> Result<String> {
        let lock = self.user_lock(user_id);
        let state = lock.lock();
        let idx = state.resolve_ref(reference)?;
        Ok(state.tabs[idx].id.clone())
    }

    /// Create a new tab bound to `repo`, activate it, and return its
    /// snapshot. `model` and `id_prefix` seed the tab's fields; ids are
    /// generated as `"<id_prefix>-<n>"` to stay deterministic and
    /// test-friendly.
    pub fn create_tab(&self, user_id: &str, name: &str, repo: Repo, model: &str) -> TabSnapshot {
        let lock = self.user_lock(user_id);
        let mut state = lock.lock();
        let seq = state.next_tab_seq;
        state.next_tab_seq += 1;
        let id = format!("tab-{seq}");
        let tab = Tab::new(id.clone(), name, repo, model, self.max_lines);
        let snapshot = tab.snapshot();
        state.tabs.push(tab);
        state.active_tab_id = Some(id.clone());
        drop(state);
        self.emit(user_id, EventKind::TabCreated, serde_json::json!({"tab_id": id, "name": snapshot.name}));
        self.emit(user_id, EventKind::ActiveTabChanged, serde_json::json!({"tab_id": id}));
        snapshot
    }

    /// Close a tab by reference. Returns the closed tab's id so the
    /// caller can release its buffer/runner resources and cancel any
    /// in-flight command.
    pub fn close_tab(&self, user_id: &str, reference: &str) -> Result<String> {
        let lock = self.user_lock(user_id);
        let mut state = lock.lock();
        let idx = state.resolve_ref(reference)?;
        let removed = state.tabs.remove(idx);
        let active_changed = state.active_tab_id.as_deref() == Some(removed.id.as_str());
        if active_changed {
            state.active_tab_id = state.tabs.first().map(|t| t.id.clone());
        }
        let new_active = state.active_tab_id.clone();
        drop(state);
        self.commands.stop(&removed.id);
        self.emit(user_id, EventKind::TabClosed, serde_json::json!({"tab_id": removed.id}));
        if active_changed {
            self.emit(user_id, EventKind::ActiveTabChanged, serde_json::json!({"tab_id": new_active}));
        }
        Ok(removed.id)
    }

    /// Close the currently active tab (`/close`).
    pub fn close_active_tab(&self, user_id: &str) -> Result<String> {
        let active = self.active_tab(user_id).ok_or_else(|| CentaurxError::NotFound("no active tab".to_string()))?;
        self.close_tab(user_id, &active.id)
    }

    pub fn set_model(&self, user_id: &str, tab_id: &str, model: &str, effort: Option<crate::model::ReasoningEffort>) -> Result<()> {
        self.with_tab_mut(user_id, tab_id, |tab| {
            tab.model = model.to_string();
            tab.model_reasoning_effort = effort;
        })?;
        self.emit(user_id, EventKind::TabUpdated, serde_json::json!({"tab_id": tab_id}));
        Ok(())
    }

    pub fn set_session_id(&self, user_id: &str, tab_id: &str, session_id: &str) -> Result<()> {
        self.with_tab_mut(user_id, tab_id, |tab| tab.session_id = session_id.to_string())?;
        self.emit(user_id, EventKind::TabUpdated, serde_json::json!({"tab_id": tab_id}));
        Ok(())
    }

    /// Drop the session id so the next prompt starts a fresh agent
    /// session (`/renew`).
    pub fn renew_session(&self, user_id: &str, tab_id: &str) -> Result<()> {
        self.set_session_id(user_id, tab_id, "")
    }

    fn with_tab_mut<F: FnOnce(&mut Tab)>(&self, user_id: &str, tab_id: &str, f: F) -> Result<()> {
        let lock = self.user_lock(user_id);
        let mut state = lock.lock();
        let tab = state.find_tab_idx(tab_id).ok_or_else(|| CentaurxError::NotFound(format!("tab not found: {tab_id}")))?;
        f(&mut state.tabs[tab]);
        Ok(())
    }

    // -- Tab busy enforcement --------------------------------------------

    /// Transition a tab from `Idle` to `Running`. Fails with `TabBusy`
    /// if it's already running (spec §3, §5).
    pub fn try_begin(&self, user_id: &str, tab_id: &str) -> Result<()> {
        let lock = self.user_lock(user_id);
        let mut state = lock.lock();
        let idx = state.find_tab_idx(tab_id).ok_or_else(|| CentaurxError::NotFound(format!("tab not found: {tab_id}")))?;
        match state.tabs[idx].status {
            TabStatus::Running => Err(CentaurxError::TabBusy),
            TabStatus::Idle => {
                state.tabs[idx].status = TabStatus::Running;
                drop(state);
                self.emit(user_id, EventKind::TabUpdated, serde_json::json!({"tab_id": tab_id, "status": TabStatus::Running.as_str()}));
                Ok(())
            }
        }
    }

    /// Transition a tab back to `Idle`. Used on command completion and
    /// by `/stop`.
    pub fn end(&self, user_id: &str, tab_id: &str) -> Result<()> {
        self.with_tab_mut(user_id, tab_id, |tab| tab.status = TabStatus::Idle)?;
        self.emit(user_id, EventKind::TabUpdated, serde_json::json!({"tab_id": tab_id, "status": TabStatus::Idle.as_str()}));
        Ok(())
    }

    pub fn status(&self, user_id: &str, tab_id: &str) -> Result<TabStatus> {
        let lock = self.user_lock(user_id);
        let state = lock.lock();
        state.tabs.iter().find(|t| t.id == tab_id).map(|t| t.status).ok_or_else(|| CentaurxError::NotFound(format!("tab not found: {tab_id}")))
    }

    // -- Buffer -----------------------------------------------------------

    pub fn append_buffer<I, S>(&self, user_id: &str, tab_id: &str, lines: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_tab_mut(user_id, tab_id, |tab| tab.buffer.append(lines))?;
        self.emit(user_id, EventKind::BufferAppended, serde_json::json!({"tab_id": tab_id}));
        Ok(())
    }

    pub fn buffer_snapshot(&self, user_id: &str, tab_id: &str, viewport: i64) -> Result<Snapshot> {
        let lock = self.user_lock(user_id);
        let state = lock.lock();
        let tab = state.tabs.iter().find(|t| t.id == tab_id).ok_or_else(|| CentaurxError::NotFound(format!("tab not found: {tab_id}")))?;
        Ok(tab.buffer.snapshot(viewport))
    }

    pub fn export_buffer(&self, user_id: &str, tab_id: &str) -> Result<PersistedBuffer> {
        let lock = self.user_lock(user_id);
        let state = lock.lock();
        let tab = state.tabs.iter().find(|t| t.id == tab_id).ok_or_else(|| CentaurxError::NotFound(format!("tab not found: {tab_id}")))?;
        Ok(tab.buffer.export())
    }

    /// Append to the per-user system-shell buffer (no tab bound). Unlike
    /// [`Self::append_buffer`] this can never fail: every user implicitly
    /// has one, created alongside their first piece of state.
    pub fn append_system_shell_buffer<I, S>(&self, user_id: &str, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.user_lock(user_id).lock().system_shell_buffer.append(lines);
        self.emit(user_id, EventKind::BufferAppended, serde_json::json!({"tab_id": crate::model::SYSTEM_SHELL_TAB_ID}));
    }

    pub fn system_shell_buffer_snapshot(&self, user_id: &str, viewport: i64) -> Snapshot {
        self.user_lock(user_id).lock().system_shell_buffer.snapshot(viewport)
    }

    /// Restore a tab's buffer from a persisted snapshot (startup recovery).
    pub fn restore_buffer(&self, user_id: &str, tab_id: &str, persisted: PersistedBuffer) -> Result<()> {
        let lock = self.user_lock(user_id);
        let mut state = lock.lock();
        let idx = state.find_tab_idx(tab_id).ok_or_else(|| CentaurxError::NotFound(format!("tab not found: {tab_id}")))?;
        state.tabs[idx].buffer = ScrollbackBuffer::restore(self.max_lines, persisted);
        Ok(())
    }

    // -- Preferences -------------------------------------------------------

    pub fn preferences(&self, user_id: &str) -> Preferences {
        self.user_lock(user_id).lock().preferences.clone()
    }

    pub fn set_theme(&self, user_id: &str, theme: &str) {
        self.user_lock(user_id).lock().preferences.theme = theme.to_string();
    }

    pub fn toggle_full_command_output(&self, user_id: &str) -> bool {
        let lock = self.user_lock(user_id);
        let mut state = lock.lock();
        state.preferences.full_command_output = !state.preferences.full_command_output;
        state.preferences.full_command_output
    }

    /// Every user with in-memory state right now. Used by the server's
    /// periodic persistence sweep to know what to save — the Service
    /// itself has no notion of a registered-users list beyond "has
    /// touched state at least once".
    pub fn known_users(&self) -> Vec<UserId> {
        self.users.read().keys().cloned().collect()
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;

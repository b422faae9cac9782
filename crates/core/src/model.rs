// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Core data model: users, repos, tabs, preferences, and usage info.
//!
//! These types are owned exclusively by [`crate::service::Service`];
//! everything handed back to callers is an immutable snapshot (`Clone`).

use serde::{Deserialize, Serialize};

use crate::scrollback::ScrollbackBuffer;

/// Opaque per-user identifier.
pub type UserId = String;

/// Reserved tab id used for runner keying when no tab is active.
pub const SYSTEM_SHELL_TAB_ID: &str = "system-shell";

/// A repository bound to one or more tabs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repo {
    pub name: String,
    pub path: String,
}

/// Lifecycle status of a tab's current command/agent turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TabStatus {
    Idle,
    Running,
}

impl TabStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
        }
    }
}

impl std::fmt::Display for TabStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasoning effort for models that support it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    Medium,
    High,
    Xhigh,
}

impl ReasoningEffort {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "xhigh" => Some(Self::Xhigh),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Xhigh => "xhigh",
        }
    }
}

impl std::fmt::Display for ReasoningEffort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A repo-scoped, persistent interactive context with its own scrollback
/// and agent session.
///
/// `id` is stable for the life of the tab; `repo` is immutable after
/// creation (spec §3).
pub struct Tab {
    pub id: String,
    pub name: String,
    pub repo: Repo,
    pub model: String,
    pub model_reasoning_effort: Option<ReasoningEffort>,
    /// Agent-session continuation token. Empty string = fresh session.
    pub session_id: String,
    pub status: TabStatus,
    pub buffer: ScrollbackBuffer,
}

/// Immutable point-in-time view of a [`Tab`], safe to hand to callers
/// outside the Service's lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabSnapshot {
    pub id: String,
    pub name: String,
    pub repo: Repo,
    pub model: String,
    pub model_reasoning_effort: Option<ReasoningEffort>,
    pub session_id: String,
    pub status: TabStatus,
}

impl Tab {
    pub fn new(id: impl Into<String>, name: impl Into<String>, repo: Repo, model: impl Into<String>, max_lines: usize) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            repo,
            model: model.into(),
            model_reasoning_effort: None,
            session_id: String::new(),
            status: TabStatus::Idle,
            buffer: ScrollbackBuffer::new(max_lines),
        }
    }

    pub fn snapshot(&self) -> TabSnapshot {
        TabSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            repo: self.repo.clone(),
            model: self.model.clone(),
            model_reasoning_effort: self.model_reasoning_effort,
            session_id: self.session_id.clone(),
            status: self.status,
        }
    }
}

/// Per-session display preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preferences {
    pub full_command_output: bool,
    pub theme: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self { full_command_output: false, theme: "default".to_string() }
    }
}

/// A rolling quota window (e.g. the ChatGPT-style "5h limit").
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UsageWindow {
    pub used_percent: f64,
    pub reset_at: u64,
}

/// Usage/quota info for a user, as reported by the Runner's `UsageReader`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageInfo {
    pub chatgpt: bool,
    pub primary: Option<UsageWindow>,
    pub secondary: Option<UsageWindow>,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Information about a user's runner container, returned alongside the
/// `Runner` handle by [`crate::runner::RunnerProvider::runner_for`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerInfo {
    pub home_dir: String,
    /// Path under which repos are mounted inside the container. May
    /// differ from the host `RepoRoot`.
    pub repo_root: String,
    pub ssh_auth_sock: String,
}

/// A state-change notification fanned out by the [`crate::event_bus::EventBus`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub user_id: UserId,
    pub kind: EventKind,
    pub payload: serde_json::Value,
}

/// Discriminant for [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    TabCreated,
    TabClosed,
    TabUpdated,
    BufferAppended,
    ActiveTabChanged,
    UsageUpdated,
}

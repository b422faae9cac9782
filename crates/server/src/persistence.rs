// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Best-effort tab/scrollback persistence (SPEC_FULL.md §B, "Persisted
//! tab recovery"): one JSON file per user under the configured state
//! directory, loaded on startup and re-saved on a periodic sweep.
//!
//! Shaped like `centaurx_core::auth`'s file-backed stores: a plain
//! on-disk record type, loaded best-effort, written via `serde_json`
//! pretty-printing. A failed load for one user must never abort startup
//! — the rest of the fleet still needs to come up.

use std::path::{Path, PathBuf};

use centaurx_core::model::{ReasoningEffort, Repo};
use centaurx_core::scrollback::PersistedBuffer;
use centaurx_core::service::Service;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Serialize, Deserialize)]
struct PersistedTab {
    name: String,
    repo: Repo,
    model: String,
    model_reasoning_effort: Option<ReasoningEffort>,
    session_id: String,
    buffer: PersistedBuffer,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedUser {
    repos: Vec<Repo>,
    tabs: Vec<PersistedTab>,
    /// Name of the tab that was active, restored last so it ends up
    /// active again (`Service` has no direct "set active tab" setter;
    /// the last tab `create_tab` opens becomes the active one).
    active_tab_name: Option<String>,
    theme: String,
    full_command_output: bool,
}

fn user_path(dir: &Path, user_id: &str) -> PathBuf {
    dir.join(format!("{user_id}.json"))
}

/// Snapshot one user's current state to disk.
pub fn save_user(dir: &Path, user_id: &str, service: &Service) {
    let tabs = service.list_tabs(user_id);
    let active_tab_name = service.active_tab(user_id).map(|t| t.name);
    let persisted = PersistedUser {
        repos: service.list_repos(user_id),
        tabs: tabs
            .iter()
            .filter_map(|t| {
                let buffer = service.export_buffer(user_id, &t.id).ok()?;
                Some(PersistedTab { name: t.name.clone(), repo: t.repo.clone(), model: t.model.clone(), model_reasoning_effort: t.model_reasoning_effort, session_id: t.session_id.clone(), buffer })
            })
            .collect(),
        active_tab_name,
        theme: service.preferences(user_id).theme,
        full_command_output: service.preferences(user_id).full_command_output,
    };

    if let Err(e) = std::fs::create_dir_all(dir) {
        warn!(%user_id, error = %e, "failed to create persistence directory");
        return;
    }
    let path = user_path(dir, user_id);
    match serde_json::to_vec_pretty(&persisted) {
        Ok(bytes) => {
            if let Err(e) = std::fs::write(&path, bytes) {
                warn!(%user_id, path = %path.display(), error = %e, "failed to persist user state");
            }
        }
        Err(e) => warn!(%user_id, error = %e, "failed to serialize user state"),
    }
}

/// Save every user `Service` currently holds in memory.
pub fn save_all(dir: &Path, service: &Service) {
    for user_id in service.known_users() {
        save_user(dir, &user_id, service);
    }
}

/// Restore one user's tabs/repos/preferences from disk, re-registering
/// them with `service`. Returns `Ok(())` even if nothing was persisted
/// for this user (not-found is not an error here).
fn load_user(dir: &Path, user_id: &str, service: &Service) -> std::io::Result<()> {
    let path = user_path(dir, user_id);
    if !path.exists() {
        return Ok(());
    }
    let bytes = std::fs::read(&path)?;
    let persisted: PersistedUser = serde_json::from_slice(&bytes).map_err(std::io::Error::other)?;

    for repo in persisted.repos {
        service.register_repo(user_id, repo);
    }

    service.set_theme(user_id, &persisted.theme);
    if service.preferences(user_id).full_command_output != persisted.full_command_output {
        service.toggle_full_command_output(user_id);
    }

    // Restore the active tab last so it ends up focused (see
    // `PersistedUser::active_tab_name`).
    let active_name = persisted.active_tab_name.clone();
    let (mut ordered, active): (Vec<_>, Vec<_>) = persisted.tabs.into_iter().partition(|t| Some(&t.name) != active_name.as_ref());
    ordered.extend(active);

    for tab in ordered {
        let repo = service.register_repo(user_id, tab.repo);
        let snapshot = service.create_tab(user_id, &tab.name, repo, &tab.model);
        if let Some(effort) = tab.model_reasoning_effort {
            let _ = service.set_model(user_id, &snapshot.id, &tab.model, Some(effort));
        }
        if !tab.session_id.is_empty() {
            let _ = service.set_session_id(user_id, &snapshot.id, &tab.session_id);
        }
        let _ = service.restore_buffer(user_id, &snapshot.id, tab.buffer);
    }
    Ok(())
}

/// Load every persisted user file under `dir` into `service`. Best
/// effort: a single user's corrupt or unreadable file is logged and
/// skipped rather than aborting startup.
pub fn load_all(dir: &Path, service: &Service) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "failed to read persistence directory");
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let Some(user_id) = path.file_stem().and_then(|s| s.to_str()) else { continue };
        if let Err(e) = load_user(dir, user_id, service) {
            warn!(user_id, path = %path.display(), error = %e, "failed to load persisted user state, skipping");
        }
    }
}

#[cfg(test)]
#[path = "persistence_tests.rs"]
mod tests;

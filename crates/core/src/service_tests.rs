// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::model::Repo;

fn repo(name: &str) -> Repo {
    Repo { name: name.to_string(), path: format!("/repos/{name}") }
}

fn make_tabs(svc: &Service, user: &str, names: &[&str]) {
    for n in names {
        svc.create_tab(user, n, repo(n), "gpt-5.1");
    }
}

#[test]
fn tab_ref_resolution_by_index_and_name() {
    let svc = Service::new(100);
    make_tabs(&svc, "alice", &["A", "B", "C"]);

    let b_id = svc.resolve_tab_ref("alice", "2").unwrap();
    let tabs = svc.list_tabs("alice");
    assert_eq!(tabs[1].id, b_id);

    let b_id_by_name = svc.resolve_tab_ref("alice", "b").unwrap();
    assert_eq!(b_id, b_id_by_name);

    assert!(matches!(svc.resolve_tab_ref("alice", "0"), Err(CentaurxError::NotFound(_))));
    assert!(matches!(svc.resolve_tab_ref("alice", "4"), Err(CentaurxError::NotFound(_))));
}

#[test]
fn s2_rm_by_index_and_name_close_same_tab() {
    let svc = Service::new(100);
    make_tabs(&svc, "alice", &["A", "B", "C"]);
    let b_id = svc.resolve_tab_ref("alice", "2").unwrap();

    let closed = svc.close_tab("alice", "2").unwrap();
    assert_eq!(closed, b_id);
    assert_eq!(svc.list_tabs("alice").len(), 2);
    assert!(svc.list_tabs("alice").iter().all(|t| t.name != "B"));
}

#[test]
fn repo_is_immutable_after_tab_creation() {
    let svc = Service::new(100);
    let snap = svc.create_tab("alice", "A", repo("demo"), "gpt-5.1");
    assert_eq!(snap.repo.name, "demo");
    // No API exists to mutate `repo` on an existing tab — enforced by
    // construction (Service exposes no such setter).
}

#[test]
fn tab_busy_blocks_second_running_transition() {
    let svc = Service::new(100);
    let snap = svc.create_tab("alice", "A", repo("demo"), "gpt-5.1");
    svc.try_begin("alice", &snap.id).unwrap();
    assert!(matches!(svc.try_begin("alice", &snap.id), Err(CentaurxError::TabBusy)));
    svc.end("alice", &snap.id).unwrap();
    svc.try_begin("alice", &snap.id).unwrap();
}

#[test]
fn stop_always_permitted_and_transitions_to_idle() {
    let svc = Service::new(100);
    let snap = svc.create_tab("alice", "A", repo("demo"), "gpt-5.1");
    svc.try_begin("alice", &snap.id).unwrap();
    assert_eq!(svc.status("alice", &snap.id).unwrap(), TabStatus::Running);
    svc.end("alice", &snap.id).unwrap();
    assert_eq!(svc.status("alice", &snap.id).unwrap(), TabStatus::Idle);
}

#[test]
fn closing_active_tab_moves_pointer() {
    let svc = Service::new(100);
    make_tabs(&svc, "alice", &["A", "B"]);
    let active = svc.active_tab("alice").unwrap();
    assert_eq!(active.name, "B"); // last created becomes active
    svc.close_active_tab("alice").unwrap();
    let active = svc.active_tab("alice").unwrap();
    assert_eq!(active.name, "A");
}

#[test]
fn renew_clears_session_id() {
    let svc = Service::new(100);
    let snap = svc.create_tab("alice", "A", repo("demo"), "gpt-5.1");
    svc.set_session_id("alice", &snap.id, "sess-123").unwrap();
    assert_eq!(svc.get_tab("alice", &snap.id).unwrap().session_id, "sess-123");
    svc.renew_session("alice", &snap.id).unwrap();
    assert_eq!(svc.get_tab("alice", &snap.id).unwrap().session_id, "");
}

#[test]
fn repo_registration_is_idempotent_collision_falls_back_to_open_existing() {
    let svc = Service::new(100);
    let first = svc.register_repo("alice", repo("demo"));
    let second = svc.register_repo("alice", Repo { name: "demo".to_string(), path: "/different/path".to_string() });
    assert_eq!(first.path, second.path, "existing repo wins over a same-name collision");
}

#[test]
fn per_user_isolation_of_tabs() {
    let svc = Service::new(100);
    make_tabs(&svc, "alice", &["A"]);
    make_tabs(&svc, "bob", &["X", "Y"]);
    assert_eq!(svc.list_tabs("alice").len(), 1);
    assert_eq!(svc.list_tabs("bob").len(), 2);
}

#[test]
fn command_tracker_stop_is_observable() {
    let tracker = CommandTracker::new();
    let token = tokio_util::sync::CancellationToken::new();
    tracker.register("tab-1", token.clone());
    assert!(!token.is_cancelled());
    assert!(tracker.stop("tab-1"));
    assert!(token.is_cancelled());
    // Stopping again (already unregistered or not) is a safe no-op report.
    tracker.unregister("tab-1");
    assert!(!tracker.stop("tab-1"));
}

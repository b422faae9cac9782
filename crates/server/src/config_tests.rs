use std::path::PathBuf;

use tempfile::tempdir;

use super::*;

fn base_config(repo_root: PathBuf) -> Config {
    Config {
        host: "0.0.0.0".to_string(),
        port: 2222,
        host_key_path: PathBuf::from("key"),
        repo_root,
        allowed_models: vec!["gpt-5.1".to_string()],
        available_themes: vec!["dark".to_string()],
        commit_model: "gpt-5.1-codex-mini".to_string(),
        disable_audit_logging: false,
        idle_prompt: "> ".to_string(),
        max_scrollback_lines: 10_000,
        usage_cache_ttl_secs: 1800,
        usage_bar_width: 10,
        state_dir: PathBuf::from("state"),
        agent_binary: None,
        log_format: "json".to_string(),
        log_level: "info".to_string(),
    }
}

#[test]
fn validate_accepts_defaults() {
    let dir = tempdir().expect("tempdir");
    assert!(base_config(dir.path().to_path_buf()).validate().is_ok());
}

#[test]
fn validate_creates_missing_repo_root() {
    let dir = tempdir().expect("tempdir");
    let repo_root = dir.path().join("repos");
    assert!(!repo_root.exists());
    assert!(base_config(repo_root.clone()).validate().is_ok());
    assert!(repo_root.is_dir());
}

#[test]
fn validate_rejects_repo_root_that_cannot_be_created() {
    let dir = tempdir().expect("tempdir");
    let file_path = dir.path().join("not-a-dir");
    std::fs::write(&file_path, b"x").expect("write");
    // `file_path` exists as a plain file, so a child path under it can
    // never be created as a directory.
    let repo_root = file_path.join("repos");
    assert!(base_config(repo_root).validate().is_err());
}

#[test]
fn validate_rejects_empty_allowed_models() {
    let dir = tempdir().expect("tempdir");
    let mut config = base_config(dir.path().to_path_buf());
    config.allowed_models.clear();
    assert!(config.validate().is_err());
}

#[test]
fn validate_rejects_empty_themes() {
    let dir = tempdir().expect("tempdir");
    let mut config = base_config(dir.path().to_path_buf());
    config.available_themes.clear();
    assert!(config.validate().is_err());
}

#[test]
fn validate_rejects_zero_port() {
    let dir = tempdir().expect("tempdir");
    let mut config = base_config(dir.path().to_path_buf());
    config.port = 0;
    assert!(config.validate().is_err());
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server configuration: a `clap::Parser` with `env`-backed fields,
//! following `coop::config::Config` field-for-field in spirit.

use std::path::PathBuf;

use clap::Parser;

/// Multi-tenant SSH-fronted interactive development server.
#[derive(Debug, Parser)]
#[command(name = "centaurx", version, about)]
pub struct Config {
    /// Host address to bind the SSH listener to.
    #[arg(long, env = "CENTAURX_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// TCP port to listen on.
    #[arg(long, env = "CENTAURX_PORT", default_value = "2222")]
    pub port: u16,

    /// Path to the server's SSH host key (generated on first run if missing).
    #[arg(long, env = "CENTAURX_HOST_KEY_PATH", default_value = "centaurx_host_key")]
    pub host_key_path: PathBuf,

    /// Root directory under which `<RepoRoot>/<user>/<name>` repos live.
    #[arg(long, env = "CENTAURX_REPO_ROOT")]
    pub repo_root: PathBuf,

    /// Comma-separated list of model ids allowed for `/model`.
    #[arg(long, env = "CENTAURX_ALLOWED_MODELS", value_delimiter = ',')]
    pub allowed_models: Vec<String>,

    /// Comma-separated list of theme names allowed for `/theme`.
    #[arg(long, env = "CENTAURX_AVAILABLE_THEMES", value_delimiter = ',', default_value = "dark,light")]
    pub available_themes: Vec<String>,

    /// Model used to generate commit messages for `/git commit` with no message.
    #[arg(long, env = "CENTAURX_COMMIT_MODEL", default_value = "gpt-5.1-codex-mini")]
    pub commit_model: String,

    /// Disable the structured audit log record emitted per dispatched command.
    #[arg(long, env = "CENTAURX_DISABLE_AUDIT_LOGGING")]
    pub disable_audit_logging: bool,

    /// Prompt string shown while a tab is idle.
    #[arg(long, env = "CENTAURX_IDLE_PROMPT", default_value = "> ")]
    pub idle_prompt: String,

    /// Maximum lines retained per scrollback buffer before front-truncation.
    #[arg(long, env = "CENTAURX_MAX_SCROLLBACK_LINES", default_value = "10000")]
    pub max_scrollback_lines: usize,

    /// Usage-info cache TTL, in seconds.
    #[arg(long, env = "CENTAURX_USAGE_CACHE_TTL_SECS", default_value = "1800")]
    pub usage_cache_ttl_secs: u64,

    /// Width (in characters) of the usage bar rendered by `/status`.
    #[arg(long, env = "CENTAURX_USAGE_BAR_WIDTH", default_value = "10")]
    pub usage_bar_width: usize,

    /// Directory holding per-user auth/persistence state
    /// (login pubkeys, git keys, TOTP secrets, persisted tabs).
    #[arg(long, env = "CENTAURX_STATE_DIR", default_value = "centaurx_state")]
    pub state_dir: PathBuf,

    /// Path to the agent binary the process runner invokes for agent
    /// turns. Left unset, `/prompt` and agent-driven commit messages fail
    /// with `unavailable` — the agent itself is out of scope here.
    #[arg(long, env = "CENTAURX_AGENT_BINARY")]
    pub agent_binary: Option<PathBuf>,

    /// Log format (json or text).
    #[arg(long, env = "CENTAURX_LOG_FORMAT", default_value = "json")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "CENTAURX_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// Validate the configuration after parsing.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.allowed_models.is_empty() {
            anyhow::bail!("--allowed-models must be non-empty");
        }
        if self.available_themes.is_empty() {
            anyhow::bail!("--available-themes must be non-empty");
        }
        if self.port == 0 {
            anyhow::bail!("--port must be nonzero");
        }
        if !self.repo_root.exists() {
            std::fs::create_dir_all(&self.repo_root)
                .map_err(|e| anyhow::anyhow!("--repo-root {} does not exist and could not be created: {e}", self.repo_root.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Duration;

use centaurx::auth::{FileGitKeyStore, FileLoginPubKeyStore, FileTotpValidator};
use centaurx::config::Config;
use centaurx::runner::ProcessRunnerProvider;
use centaurx::ssh::{Shared, SshServer};
use centaurx::{persistence, ssh};
use centaurx_core::auth::{GitKeyRotator, GitKeyStore, LoginAuthStore, LoginPubKeyStore, TotpValidator};
use centaurx_core::command::handler::{CommandHandler, HandlerConfig};
use centaurx_core::event_bus::EventBus;
use centaurx_core::runner::RunnerProvider;
use centaurx_core::service::Service;
use centaurx_core::usage_cache::UsageCache;
use clap::Parser;
use russh::server::Server as ServerTrait;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

/// Priority: `--log-level` / `CENTAURX_LOG_LEVEL` > `RUST_LOG` > `"info"`.
/// Uses `try_init` so it's safe to call more than once (e.g. from tests).
fn init_tracing(config: &Config) {
    let filter = if std::env::var("CENTAURX_LOG_LEVEL").is_err() && config.log_level == "info" {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level))
    } else {
        EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let result = match config.log_format.as_str() {
        "json" => fmt::fmt().with_env_filter(filter).json().try_init(),
        _ => fmt::fmt().with_env_filter(filter).try_init(),
    };
    drop(result);
}

const PERSISTENCE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() {
    let config = Config::parse();
    if let Err(e) = config.validate() {
        eprintln!("error: {e}");
        std::process::exit(2);
    }
    init_tracing(&config);

    if let Err(e) = run(config).await {
        error!("fatal: {e:#}");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    let service = Arc::new(Service::new(config.max_scrollback_lines));
    let event_bus = Arc::new(EventBus::new());
    service.set_event_bus(Arc::clone(&event_bus));

    let auth_dir = config.state_dir.join("auth");
    std::fs::create_dir_all(&auth_dir)?;
    let login_pubkey_store = Arc::new(FileLoginPubKeyStore::load(auth_dir.join("login_pubkeys.json"))?);
    let git_key_store = Arc::new(FileGitKeyStore::new(auth_dir.join("git_keys")));
    let totp_validator = Arc::new(FileTotpValidator::load(auth_dir.join("totp.json"))?);

    let tabs_dir = config.state_dir.join("tabs");
    persistence::load_all(&tabs_dir, &service);

    let repo_root = config.repo_root.to_string_lossy().to_string();
    let home_dir = dirs_home();
    let agent_binary = config.agent_binary.as_ref().map(|p| p.to_string_lossy().to_string());
    let runner_provider = Arc::new(ProcessRunnerProvider::new(repo_root.clone(), home_dir, agent_binary));

    let handler_config = HandlerConfig {
        repo_root,
        allowed_models: config.allowed_models.clone(),
        available_themes: config.available_themes.clone(),
        commit_model: config.commit_model.clone(),
        disable_audit_logging: config.disable_audit_logging,
        usage_bar_width: config.usage_bar_width,
        login_pubkey_store: Some(Arc::clone(&login_pubkey_store) as Arc<dyn LoginPubKeyStore>),
        git_key_store: Some(Arc::clone(&git_key_store) as Arc<dyn GitKeyStore>),
        git_key_rotator: Some(Arc::clone(&git_key_store) as Arc<dyn GitKeyRotator>),
    };
    let command_handler = Arc::new(CommandHandler::new(
        Arc::clone(&service),
        runner_provider as Arc<dyn RunnerProvider>,
        Arc::new(UsageCache::new(Duration::from_secs(config.usage_cache_ttl_secs))),
        handler_config,
    )?);

    let shared = Arc::new(Shared {
        service: Arc::clone(&service),
        command_handler,
        event_bus,
        login_auth_store: login_pubkey_store as Arc<dyn LoginAuthStore>,
        totp_validator: totp_validator as Arc<dyn TotpValidator>,
        idle_prompt: config.idle_prompt.clone(),
    });

    spawn_persistence_sweep(tabs_dir, Arc::clone(&service));

    let host_key = ssh::host_key::load_or_generate_host_key(&config.host_key_path)?;
    let mut ssh_config = russh::server::Config::default();
    ssh_config.keys.push(host_key);
    let ssh_config = Arc::new(ssh_config);

    let mut server = SshServer::new(shared);
    info!(host = %config.host, port = config.port, "centaurx listening");
    server.run_on_address(ssh_config, (config.host.as_str(), config.port)).await?;
    Ok(())
}

fn spawn_persistence_sweep(dir: std::path::PathBuf, service: Arc<Service>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PERSISTENCE_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            persistence::save_all(&dir, &service);
        }
    });
}

fn dirs_home() -> String {
    std::env::var("HOME").unwrap_or_else(|_| "/home/centaurx".to_string())
}

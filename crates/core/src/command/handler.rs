// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Command Handler: classifies input, dispatches slash commands to
//! the Service, and orchestrates streaming shell/agent work.
//!
//! Detached shell-command streaming mirrors `coop::session::groom`'s
//! spawned-task shape: the stream outlives the request that started it,
//! re-checking state after each await rather than holding a lock across
//! suspension points.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::auth::{GitKeyRotator, GitKeyStore, LoginPubKeyStore};
use crate::command::markers::{ABOUT_COPYRIGHT_MARKER, ABOUT_LINK_MARKER, ABOUT_VERSION_MARKER, HELP_MARKER, STDERR_MARKER};
use crate::command::parser::{classify, looks_like_git_url, Classified, Command};
use crate::command::status::{format_duration, render_status};
use crate::error::{CentaurxError, Result};
use crate::model::{ReasoningEffort, TabSnapshot, UsageInfo, SYSTEM_SHELL_TAB_ID};
use crate::runner::{AgentEvent, AgentRunRequest, RunCommandRequest, RunnerError, RunnerKey, RunnerProvider, Stream as RunnerStream};
use crate::service::Service;
use crate::usage_cache::UsageCache;

/// Knobs the Handler needs that come from server configuration, plus the
/// optional capability stores that gate key-management commands.
#[derive(Clone)]
pub struct HandlerConfig {
    pub repo_root: String,
    pub allowed_models: Vec<String>,
    pub available_themes: Vec<String>,
    pub commit_model: String,
    pub disable_audit_logging: bool,
    pub usage_bar_width: usize,
    pub login_pubkey_store: Option<Arc<dyn LoginPubKeyStore>>,
    pub git_key_store: Option<Arc<dyn GitKeyStore>>,
    pub git_key_rotator: Option<Arc<dyn GitKeyRotator>>,
}

impl HandlerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.allowed_models.is_empty() {
            return Err(CentaurxError::InvalidUsage("allowed_models must be non-empty".to_string()));
        }
        Ok(())
    }
}

/// Cheap to clone: every field is either an `Arc` or a `HandlerConfig`
/// whose own fields are `Arc`-backed — `dispatch_git`'s detached commit
/// task clones `self` to move an owned handle into `tokio::spawn`, the
/// same way `run_shell_inner`'s detached task moves a cloned `Arc<Service>`.
#[derive(Clone)]
pub struct CommandHandler {
    service: Arc<Service>,
    runner_provider: Arc<dyn RunnerProvider>,
    usage_cache: Arc<UsageCache>,
    config: HandlerConfig,
}

impl CommandHandler {
    /// Validate-then-bail, matching `coop::config::Config::validate`:
    /// an invalid `HandlerConfig` fails construction instead of producing
    /// a handler that fails every dispatch for the same reason.
    pub fn new(service: Arc<Service>, runner_provider: Arc<dyn RunnerProvider>, usage_cache: Arc<UsageCache>, config: HandlerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { service, runner_provider, usage_cache, config })
    }

    /// `Handle(ctx, user, tab, input) -> (handled, err)` (spec §4.2).
    ///
    /// `active_tab` is the tab the caller's Terminal Session currently
    /// has focused, if any. Slash commands that target a different tab
    /// (`/rm <n|name>`) resolve it themselves via the Service.
    pub async fn handle(&self, user_id: &str, active_tab: Option<&TabSnapshot>, input: &str) -> (bool, Result<()>) {
        let (handled, result, buffer_tab_id) = match classify(input) {
            Classified::Prompt(_) => return (false, Ok(())),
            Classified::InvalidSlash(raw) => {
                let err = Classified::invalid_command_error(&raw);
                (true, Err(err), active_tab.map(|t| t.id.clone()))
            }
            Classified::Shell(cmd) => {
                let tab_id = active_tab.map(|t| t.id.clone()).unwrap_or_else(|| SYSTEM_SHELL_TAB_ID.to_string());
                let result = self.run_shell(user_id, active_tab, &cmd).await;
                (true, result, Some(tab_id))
            }
            Classified::Slash(cmd) => {
                let tab_id = active_tab.map(|t| t.id.clone());
                let result = self.dispatch_slash(user_id, active_tab, &cmd).await;
                (true, result, tab_id)
            }
        };

        if let Err(err) = &result {
            if err.visible_in_buffer() {
                if let Some(tab_id) = &buffer_tab_id {
                    let _ = self.service.append_buffer(user_id, tab_id, [format!("error: {err}")]);
                }
            }
        }
        (handled, result)
    }

    fn audit(&self, command_type: &str, command: &str, workdir: Option<&str>) {
        if self.config.disable_audit_logging {
            return;
        }
        match workdir {
            Some(workdir) => debug!(command_type, command, workdir, "audit command"),
            None => debug!(command_type, command, "audit command"),
        }
    }

    // -- Slash dispatch ---------------------------------------------------

    async fn dispatch_slash(&self, user_id: &str, active_tab: Option<&TabSnapshot>, cmd: &Command) -> Result<()> {
        self.audit("slash", &format!("/{} {}", cmd.name, cmd.raw).trim_end(), None);
        match cmd.name.as_str() {
            "new" => self.dispatch_new(user_id, cmd).await,
            "listrepos" => self.dispatch_listrepos(user_id, active_tab),
            "rm" => self.dispatch_rm(user_id, cmd),
            "close" => self.dispatch_close(user_id),
            "model" => self.dispatch_model(user_id, active_tab, cmd),
            "stop" | "z" => self.dispatch_stop(user_id, active_tab),
            "renew" => self.dispatch_renew(user_id, active_tab),
            "git" => self.dispatch_git(user_id, active_tab, cmd).await,
            "theme" => self.dispatch_theme(user_id, cmd),
            "status" => self.dispatch_status(user_id, active_tab).await,
            "version" => self.dispatch_version(user_id, active_tab),
            "help" => self.dispatch_help(user_id, active_tab),
            "togglefullcommandoutput" => self.dispatch_toggle_full_output(user_id, active_tab),
            "addloginpubkey" => self.dispatch_add_login_pubkey(user_id, cmd),
            "listloginpubkeys" => self.dispatch_list_login_pubkeys(user_id, active_tab),
            "rmloginpubkey" => self.dispatch_rm_login_pubkey(user_id, cmd),
            "pubkey" => self.dispatch_pubkey(user_id, active_tab),
            "rotatesshkey" => self.dispatch_rotate_ssh_key(user_id, active_tab, cmd),
            other => Err(CentaurxError::InvalidUsage(format!("unknown command: /{other}"))),
        }
    }

    fn active_tab_id(&self, active_tab: Option<&TabSnapshot>) -> Result<String> {
        active_tab.map(|t| t.id.clone()).ok_or_else(|| CentaurxError::NotFound("no active tab".to_string()))
    }

    async fn dispatch_new(&self, user_id: &str, cmd: &Command) -> Result<()> {
        let target = cmd.args.first().ok_or_else(|| CentaurxError::InvalidUsage("usage: /new <repo|url>".to_string()))?;

        let repo = if looks_like_git_url(target) {
            let name = target.rsplit('/').next().unwrap_or(target).trim_end_matches(".git").to_string();
            let path = format!("{}/{user_id}/{name}", self.config.repo_root.trim_end_matches('/'));
            let (runner, info) = self.acquire_runner(user_id, SYSTEM_SHELL_TAB_ID).await?;
            self.audit("runner", &format!("git clone {target} {path}"), Some(&path));
            self.run_capture(&runner, &self.config.repo_root, &info, &format!("git clone {} {}", shell_quote(target), shell_quote(&path)), &CancellationToken::new()).await?;
            crate::model::Repo { name, path }
        } else {
            let name = target.to_string();
            let path = format!("{}/{user_id}/{name}", self.config.repo_root.trim_end_matches('/'));
            let (runner, info) = self.acquire_runner(user_id, SYSTEM_SHELL_TAB_ID).await?;
            self.audit("runner", &format!("mkdir -p {path}"), Some(&path));
            self.run_capture(&runner, &self.config.repo_root, &info, &format!("mkdir -p {}", shell_quote(&path)), &CancellationToken::new()).await?;
            crate::model::Repo { name, path }
        };

        let repo = self.service.register_repo(user_id, repo);
        let snapshot = self.service.create_tab(user_id, &repo.name, repo, &self.default_model());
        self.service.append_buffer(user_id, &snapshot.id, [format!("opened {} in tab {}", snapshot.repo.name, snapshot.name)])?;
        Ok(())
    }

    fn default_model(&self) -> String {
        self.config.allowed_models.first().cloned().unwrap_or_default()
    }

    fn dispatch_listrepos(&self, user_id: &str, active_tab: Option<&TabSnapshot>) -> Result<()> {
        let tab_id = self.active_tab_id(active_tab)?;
        let repos = self.service.list_repos(user_id);
        let lines = if repos.is_empty() {
            vec!["no repos".to_string()]
        } else {
            repos.into_iter().map(|r| format!("{} ({})", r.name, r.path)).collect()
        };
        self.service.append_buffer(user_id, &tab_id, lines)
    }

    fn dispatch_rm(&self, user_id: &str, cmd: &Command) -> Result<()> {
        let reference = cmd.args.first().ok_or_else(|| CentaurxError::InvalidUsage("usage: /rm <n|name>".to_string()))?;
        self.service.close_tab(user_id, reference).map(|_| ())
    }

    fn dispatch_close(&self, user_id: &str) -> Result<()> {
        self.service.close_active_tab(user_id).map(|_| ())
    }

    fn dispatch_model(&self, user_id: &str, active_tab: Option<&TabSnapshot>, cmd: &Command) -> Result<()> {
        let tab_id = self.active_tab_id(active_tab)?;
        let model = cmd.args.first().ok_or_else(|| CentaurxError::InvalidUsage("usage: /model <id> [low|medium|high|xhigh]".to_string()))?;
        if !self.config.allowed_models.iter().any(|m| m == model) {
            return Err(CentaurxError::InvalidUsage(format!("model not allowed: {model}")));
        }
        let effort = match cmd.args.get(1) {
            Some(raw) => Some(ReasoningEffort::parse(raw).ok_or_else(|| CentaurxError::InvalidUsage(format!("unknown reasoning effort: {raw}")))?),
            None => None,
        };
        self.service.set_model(user_id, &tab_id, model, effort)
    }

    fn dispatch_stop(&self, user_id: &str, active_tab: Option<&TabSnapshot>) -> Result<()> {
        let tab_id = active_tab.map(|t| t.id.clone()).unwrap_or_else(|| SYSTEM_SHELL_TAB_ID.to_string());
        self.service.commands.stop(&tab_id);
        // `/stop` is always permitted even if nothing was running (spec §5).
        let _ = self.service.end(user_id, &tab_id);
        Ok(())
    }

    fn dispatch_renew(&self, user_id: &str, active_tab: Option<&TabSnapshot>) -> Result<()> {
        let tab_id = self.active_tab_id(active_tab)?;
        self.service.renew_session(user_id, &tab_id)
    }

    fn dispatch_theme(&self, user_id: &str, cmd: &Command) -> Result<()> {
        match cmd.args.first() {
            None => Ok(()),
            Some(name) => {
                if !self.config.available_themes.iter().any(|t| t == name) {
                    return Err(CentaurxError::InvalidUsage(format!("unknown theme: {name}")));
                }
                self.service.set_theme(user_id, name);
                Ok(())
            }
        }
    }

    async fn dispatch_status(&self, user_id: &str, active_tab: Option<&TabSnapshot>) -> Result<()> {
        let tab = active_tab.ok_or_else(|| CentaurxError::NotFound("no active tab".to_string()))?;
        let usage = self.get_usage(user_id).await;
        let now = now_unix();
        let lines = render_status(tab, usage.as_ref().and_then(|r| r.as_ref().ok()), self.config.usage_bar_width, now);
        self.service.append_buffer(user_id, &tab.id, lines)
    }

    fn dispatch_version(&self, user_id: &str, active_tab: Option<&TabSnapshot>) -> Result<()> {
        let tab_id = self.active_tab_id(active_tab)?;
        let lines = [
            format!("{ABOUT_VERSION_MARKER}centaurx {}", env!("CARGO_PKG_VERSION")),
            format!("{ABOUT_COPYRIGHT_MARKER}Copyright (c) 2026 Alfred Jean LLC"),
            format!("{ABOUT_LINK_MARKER}https://github.com/alfredjeanlab/centaurx"),
        ];
        self.service.append_buffer(user_id, &tab_id, lines)
    }

    fn dispatch_help(&self, user_id: &str, active_tab: Option<&TabSnapshot>) -> Result<()> {
        let tab_id = self.active_tab_id(active_tab)?;
        self.service.append_buffer(user_id, &tab_id, HELP_LINES.iter().map(|s| format!("{HELP_MARKER}{s}")))
    }

    fn dispatch_toggle_full_output(&self, user_id: &str, active_tab: Option<&TabSnapshot>) -> Result<()> {
        let tab_id = self.active_tab_id(active_tab)?;
        let now_on = self.service.toggle_full_command_output(user_id);
        self.service.append_buffer(user_id, &tab_id, [format!("full command output: {}", if now_on { "on" } else { "off" })])
    }

    fn dispatch_add_login_pubkey(&self, user_id: &str, cmd: &Command) -> Result<()> {
        let store = self.config.login_pubkey_store.as_ref().ok_or(CentaurxError::Unconfigured("login pubkey store"))?;
        // `cmd.raw`, not `cmd.args.first()`: an SSH public key is itself
        // `<type> <base64> [comment]`, whitespace-separated.
        if cmd.raw.is_empty() {
            return Err(CentaurxError::InvalidUsage("usage: /addloginpubkey <pubkey>".to_string()));
        }
        store.add(&user_id.to_string(), &cmd.raw).map(|_| ())
    }

    fn dispatch_list_login_pubkeys(&self, user_id: &str, active_tab: Option<&TabSnapshot>) -> Result<()> {
        let store = self.config.login_pubkey_store.as_ref().ok_or(CentaurxError::Unconfigured("login pubkey store"))?;
        let tab_id = self.active_tab_id(active_tab)?;
        let keys = store.list(&user_id.to_string());
        let lines = if keys.is_empty() {
            vec!["no login pubkeys".to_string()]
        } else {
            keys.into_iter().map(|k| format!("{}: {}", k.id, k.pubkey)).collect()
        };
        self.service.append_buffer(user_id, &tab_id, lines)
    }

    fn dispatch_rm_login_pubkey(&self, user_id: &str, cmd: &Command) -> Result<()> {
        let store = self.config.login_pubkey_store.as_ref().ok_or(CentaurxError::Unconfigured("login pubkey store"))?;
        let id = cmd.args.first().ok_or_else(|| CentaurxError::InvalidUsage("usage: /rmloginpubkey <id>".to_string()))?;
        store.remove(&user_id.to_string(), id)
    }

    fn dispatch_pubkey(&self, user_id: &str, active_tab: Option<&TabSnapshot>) -> Result<()> {
        let store = self.config.git_key_store.as_ref().ok_or(CentaurxError::Unconfigured("git key store"))?;
        let tab_id = self.active_tab_id(active_tab)?;
        let key = store.public_key(&user_id.to_string())?;
        self.service.append_buffer(user_id, &tab_id, [key])
    }

    fn dispatch_rotate_ssh_key(&self, user_id: &str, active_tab: Option<&TabSnapshot>, cmd: &Command) -> Result<()> {
        let rotator = self.config.git_key_rotator.as_ref().ok_or(CentaurxError::Unconfigured("git key rotator"))?;
        if cmd.args.first().map(String::as_str) != Some("affirm") {
            return Err(CentaurxError::InvalidUsage("usage: /rotatesshkey affirm".to_string()));
        }
        let tab_id = self.active_tab_id(active_tab)?;
        let new_key = rotator.rotate(&user_id.to_string())?;
        self.service.append_buffer(user_id, &tab_id, [new_key])
    }

    // -- Git commit orchestration (spec §4.2.2) ---------------------------

    /// Kicks off `/git commit`. Acquiring the runner and resolving the
    /// working directory are fast and stay inline so a real usage error
    /// (no runner, bad repo mapping) surfaces to the caller immediately;
    /// the commit message generation (an agent turn) and the `git
    /// add`/`git commit` calls are the long pole and run detached,
    /// mirroring `run_shell`/`run_shell_inner`'s split (spec §5: "Handler
    /// spawns background fibers for streamed shell commands and agent
    /// turns").
    async fn dispatch_git(&self, user_id: &str, active_tab: Option<&TabSnapshot>, cmd: &Command) -> Result<()> {
        if cmd.args.first().map(String::as_str) != Some("commit") {
            return Err(CentaurxError::InvalidUsage("usage: /git commit [msg]".to_string()));
        }
        let tab = active_tab.ok_or_else(|| CentaurxError::NotFound("no active tab".to_string()))?;
        self.service.try_begin(user_id, &tab.id)?;
        let result = self.run_git_commit_inner(user_id, tab, cmd.raw.strip_prefix("commit").unwrap_or("").trim()).await;
        if result.is_err() {
            let _ = self.service.end(user_id, &tab.id);
        }
        result
    }

    async fn run_git_commit_inner(&self, user_id: &str, tab: &TabSnapshot, message: &str) -> Result<()> {
        let (runner, info) = self.acquire_runner(user_id, &tab.id).await?;
        let working_dir = self.resolve_working_dir(tab, &info)?;

        let token = CancellationToken::new();
        self.service.commands.register(&tab.id, token.clone());

        let handler = self.clone();
        let user_id = user_id.to_string();
        let tab = tab.clone();
        let message = message.to_string();
        tokio::spawn(async move {
            let result = handler.run_git_commit(&user_id, &tab, &runner, &working_dir, &info, &message, &token).await;
            if let Err(err) = &result {
                if err.visible_in_buffer() {
                    let _ = handler.service.append_buffer(&user_id, &tab.id, [format!("error: {err}")]);
                }
            }
            handler.service.commands.unregister(&tab.id);
            let _ = handler.service.end(&user_id, &tab.id);
        });

        Ok(())
    }

    async fn run_git_commit(&self, user_id: &str, tab: &TabSnapshot, runner: &Arc<dyn crate::runner::Runner>, working_dir: &str, info: &crate::model::RunnerInfo, message: &str, token: &CancellationToken) -> Result<()> {
        let message = if message.is_empty() {
            self.generate_commit_message(tab, runner, working_dir, token).await?
        } else {
            message.to_string()
        };

        self.audit("runner", "git add -A", Some(working_dir));
        self.run_capture(runner, working_dir, info, "git add -A", token).await?;
        let commit_cmd = format!("git commit -m {}", shell_quote(&message));
        self.audit("runner", &commit_cmd, Some(working_dir));
        self.run_capture(runner, working_dir, info, &commit_cmd, token).await?;
        self.service.append_buffer(user_id, &tab.id, [format!("committed: {message}")])
    }

    async fn generate_commit_message(&self, tab: &TabSnapshot, runner: &Arc<dyn crate::runner::Runner>, working_dir: &str, token: &CancellationToken) -> Result<String> {
        let prompt = "Give me a commit message according to conventionalcommits for the currently staged changes. Respond with a single line.".to_string();
        self.audit("codex", &prompt, Some(working_dir));
        let req = AgentRunRequest { prompt, model: self.config.commit_model.clone(), resume_session_id: tab.session_id.clone(), json: true };
        let mut handle = runner.run(req).await.map_err(runner_err)?;

        let mut last_message = String::new();
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    handle.close();
                    return Err(CentaurxError::Canceled);
                }
                event = handle.next_event() => match event {
                    Some(AgentEvent::AgentMessage { text }) => last_message = text,
                    Some(AgentEvent::TurnFailed { reason }) => {
                        handle.close();
                        return Err(CentaurxError::AgentFailure(reason));
                    }
                    Some(AgentEvent::Error { message }) => {
                        handle.close();
                        return Err(CentaurxError::AgentFailure(message));
                    }
                    Some(AgentEvent::TurnCompleted) => break,
                    Some(AgentEvent::ItemOutput { .. }) => {}
                    None => break,
                },
            }
        }
        handle.close();

        let first_line = last_message.lines().next().unwrap_or("").trim().to_string();
        if first_line.is_empty() {
            return Err(CentaurxError::AgentFailure("agent returned no commit message".to_string()));
        }
        Ok(first_line)
    }

    // -- Shell command orchestration (spec §4.2.1) -------------------------

    async fn run_shell(&self, user_id: &str, active_tab: Option<&TabSnapshot>, command: &str) -> Result<()> {
        if command.trim().is_empty() {
            return Err(CentaurxError::InvalidUsage("usage: !<command>".to_string()));
        }
        let tab_id = active_tab.map(|t| t.id.clone()).unwrap_or_else(|| SYSTEM_SHELL_TAB_ID.to_string());

        // Tab-busy enforcement applies before any runner work starts
        // (spec §3/§5): a bound tab can run at most one command at a time.
        if active_tab.is_some() {
            self.service.try_begin(user_id, &tab_id)?;
        }
        let result = self.run_shell_inner(user_id, active_tab, &tab_id, command).await;
        if result.is_err() && active_tab.is_some() {
            let _ = self.service.end(user_id, &tab_id);
        }
        result
    }

    async fn run_shell_inner(&self, user_id: &str, active_tab: Option<&TabSnapshot>, tab_id: &str, command: &str) -> Result<()> {
        let (runner, info) = self.acquire_runner(user_id, tab_id).await?;
        let working_dir = match active_tab {
            Some(tab) => self.resolve_working_dir(tab, &info)?,
            None => {
                if info.home_dir.is_empty() {
                    "/centaurx".to_string()
                } else {
                    info.home_dir.clone()
                }
            }
        };

        self.audit("shell", command, Some(&working_dir));

        let req = RunCommandRequest { working_dir: working_dir.clone(), command: command.to_string(), use_shell: true, ssh_auth_sock: info.ssh_auth_sock.clone() };
        let mut handle = runner.run_command(req).await.map_err(runner_err)?;

        let has_tab = active_tab.is_some();
        let echo = [format!("$ {command}")];
        if has_tab {
            self.service.append_buffer(user_id, tab_id, echo)?;
        } else {
            self.service.append_system_shell_buffer(user_id, echo);
        }

        let token = CancellationToken::new();
        self.service.commands.register(tab_id, token.clone());

        let tab_id = tab_id.to_string();
        let service = Arc::clone(&self.service);
        let user_id = user_id.to_string();
        tokio::spawn(async move {
            let start = Instant::now();
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        handle.close();
                        break;
                    }
                    line = handle.next_output() => {
                        match line {
                            Some(line) => {
                                let text = match line.stream {
                                    RunnerStream::Stdout => line.text,
                                    RunnerStream::Stderr => format!("{STDERR_MARKER}{}", line.text),
                                };
                                if has_tab {
                                    if let Err(err) = service.append_buffer(&user_id, &tab_id, [text]) {
                                        warn!(%err, tab_id = %tab_id, "failed to append shell output to buffer");
                                    }
                                } else {
                                    service.append_system_shell_buffer(&user_id, [text]);
                                }
                            }
                            None => break,
                        }
                    }
                }
            }
            let exit = handle.wait().await;
            handle.close();
            let elapsed = format_duration(start.elapsed().as_secs());
            let finished = [format!("--- command finished in {elapsed} (exit {}) ---", exit.exit_code)];
            if has_tab {
                let _ = service.append_buffer(&user_id, &tab_id, finished);
            } else {
                service.append_system_shell_buffer(&user_id, finished);
            }
            service.commands.unregister(&tab_id);
            if has_tab {
                let _ = service.end(&user_id, &tab_id);
            }
        });

        Ok(())
    }

    // -- Shared helpers -----------------------------------------------------

    async fn acquire_runner(&self, user_id: &str, tab_id: &str) -> Result<(Arc<dyn crate::runner::Runner>, crate::model::RunnerInfo)> {
        self.runner_provider.runner_for(RunnerKey { user_id: user_id.to_string(), tab_id: tab_id.to_string() }).await.map_err(runner_err)
    }

    /// Map a tab's host repo path to its in-container path (spec §4.2.1
    /// step 4): host `<RepoRoot>/<user>/<repo>` prefix-substituted for
    /// the runner-reported container `RepoRoot`, if different.
    fn resolve_working_dir(&self, tab: &TabSnapshot, info: &crate::model::RunnerInfo) -> Result<String> {
        let host_root = self.config.repo_root.trim_end_matches('/');
        if info.repo_root.trim_end_matches('/') == host_root {
            return Ok(tab.repo.path.clone());
        }
        let host_path = tab.repo.path.trim_end_matches('/');
        match host_path.strip_prefix(host_root) {
            Some(rest) => Ok(format!("{}{}", info.repo_root.trim_end_matches('/'), rest)),
            None => Err(CentaurxError::Io(format!("repo path {host_path} is not under configured repo root {host_root}"))),
        }
    }

    /// Run a command to completion and capture its output, failing if
    /// the exit code is non-zero (`runCommandAndCapture`, spec §4.2.2).
    /// Races each output chunk against `token` so a canceled caller's
    /// runner handle gets closed rather than leaked.
    async fn run_capture(&self, runner: &Arc<dyn crate::runner::Runner>, working_dir: &str, info: &crate::model::RunnerInfo, command: &str, token: &CancellationToken) -> Result<String> {
        let req = RunCommandRequest { working_dir: working_dir.to_string(), command: command.to_string(), use_shell: true, ssh_auth_sock: info.ssh_auth_sock.clone() };
        let mut handle = runner.run_command(req).await.map_err(runner_err)?;
        let mut out = String::new();
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    handle.close();
                    return Err(CentaurxError::Canceled);
                }
                line = handle.next_output() => match line {
                    Some(line) => {
                        out.push_str(&line.text);
                        out.push('\n');
                    }
                    None => break,
                },
            }
        }
        let exit = handle.wait().await;
        handle.close();
        if exit.exit_code != 0 {
            return Err(CentaurxError::RunnerFailure(format!("command failed (exit {}): {command}", exit.exit_code)));
        }
        Ok(out)
    }

    async fn get_usage(&self, user_id: &str) -> Option<std::result::Result<UsageInfo, RunnerError>> {
        if let Some(cached) = self.usage_cache.get(user_id) {
            return Some(cached);
        }
        let (runner, _info) = self.acquire_runner(user_id, SYSTEM_SHELL_TAB_ID).await.ok()?;
        let reader = runner.usage_reader()?;
        let result = reader.usage(&user_id.to_string()).await;
        if UsageCache::should_cache(&result) {
            self.usage_cache.put(user_id, result.clone());
        }
        self.service.publish_usage_updated(user_id);
        Some(result)
    }
}

/// Shell-quoting rule (spec §4.2.2): wrap in single quotes, escaping
/// embedded `'` as `'\''`. Empty string quotes to `''`.
pub fn shell_quote(s: &str) -> String {
    if s.is_empty() {
        return "''".to_string();
    }
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        if c == '\'' {
            out.push_str("'\\''");
        } else {
            out.push(c);
        }
    }
    out.push('\'');
    out
}

fn runner_err(err: RunnerError) -> CentaurxError {
    match err {
        RunnerError::Canceled => CentaurxError::Canceled,
        other => CentaurxError::RunnerFailure(other.to_string()),
    }
}

fn now_unix() -> i64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0)
}

const HELP_LINES: &[&str] = &[
    "Shell: !<command>",
    "Prompts: anything not starting with ! or /",
    "/new <repo|url>, /listrepos, /rm <n|name>, /close",
    "/model <id> [low|medium|high|xhigh]",
    "/stop, /z, /renew",
    "/git commit [msg]",
    "/theme [name]",
    "/status, /version, /togglefullcommandoutput",
    "/addloginpubkey <pubkey>, /listloginpubkeys, /rmloginpubkey <id>",
    "/pubkey, /rotatesshkey affirm",
];

#[cfg(test)]
#[path = "handler_tests.rs"]
mod tests;

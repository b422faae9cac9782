// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The SSH front door (spec §4.6): pubkey + keyboard-interactive (TOTP)
//! two-factor authentication, PTY enforcement, and per-channel Terminal
//! Session wiring.
//!
//! There's no server-side `russh` precedent anywhere in the retrieval
//! pack (the one SSH file in it, `ssh/client.rs`, is a *client* and uses
//! `async_trait`); this module is written from the `russh` 0.46 server
//! API directly, keeping this project's native-`async-fn`-in-trait
//! convention rather than reaching for `async_trait`.

pub mod host_key;

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;

use centaurx_core::auth::{LoginAuthStore, TotpValidator};
use centaurx_core::command::handler::CommandHandler;
use centaurx_core::event_bus::EventBus;
use centaurx_core::model::UserId;
use centaurx_core::service::Service;
use russh::server::{Auth, Handler, Msg, Response, Server as ServerTrait, Session};
use russh::{Channel, ChannelId, Pty};
use russh_keys::key::PublicKey;
use russh_keys::PublicKeyBase64;
use tracing::{debug, info, warn};

use crate::terminal::TerminalSession;

const CHALLENGE_PROMPT: &str = "Verification code: ";

/// State shared by every connection's [`SessionHandler`].
pub struct Shared {
    pub service: Arc<Service>,
    pub command_handler: Arc<CommandHandler>,
    pub event_bus: Arc<EventBus>,
    pub login_auth_store: Arc<dyn LoginAuthStore>,
    pub totp_validator: Arc<dyn TotpValidator>,
    pub idle_prompt: String,
}

/// The `russh::server::Server` factory: produces one [`SessionHandler`]
/// per inbound TCP connection.
#[derive(Clone)]
pub struct SshServer {
    shared: Arc<Shared>,
}

impl SshServer {
    pub fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }
}

impl ServerTrait for SshServer {
    type Handler = SessionHandler;

    fn new_client(&mut self, peer_addr: Option<SocketAddr>) -> SessionHandler {
        debug!(peer = ?peer_addr, "ssh: accepted connection");
        SessionHandler {
            shared: Arc::clone(&self.shared),
            user_id: None,
            pubkey_verified: false,
            pty_channels: HashSet::new(),
            terminals: HashMap::new(),
        }
    }
}

/// Per-connection authentication state and channel wiring.
///
/// `pubkey_verified` tracks the two-factor gate from spec §4.6: a
/// successful pubkey check never completes auth by itself (`auth_publickey`
/// always returns `Auth::reject`) — it only unlocks the keyboard-interactive
/// phase that follows.
pub struct SessionHandler {
    shared: Arc<Shared>,
    user_id: Option<UserId>,
    pubkey_verified: bool,
    pty_channels: HashSet<ChannelId>,
    terminals: HashMap<ChannelId, Arc<TerminalSession>>,
}

impl SessionHandler {
    fn user(&self) -> UserId {
        self.user_id.clone().unwrap_or_default()
    }

    fn check_totp(&self, user: &str, code: &str) -> bool {
        self.shared.totp_validator.validate_totp(&user.to_string(), code)
    }
}

impl Handler for SessionHandler {
    type Error = russh::Error;

    async fn auth_publickey_offered(&mut self, _user: &str, _public_key: &PublicKey) -> Result<Auth, Self::Error> {
        // Let every offered key through to `auth_publickey`, which does
        // the real check — `russh` calls this first as a cheap filter.
        Ok(Auth::Accept)
    }

    async fn auth_publickey(&mut self, user: &str, public_key: &PublicKey) -> Result<Auth, Self::Error> {
        let key_line = format!("{} {}", public_key.name(), public_key.public_key_base64());
        if self.shared.login_auth_store.has_login_pubkey(&user.to_string(), &key_line) {
            self.user_id = Some(user.to_string());
            self.pubkey_verified = true;
        } else {
            debug!(%user, "ssh: pubkey not recognized");
        }
        // Never accept on pubkey alone: force the keyboard-interactive
        // (TOTP) step regardless of outcome.
        Ok(Auth::Reject { proceed_with_methods: None })
    }

    async fn auth_keyboard_interactive(&mut self, user: &str, _submethods: &str, response: Option<Response<'_>>) -> Result<Auth, Self::Error> {
        if !self.pubkey_verified || self.user_id.as_deref() != Some(user) {
            // Never issue a challenge without a prior pubkey match (spec
            // §8 item 7): reject outright.
            return Ok(Auth::Reject { proceed_with_methods: None });
        }

        match response {
            None => Ok(Auth::Partial {
                name: "Centaurx".into(),
                instructions: String::new().into(),
                prompts: vec![(CHALLENGE_PROMPT.into(), true)].into(),
            }),
            Some(mut responses) => {
                let code = responses.next().map(|r| String::from_utf8_lossy(r).trim().to_string()).unwrap_or_default();
                if self.check_totp(user, &code) {
                    info!(%user, "ssh: authenticated");
                    Ok(Auth::Accept)
                } else {
                    warn!(%user, "ssh: invalid TOTP code");
                    Ok(Auth::Reject { proceed_with_methods: None })
                }
            }
        }
    }

    async fn channel_open_session(&mut self, _channel: Channel<Msg>, _session: &mut Session) -> Result<bool, Self::Error> {
        Ok(true)
    }

    async fn pty_request(
        &mut self,
        channel: ChannelId,
        _term: &str,
        _col_width: u32,
        _row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        _modes: &[(Pty, u32)],
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        self.pty_channels.insert(channel);
        Ok(())
    }

    async fn shell_request(&mut self, channel: ChannelId, session: &mut Session) -> Result<(), Self::Error> {
        if !self.pty_channels.contains(&channel) {
            let _ = session.data(channel, russh::CryptoVec::from(b"pty required\r\n".to_vec()));
            session.close(channel);
            return Ok(());
        }

        let terminal = TerminalSession::new(
            self.user(),
            channel,
            session.handle(),
            Arc::clone(&self.shared.service),
            Arc::clone(&self.shared.command_handler),
            Arc::clone(&self.shared.event_bus),
            self.shared.idle_prompt.clone(),
        );
        terminal.start().await;
        self.terminals.insert(channel, terminal);
        Ok(())
    }

    async fn data(&mut self, channel: ChannelId, data: &[u8], _session: &mut Session) -> Result<(), Self::Error> {
        if let Some(terminal) = self.terminals.get(&channel) {
            terminal.on_data(data).await;
        }
        Ok(())
    }

    async fn channel_close(&mut self, channel: ChannelId, _session: &mut Session) -> Result<(), Self::Error> {
        self.terminals.remove(&channel);
        self.pty_channels.remove(&channel);
        Ok(())
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

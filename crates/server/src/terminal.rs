// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Terminal Session: per-channel line editing, Command Handler
//! dispatch, and Event-Bus-driven re-rendering.
//!
//! Adapted from `coop::attach`'s read/write-through loop, but reactive
//! rather than loop-driven: `russh` hands input to [`TerminalSession::on_data`]
//! from its own `data()` callback instead of us polling a socket. Live
//! updates (another subscriber's command completing, usage refreshing)
//! arrive via a background task shaped like `mux::credential::distributor::spawn_distributor`:
//! it owns a cloned channel [`Handle`] so it can write independently of
//! the synchronous input path.

use std::collections::HashMap;
use std::sync::Arc;

use centaurx_core::command::handler::CommandHandler;
use centaurx_core::event_bus::EventBus;
use centaurx_core::model::{TabSnapshot, UserId};
use centaurx_core::service::Service;
use parking_lot::Mutex;
use russh::server::Handle;
use russh::ChannelId;
use russh::CryptoVec;
use tracing::debug;

const BACKSPACE: u8 = 0x7f;
const CTRL_H: u8 = 0x08;
const CTRL_C: u8 = 0x03;
const CARRIAGE_RETURN: u8 = b'\r';
const LINE_FEED: u8 = b'\n';

/// Tracks, per tab (or the synthetic system-shell buffer), how many
/// lines of its scrollback have already been written to the channel —
/// so re-renders only send the delta.
type RenderedCounts = Mutex<HashMap<String, usize>>;

/// What a single input byte means to the line editor, decoupled from the
/// channel write it triggers — kept separate from [`TerminalSession`] so
/// it can be unit tested without a `russh` channel handle.
#[derive(Debug, PartialEq, Eq)]
enum LineEvent {
    /// Echo this printable text back to the client.
    Echo(String),
    /// Erase one already-echoed character (caller writes the backspace
    /// sequence).
    Erase,
    /// Ctrl-C: the buffer was cleared: print `^C` and a fresh prompt.
    Interrupt,
    /// Enter: dispatch this line.
    Submit(String),
    /// Control byte with no effect (arrow keys, NUL, etc).
    Ignored,
}

/// Pure line buffer: accumulates printable bytes, answers what each byte
/// means. Kept free of any I/O so it's directly unit testable.
#[derive(Default)]
struct LineEditor {
    buf: String,
}

impl LineEditor {
    fn feed(&mut self, byte: u8) -> LineEvent {
        match byte {
            CARRIAGE_RETURN | LINE_FEED => LineEvent::Submit(std::mem::take(&mut self.buf)),
            BACKSPACE | CTRL_H => {
                if self.buf.pop().is_some() {
                    LineEvent::Erase
                } else {
                    LineEvent::Ignored
                }
            }
            CTRL_C => {
                self.buf.clear();
                LineEvent::Interrupt
            }
            _ => match std::str::from_utf8(&[byte]) {
                Ok(s) if !s.chars().all(|c| c.is_control()) => {
                    self.buf.push_str(s);
                    LineEvent::Echo(s.to_string())
                }
                _ => LineEvent::Ignored,
            },
        }
    }
}

/// Given how many lines of `key`'s buffer were already rendered and a
/// fresh full-buffer snapshot (`total_lines`, `lines`), returns the lines
/// not yet sent and updates `rendered`'s bookkeeping for `key`. Pure
/// beyond the `rendered` map mutation, so it's testable without a channel.
fn render_delta(rendered: &mut HashMap<String, usize>, key: &str, total_lines: usize, lines: &[String]) -> Vec<String> {
    let already = *rendered.get(key).unwrap_or(&0);
    if total_lines <= already {
        return Vec::new();
    }
    let skip = already.min(lines.len());
    let delta = lines[skip..].to_vec();
    rendered.insert(key.to_string(), total_lines);
    delta
}

pub struct TerminalSession {
    user_id: UserId,
    channel_id: ChannelId,
    handle: Handle,
    service: Arc<Service>,
    command_handler: Arc<CommandHandler>,
    idle_prompt: String,
    editor: Mutex<LineEditor>,
    rendered: Arc<RenderedCounts>,
}

impl TerminalSession {
    /// Build a session and spawn its Event-Bus-driven background
    /// renderer. `event_bus` is subscribed immediately; the subscription
    /// is dropped (and thus unsubscribed) when the spawned task exits,
    /// which happens once the channel handle can no longer write.
    pub fn new(user_id: UserId, channel_id: ChannelId, handle: Handle, service: Arc<Service>, command_handler: Arc<CommandHandler>, event_bus: Arc<EventBus>, idle_prompt: String) -> Arc<Self> {
        let session = Arc::new(Self { user_id: user_id.clone(), channel_id, handle, service, command_handler, idle_prompt, editor: Mutex::new(LineEditor::default()), rendered: Arc::new(Mutex::new(HashMap::new())) });

        let bg = Arc::clone(&session);
        tokio::spawn(async move {
            let mut subscription = event_bus.subscribe(user_id);
            while let Some(event) = subscription.recv().await {
                if bg.render_active_tab().await.is_err() {
                    break;
                }
                debug!(kind = ?event.kind, "terminal session re-rendered after event");
            }
        });

        session
    }

    async fn write(&self, text: &str) -> Result<(), CryptoVec> {
        self.handle.data(self.channel_id, CryptoVec::from(text.as_bytes().to_vec())).await
    }

    async fn write_line(&self, line: &str) {
        let _ = self.write(line).await;
        let _ = self.write("\r\n").await;
    }

    /// Called once when the channel's shell/PTY is ready.
    pub async fn start(&self) {
        let _ = self.render_active_tab().await;
        let _ = self.write(&self.idle_prompt).await;
    }

    /// Process one chunk of raw input bytes from the client.
    pub async fn on_data(&self, data: &[u8]) {
        for &byte in data {
            let event = self.editor.lock().feed(byte);
            match event {
                LineEvent::Echo(s) => {
                    let _ = self.write(&s).await;
                }
                LineEvent::Erase => {
                    let _ = self.write("\u{8} \u{8}").await;
                }
                LineEvent::Interrupt => {
                    let _ = self.write("^C\r\n").await;
                    let _ = self.write(&self.idle_prompt).await;
                }
                LineEvent::Submit(line) => {
                    let _ = self.write("\r\n").await;
                    self.submit(&line).await;
                }
                LineEvent::Ignored => {}
            }
        }
    }

    async fn submit(&self, input: &str) {
        if input.is_empty() {
            let _ = self.write(&self.idle_prompt).await;
            return;
        }
        let active = self.service.active_tab(&self.user_id);
        let (handled, result) = self.command_handler.handle(&self.user_id, active.as_ref(), input).await;
        if !handled {
            // Free-form prompt: out of scope here (the agent turn is
            // started by whatever drives Runner::run); just echo that
            // it was accepted.
            self.write_line("(prompt forwarded to agent)").await;
        }
        if let Err(err) = result {
            self.write_line(&format!("error: {err}")).await;
        }
        let _ = self.render_active_tab().await;
        let _ = self.write(&self.idle_prompt).await;
    }

    /// Re-render whatever's new in the active tab's buffer (or the
    /// system-shell buffer if no tab is active) since the last render.
    async fn render_active_tab(&self) -> Result<(), ()> {
        let active = self.service.active_tab(&self.user_id);
        let (key, snapshot) = match &active {
            Some(tab) => (tab.id.clone(), self.service.buffer_snapshot(&self.user_id, &tab.id, 0).map_err(|_| ())?),
            None => (centaurx_core::SYSTEM_SHELL_TAB_ID.to_string(), self.service.system_shell_buffer_snapshot(&self.user_id, 0)),
        };

        // `snapshot.lines` is the whole buffer (viewport=0); `render_delta`
        // works out the tail we haven't sent yet.
        let delta = render_delta(&mut self.rendered.lock(), &key, snapshot.total_lines, &snapshot.lines);
        for line in &delta {
            self.write_line(line).await;
        }
        Ok(())
    }

    pub fn active_tab_snapshot(&self) -> Option<TabSnapshot> {
        self.service.active_tab(&self.user_id)
    }
}

#[cfg(test)]
#[path = "terminal_tests.rs"]
mod tests;

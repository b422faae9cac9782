// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Input classifier and slash-command tokenizer (spec §4.1).

use crate::error::CentaurxError;

/// A tokenized slash command: `/name arg1 arg2…`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub args: Vec<String>,
    /// Verbatim remainder after the name, whitespace-trimmed at the
    /// front only — needed by commands like `/git commit <message>`
    /// that want the message as typed rather than re-joined tokens.
    pub raw: String,
}

/// The three input shapes a line can take (spec §4.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified {
    /// Leading `!`; remainder is a free-form shell command.
    Shell(String),
    /// Leading `/`, successfully tokenized.
    Slash(Command),
    /// A slash input that failed to tokenize (empty name).
    InvalidSlash(String),
    /// Anything else — forwarded to the agent untouched.
    Prompt(String),
}

/// Classify one line of input. Leading whitespace is stripped before
/// checking for `!`/`/`; the `Prompt` variant carries the input as-is.
pub fn classify(input: &str) -> Classified {
    let trimmed = input.trim_start();
    if let Some(rest) = trimmed.strip_prefix('!') {
        return Classified::Shell(rest.to_string());
    }
    if let Some(rest) = trimmed.strip_prefix('/') {
        return match parse_slash(rest) {
            Some(cmd) => Classified::Slash(cmd),
            None => Classified::InvalidSlash(trimmed.to_string()),
        };
    }
    Classified::Prompt(input.to_string())
}

/// Tokenize the remainder of a slash command (the part after `/`).
/// Returns `None` for an empty name — "invalid command" (spec §4.1).
fn parse_slash(rest: &str) -> Option<Command> {
    let rest = rest.trim_end();
    let split_at = rest.find(char::is_whitespace).unwrap_or(rest.len());
    let name = rest[..split_at].to_string();
    if name.is_empty() {
        return None;
    }
    let raw = rest[split_at..].trim_start().to_string();
    let args = raw.split_whitespace().map(str::to_string).collect();
    Some(Command { name, args, raw })
}

impl Classified {
    /// Convert an `InvalidSlash` into the error the Handler should
    /// surface; every other variant has no associated error.
    pub fn invalid_command_error(input: &str) -> CentaurxError {
        CentaurxError::InvalidUsage(format!("invalid command: {input}"))
    }
}

/// `looks-like-git-url(s)` (spec §4.2 classifier rule): `git@…`,
/// `ssh://…`, or anything containing a `/` is treated as a clone target
/// rather than a bare repo name.
pub fn looks_like_git_url(s: &str) -> bool {
    s.starts_with("git@") || s.starts_with("ssh://") || s.contains('/')
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;

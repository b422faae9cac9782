// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed `GitKeyStore`/`GitKeyRotator`: one ed25519 keypair per
//! user, generated on first use via `russh-keys` and persisted as a
//! PEM-encoded private key under the server's state directory.
//!
//! The runner forwards the matching SSH agent socket into container
//! commands (spec §3's `SSHAuthSock`); this store only manages the
//! keypair lifecycle, not the agent process itself.

use std::path::{Path, PathBuf};

use centaurx_core::auth::{GitKeyRotator, GitKeyStore};
use centaurx_core::error::{CentaurxError, Result};
use centaurx_core::model::UserId;
use parking_lot::RwLock;
use russh_keys::key::KeyPair;
use russh_keys::PublicKeyBase64;
use tracing::info;

pub struct FileGitKeyStore {
    dir: PathBuf,
    cache: RwLock<std::collections::HashMap<UserId, KeyPair>>,
}

impl FileGitKeyStore {
    /// `dir`'s parent must already exist; per-user keys are written to
    /// `<dir>/<user_id>.pem`.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { dir: dir.as_ref().to_path_buf(), cache: RwLock::new(std::collections::HashMap::new()) }
    }

    fn key_path(&self, user_id: &UserId) -> PathBuf {
        self.dir.join(format!("{user_id}.pem"))
    }

    fn load_or_generate(&self, user_id: &UserId) -> Result<KeyPair> {
        if let Some(existing) = self.cache.read().get(user_id) {
            return Ok(existing.clone());
        }
        let path = self.key_path(user_id);
        let keypair = if path.exists() {
            russh_keys::load_secret_key(&path, None).map_err(|e| CentaurxError::Io(format!("failed to load git ssh key: {e}")))?
        } else {
            let generated = KeyPair::generate_ed25519().ok_or_else(|| CentaurxError::Io("ed25519 keypair generation failed".to_string()))?;
            std::fs::create_dir_all(&self.dir)?;
            russh_keys::encode_pkcs8_pem(&generated, &path).map_err(|e| CentaurxError::Io(format!("failed to persist git ssh key: {e}")))?;
            info!(%user_id, "generated new git ssh keypair");
            generated
        };
        self.cache.write().insert(user_id.clone(), keypair.clone());
        Ok(keypair)
    }

    fn public_key_line(keypair: &KeyPair) -> String {
        format!("ssh-ed25519 {}", keypair.clone_public_key().public_key_base64())
    }
}

impl GitKeyStore for FileGitKeyStore {
    fn public_key(&self, user_id: &UserId) -> Result<String> {
        let keypair = self.load_or_generate(user_id)?;
        Ok(Self::public_key_line(&keypair))
    }
}

impl GitKeyRotator for FileGitKeyStore {
    fn rotate(&self, user_id: &UserId) -> Result<String> {
        let path = self.key_path(user_id);
        let generated = KeyPair::generate_ed25519().ok_or_else(|| CentaurxError::Io("ed25519 keypair generation failed".to_string()))?;
        std::fs::create_dir_all(&self.dir)?;
        russh_keys::encode_pkcs8_pem(&generated, &path).map_err(|e| CentaurxError::Io(format!("failed to persist rotated git ssh key: {e}")))?;
        self.cache.write().insert(user_id.clone(), generated.clone());
        info!(%user_id, "rotated git ssh keypair");
        Ok(Self::public_key_line(&generated))
    }
}

#[cfg(test)]
#[path = "git_key_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Loads the server's SSH host key from disk, generating and persisting
//! a fresh ed25519 key on first run (spec §6: "host-key stored at a
//! configured path (generated on first run)").

use std::path::Path;

use russh_keys::key::KeyPair;

use crate::error::ServerError;

pub fn load_or_generate_host_key(path: impl AsRef<Path>) -> Result<KeyPair, ServerError> {
    let path = path.as_ref();
    if path.exists() {
        return russh_keys::load_secret_key(path, None).map_err(|e| ServerError::HostKeyIo(e.to_string()));
    }
    let keypair = KeyPair::generate_ed25519().ok_or_else(|| ServerError::HostKeyIo("ed25519 keypair generation failed".to_string()))?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ServerError::HostKeyIo(e.to_string()))?;
    }
    russh_keys::encode_pkcs8_pem(&keypair, path).map_err(|e| ServerError::HostKeyIo(e.to_string()))?;
    tracing::info!(path = %path.display(), "generated new SSH host key");
    Ok(keypair)
}

#[cfg(test)]
#[path = "host_key_tests.rs"]
mod tests;

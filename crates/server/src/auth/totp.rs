// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed `TotpValidator`: one RFC 6238 secret per user, persisted
//! as base32 alongside the login pubkey store. Generation (`/totpsecret`
//! style enrollment flows) is out of scope for the SSH front door itself
//! — this store only validates codes against secrets it's given.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use centaurx_core::auth::TotpValidator;
use centaurx_core::error::{CentaurxError, Result};
use centaurx_core::model::UserId;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use totp_rs::{Algorithm, Secret, TOTP};
use tracing::warn;

#[derive(Default, Serialize, Deserialize)]
struct OnDisk {
    /// user_id -> base32-encoded TOTP secret
    secrets: HashMap<UserId, String>,
}

pub struct FileTotpValidator {
    path: PathBuf,
    secrets: RwLock<HashMap<UserId, String>>,
}

impl FileTotpValidator {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let on_disk = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str::<OnDisk>(&raw).map_err(|e| CentaurxError::Io(format!("corrupt totp secret store: {e}")))?
        } else {
            OnDisk::default()
        };
        Ok(Self { path, secrets: RwLock::new(on_disk.secrets) })
    }

    fn persist(&self) {
        let on_disk = OnDisk { secrets: self.secrets.read().clone() };
        match serde_json::to_string_pretty(&on_disk) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&self.path, json) {
                    warn!(error = %e, "failed to persist totp secret store");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize totp secret store"),
        }
    }

    /// Enroll a user with a freshly generated secret, returning its
    /// base32 encoding for display in an authenticator app. Overwrites
    /// any existing secret for this user.
    pub fn enroll(&self, user_id: &UserId) -> String {
        let secret = Secret::generate_secret().to_encoded().to_string();
        self.secrets.write().insert(user_id.clone(), secret.clone());
        self.persist();
        secret
    }

    fn totp_for(&self, user_id: &UserId) -> Option<TOTP> {
        let encoded = self.secrets.read().get(user_id)?.clone();
        let secret = Secret::Encoded(encoded).to_bytes().ok()?;
        TOTP::new(Algorithm::SHA1, 6, 1, 30, secret).ok()
    }
}

impl TotpValidator for FileTotpValidator {
    fn validate_totp(&self, user_id: &UserId, code: &str) -> bool {
        match self.totp_for(user_id) {
            Some(totp) => totp.check_current(code).unwrap_or(false),
            None => false,
        }
    }
}

#[cfg(test)]
#[path = "totp_tests.rs"]
mod tests;

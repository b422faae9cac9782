// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed `LoginPubKeyStore`/`LoginAuthStore`: one JSON file per
//! server, `{user_id: [LoginPubKey]}`, held in memory behind a
//! `parking_lot::RwLock` and flushed to disk on every mutation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use centaurx_core::auth::{LoginAuthStore, LoginPubKey, LoginPubKeyStore};
use centaurx_core::error::{CentaurxError, Result};
use centaurx_core::model::UserId;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Record {
    id: String,
    pubkey: String,
}

impl From<&Record> for LoginPubKey {
    fn from(r: &Record) -> Self {
        LoginPubKey { id: r.id.clone(), pubkey: r.pubkey.clone() }
    }
}

#[derive(Default, Serialize, Deserialize)]
struct OnDisk {
    keys: HashMap<UserId, Vec<Record>>,
}

pub struct FileLoginPubKeyStore {
    path: PathBuf,
    keys: RwLock<HashMap<UserId, Vec<Record>>>,
    next_id: AtomicU64,
}

impl FileLoginPubKeyStore {
    /// Load from `path` if it exists, otherwise start empty. `path`'s
    /// parent directory must already exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let on_disk = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str::<OnDisk>(&raw).map_err(|e| CentaurxError::Io(format!("corrupt login pubkey store: {e}")))?
        } else {
            OnDisk::default()
        };
        let next_id = on_disk.keys.values().flatten().filter_map(|r| r.id.parse::<u64>().ok()).max().map(|n| n + 1).unwrap_or(0);
        Ok(Self { path, keys: RwLock::new(on_disk.keys), next_id: AtomicU64::new(next_id) })
    }

    fn persist(&self) {
        let on_disk = OnDisk { keys: self.keys.read().clone() };
        match serde_json::to_string_pretty(&on_disk) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&self.path, json) {
                    warn!(error = %e, path = %self.path.display(), "failed to persist login pubkey store");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize login pubkey store"),
        }
    }
}

impl LoginPubKeyStore for FileLoginPubKeyStore {
    fn add(&self, user_id: &UserId, pubkey: &str) -> Result<LoginPubKey> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed).to_string();
        let record = Record { id, pubkey: pubkey.to_string() };
        self.keys.write().entry(user_id.clone()).or_default().push(record.clone());
        self.persist();
        Ok(LoginPubKey::from(&record))
    }

    fn list(&self, user_id: &UserId) -> Vec<LoginPubKey> {
        self.keys.read().get(user_id).map(|v| v.iter().map(LoginPubKey::from).collect()).unwrap_or_default()
    }

    fn remove(&self, user_id: &UserId, id: &str) -> Result<()> {
        let mut keys = self.keys.write();
        let list = keys.entry(user_id.clone()).or_default();
        let before = list.len();
        list.retain(|r| r.id != id);
        if list.len() == before {
            return Err(CentaurxError::NotFound(format!("login pubkey not found: {id}")));
        }
        drop(keys);
        self.persist();
        Ok(())
    }
}

impl LoginAuthStore for FileLoginPubKeyStore {
    fn has_login_pubkey(&self, user_id: &UserId, key: &str) -> bool {
        self.keys.read().get(user_id).is_some_and(|keys| keys.iter().any(|r| r.pubkey == key))
    }
}

#[cfg(test)]
#[path = "pubkey_store_tests.rs"]
mod tests;

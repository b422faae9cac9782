// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Capability traits the Command Handler and SSH front door consume for
//! login-pubkey and git-SSH-key management. Concrete (file/db-backed)
//! implementations live in the `centaurx` server crate — secret
//! persistence layout is explicitly out of scope here (spec §1).

use crate::error::Result;
use crate::model::UserId;

/// One registered login public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginPubKey {
    pub id: String,
    pub pubkey: String,
}

/// Queried by the SSH front door's pubkey phase (spec §4.6).
pub trait LoginAuthStore: Send + Sync {
    fn has_login_pubkey(&self, user_id: &UserId, key: &str) -> bool;
}

/// Queried/mutated by `/addloginpubkey`, `/listloginpubkeys`,
/// `/rmloginpubkey`.
pub trait LoginPubKeyStore: Send + Sync {
    fn add(&self, user_id: &UserId, pubkey: &str) -> Result<LoginPubKey>;
    fn list(&self, user_id: &UserId) -> Vec<LoginPubKey>;
    fn remove(&self, user_id: &UserId, id: &str) -> Result<()>;
}

/// Queried by `/pubkey`: the user's git-forwarding SSH public key.
pub trait GitKeyStore: Send + Sync {
    fn public_key(&self, user_id: &UserId) -> Result<String>;
}

/// Invoked by `/rotatesshkey affirm`: replaces the user's git SSH
/// keypair and returns the new public key.
pub trait GitKeyRotator: Send + Sync {
    fn rotate(&self, user_id: &UserId) -> Result<String>;
}

/// Validates a TOTP code during the SSH front door's keyboard-interactive
/// phase (spec §4.6).
pub trait TotpValidator: Send + Sync {
    fn validate_totp(&self, user_id: &UserId, code: &str) -> bool;
}

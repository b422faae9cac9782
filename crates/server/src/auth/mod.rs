// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Concrete, file-backed implementations of `centaurx_core::auth`'s
//! capability traits.
//!
//! Shaped after `coop::credential::CredentialBroker`: named entities
//! keyed by user id, held behind a `parking_lot::RwLock<HashMap<..>>`,
//! persisted to disk as `serde_json`.

pub mod git_key;
pub mod pubkey_store;
pub mod totp;

pub use git_key::FileGitKeyStore;
pub use pubkey_store::FileLoginPubKeyStore;
pub use totp::FileTotpValidator;

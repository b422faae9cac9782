use std::sync::Arc;

use centaurx_core::auth::LoginPubKeyStore;
use centaurx_core::command::handler::{CommandHandler, HandlerConfig};
use centaurx_core::runner::RunnerProvider;
use centaurx_core::service::Service;
use centaurx_core::test_support::{test_runner_info, FakeLoginPubKeyStore, FakeRunnerProvider, FakeTotpValidator};
use centaurx_core::usage_cache::UsageCache;
use russh_keys::key::KeyPair;
use russh_keys::PublicKeyBase64;

use super::*;

fn handler_config() -> HandlerConfig {
    HandlerConfig {
        repo_root: "/repos".to_string(),
        allowed_models: vec!["gpt-5.1".to_string()],
        available_themes: vec!["dark".to_string()],
        commit_model: "gpt-5.1-codex-mini".to_string(),
        disable_audit_logging: true,
        usage_bar_width: 10,
        login_pubkey_store: None,
        git_key_store: None,
        git_key_rotator: None,
    }
}

fn session_handler(login_auth_store: Arc<FakeLoginPubKeyStore>, totp: Arc<FakeTotpValidator>) -> SessionHandler {
    let service = Arc::new(Service::new(1000));
    let provider = Arc::new(FakeRunnerProvider::new(test_runner_info("/repos")));
    let command_handler = Arc::new(CommandHandler::new(Arc::clone(&service), provider as Arc<dyn RunnerProvider>, Arc::new(UsageCache::new(UsageCache::DEFAULT_TTL)), handler_config()).expect("valid handler config"));
    let shared = Arc::new(Shared {
        service,
        command_handler,
        event_bus: Arc::new(EventBus::new()),
        login_auth_store: login_auth_store as Arc<dyn LoginAuthStore>,
        totp_validator: totp as Arc<dyn TotpValidator>,
        idle_prompt: "> ".to_string(),
    });
    SessionHandler { shared, user_id: None, pubkey_verified: false, pty_channels: HashSet::new(), terminals: HashMap::new() }
}

fn test_public_key() -> PublicKey {
    KeyPair::generate_ed25519().expect("ed25519 keygen").clone_public_key()
}

#[tokio::test]
async fn auth_publickey_sets_verified_and_still_rejects_for_known_key() {
    let store = Arc::new(FakeLoginPubKeyStore::new());
    let key = test_public_key();
    let key_line = format!("ssh-ed25519 {}", key.public_key_base64());
    store.add(&"alice".to_string(), &key_line).unwrap();
    let mut handler = session_handler(store, Arc::new(FakeTotpValidator::new()));

    let result = handler.auth_publickey("alice", &key).await.unwrap();
    assert!(matches!(result, Auth::Reject { .. }));
    assert!(handler.pubkey_verified);
    assert_eq!(handler.user_id.as_deref(), Some("alice"));
}

#[tokio::test]
async fn auth_publickey_rejects_and_leaves_unverified_for_unknown_key() {
    let store = Arc::new(FakeLoginPubKeyStore::new());
    let key = test_public_key();
    let mut handler = session_handler(store, Arc::new(FakeTotpValidator::new()));

    let result = handler.auth_publickey("alice", &key).await.unwrap();
    assert!(matches!(result, Auth::Reject { .. }));
    assert!(!handler.pubkey_verified);
}

#[tokio::test]
async fn keyboard_interactive_without_prior_pubkey_is_rejected_without_challenge() {
    let store = Arc::new(FakeLoginPubKeyStore::new());
    let mut handler = session_handler(store, Arc::new(FakeTotpValidator::new()));

    let result = handler.auth_keyboard_interactive("alice", "", None).await.unwrap();
    assert!(matches!(result, Auth::Reject { .. }));
}

#[tokio::test]
async fn keyboard_interactive_issues_one_challenge_after_pubkey_ok() {
    let store = Arc::new(FakeLoginPubKeyStore::new());
    let key = test_public_key();
    let key_line = format!("ssh-ed25519 {}", key.public_key_base64());
    store.add(&"alice".to_string(), &key_line).unwrap();
    let mut handler = session_handler(store, Arc::new(FakeTotpValidator::new()));
    handler.auth_publickey("alice", &key).await.unwrap();

    let result = handler.auth_keyboard_interactive("alice", "", None).await.unwrap();
    match result {
        Auth::Partial { prompts, .. } => assert_eq!(prompts.len(), 1),
        _ => panic!("expected a single challenge"),
    }
}

#[test]
fn check_totp_validates_against_the_configured_code() {
    let totp = Arc::new(FakeTotpValidator::new());
    totp.set_valid_code("alice", "123456");
    let handler = session_handler(Arc::new(FakeLoginPubKeyStore::new()), totp);

    assert!(handler.check_totp("alice", "123456"));
    assert!(!handler.check_totp("alice", "000000"));
}

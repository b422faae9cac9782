use russh_keys::PublicKeyBase64;
use tempfile::tempdir;

use super::*;

#[test]
fn generates_and_persists_on_first_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("host_key");
    assert!(!path.exists());
    let _ = load_or_generate_host_key(&path).unwrap();
    assert!(path.exists());
}

#[test]
fn second_load_reuses_persisted_key() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("host_key");
    let first = load_or_generate_host_key(&path).unwrap();
    let second = load_or_generate_host_key(&path).unwrap();
    assert_eq!(first.clone_public_key().public_key_base64(), second.clone_public_key().public_key_base64());
}

use tempfile::tempdir;

use super::*;

#[test]
fn add_list_remove_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pubkeys.json");
    let store = FileLoginPubKeyStore::load(&path).unwrap();

    let key = store.add(&"alice".to_string(), "ssh-ed25519 AAA").unwrap();
    assert_eq!(store.list(&"alice".to_string()).len(), 1);
    assert!(store.has_login_pubkey(&"alice".to_string(), "ssh-ed25519 AAA"));
    assert!(!store.has_login_pubkey(&"bob".to_string(), "ssh-ed25519 AAA"));

    store.remove(&"alice".to_string(), &key.id).unwrap();
    assert!(store.list(&"alice".to_string()).is_empty());
}

#[test]
fn remove_unknown_id_errors() {
    let dir = tempdir().unwrap();
    let store = FileLoginPubKeyStore::load(dir.path().join("pubkeys.json")).unwrap();
    assert!(store.remove(&"alice".to_string(), "999").is_err());
}

#[test]
fn reload_persists_across_instances() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pubkeys.json");
    {
        let store = FileLoginPubKeyStore::load(&path).unwrap();
        store.add(&"alice".to_string(), "ssh-ed25519 AAA").unwrap();
    }
    let reloaded = FileLoginPubKeyStore::load(&path).unwrap();
    assert_eq!(reloaded.list(&"alice".to_string()).len(), 1);
}

use tempfile::tempdir;
use totp_rs::{Algorithm, Secret, TOTP};

use super::*;

#[test]
fn enrolled_code_validates() {
    let dir = tempdir().unwrap();
    let store = FileTotpValidator::load(dir.path().join("totp.json")).unwrap();
    let encoded = store.enroll(&"alice".to_string());

    let secret = Secret::Encoded(encoded).to_bytes().unwrap();
    let totp = TOTP::new(Algorithm::SHA1, 6, 1, 30, secret).unwrap();
    let code = totp.generate_current().unwrap();

    assert!(store.validate_totp(&"alice".to_string(), &code));
    assert!(!store.validate_totp(&"alice".to_string(), "000000"));
}

#[test]
fn unenrolled_user_never_validates() {
    let dir = tempdir().unwrap();
    let store = FileTotpValidator::load(dir.path().join("totp.json")).unwrap();
    assert!(!store.validate_totp(&"nobody".to_string(), "123456"));
}

#[test]
fn reload_persists_secret_across_instances() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("totp.json");
    let encoded = {
        let store = FileTotpValidator::load(&path).unwrap();
        store.enroll(&"alice".to_string())
    };
    let reloaded = FileTotpValidator::load(&path).unwrap();
    let secret = Secret::Encoded(encoded).to_bytes().unwrap();
    let totp = TOTP::new(Algorithm::SHA1, 6, 1, 30, secret).unwrap();
    let code = totp.generate_current().unwrap();
    assert!(reloaded.validate_totp(&"alice".to_string(), &code));
}

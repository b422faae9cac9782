use super::*;

#[test]
fn code_matches_variant() {
    assert_eq!(ServerError::AuthRejected.code(), ServerErrorCode::AuthRejected);
    assert_eq!(ServerError::PtyRequired.code(), ServerErrorCode::PtyRequired);
    assert_eq!(ServerError::HostKeyIo("x".to_string()).code(), ServerErrorCode::HostKeyIo);
}

#[test]
fn as_str_is_stable() {
    assert_eq!(ServerErrorCode::AuthRejected.as_str(), "AUTH_REJECTED");
    assert_eq!(ServerErrorCode::PtyRequired.as_str(), "PTY_REQUIRED");
}

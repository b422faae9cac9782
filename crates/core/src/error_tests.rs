// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn kind_is_stable_per_variant() {
    assert_eq!(CentaurxError::TabBusy.kind(), "tab_busy");
    assert_eq!(CentaurxError::Canceled.kind(), "canceled");
    assert_eq!(CentaurxError::Unconfigured("pubkey store").kind(), "unconfigured");
}

#[test]
fn canceled_is_not_visible_in_buffer() {
    assert!(!CentaurxError::Canceled.visible_in_buffer());
    assert!(CentaurxError::TabBusy.visible_in_buffer());
    assert!(CentaurxError::RunnerFailure("boom".into()).visible_in_buffer());
}

#[test]
fn display_messages_match_spec_wording() {
    assert_eq!(CentaurxError::InvalidUsage("/model requires an id".into()).to_string(), "usage: /model requires an id");
    assert_eq!(CentaurxError::Unconfigured("git key store").to_string(), "git key store not configured");
}

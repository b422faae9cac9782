// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use yare::parameterized;

use super::*;

#[test]
fn shell_strips_bang_and_leading_whitespace() {
    assert_eq!(classify("  !echo hi"), Classified::Shell("echo hi".to_string()));
}

#[test]
fn slash_tokenizes_name_args_and_raw() {
    let Classified::Slash(cmd) = classify("/model gpt-5.1 medium") else { panic!("expected Slash") };
    assert_eq!(cmd.name, "model");
    assert_eq!(cmd.args, vec!["gpt-5.1", "medium"]);
    assert_eq!(cmd.raw, "gpt-5.1 medium");
}

#[test]
fn slash_raw_preserves_inner_whitespace_for_commit_messages() {
    let Classified::Slash(cmd) = classify("/git commit   fix:  the   thing") else { panic!() };
    assert_eq!(cmd.name, "git");
    assert_eq!(cmd.raw, "commit   fix:  the   thing");
}

#[test]
fn bare_slash_is_invalid() {
    assert!(matches!(classify("/"), Classified::InvalidSlash(_)));
    assert!(matches!(classify("/   "), Classified::InvalidSlash(_)));
}

#[test]
fn anything_else_is_a_prompt() {
    assert_eq!(classify("fix the bug in main.rs"), Classified::Prompt("fix the bug in main.rs".to_string()));
}

#[test]
fn slash_without_args_has_empty_raw() {
    let Classified::Slash(cmd) = classify("/status") else { panic!() };
    assert_eq!(cmd.name, "status");
    assert!(cmd.args.is_empty());
    assert_eq!(cmd.raw, "");
}

#[parameterized(
    ssh_colon = { "git@host:x/y.git", true },
    ssh_scheme = { "ssh://host/x", true },
    owner_repo = { "owner/repo", true },
    bare_name = { "myrepo", false },
)]
fn s3_git_url_detection(input: &str, expected: bool) {
    assert_eq!(looks_like_git_url(input), expected);
}

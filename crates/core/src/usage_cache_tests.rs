// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use super::*;
use crate::model::UsageInfo;

fn sample() -> UsageInfo {
    UsageInfo { chatgpt: false, primary: None, secondary: None, input_tokens: 10, output_tokens: 20 }
}

#[test]
fn miss_before_any_put() {
    let cache = UsageCache::new(Duration::from_secs(60));
    assert!(cache.get("alice").is_none());
}

#[test]
fn hit_within_ttl() {
    let cache = UsageCache::new(Duration::from_secs(60));
    cache.put("alice", Ok(sample()));
    assert!(cache.get("alice").is_some());
}

#[test]
fn expires_after_ttl() {
    let cache = UsageCache::new(Duration::from_millis(10));
    cache.put("alice", Ok(sample()));
    std::thread::sleep(Duration::from_millis(30));
    assert!(cache.get("alice").is_none());
}

#[test]
fn canceled_fetch_is_not_cacheable() {
    assert!(!UsageCache::should_cache(&Err(RunnerError::Canceled)));
    assert!(UsageCache::should_cache(&Ok(sample())));
    assert!(UsageCache::should_cache(&Err(RunnerError::Unavailable("x".into()))));
}

#[test]
fn per_user_isolation() {
    let cache = UsageCache::new(Duration::from_secs(60));
    cache.put("alice", Ok(sample()));
    assert!(cache.get("bob").is_none());
}

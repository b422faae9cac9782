// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-user usage-info cache with a fixed TTL.
//!
//! Mirrors the cache-with-expiry shape in `coop::credential`'s account
//! bookkeeping, but keyed by user rather than by account and exposing a
//! single `get_or_fetch` entry point (spec §4.2.4).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::model::{UserId, UsageInfo};
use crate::runner::RunnerError;

struct CacheEntry {
    value: Result<UsageInfo, RunnerError>,
    fetched_at: Instant,
}

/// Mutex-protected usage cache, keyed by user, with a fixed TTL.
pub struct UsageCache {
    ttl: Duration,
    entries: Mutex<HashMap<UserId, CacheEntry>>,
}

impl UsageCache {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entries: Mutex::new(HashMap::new()) }
    }

    /// Return the cached value if it's within TTL, else `None`.
    pub fn get(&self, user_id: &str) -> Option<Result<UsageInfo, RunnerError>> {
        let entries = self.entries.lock();
        let entry = entries.get(user_id)?;
        if entry.fetched_at.elapsed() < self.ttl {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    /// Record a fresh fetch result. Per spec §4.2.4: a canceled or
    /// timed-out fetch must not be cached — callers should not call this
    /// for those outcomes (see [`Self::should_cache`]).
    pub fn put(&self, user_id: impl Into<UserId>, value: Result<UsageInfo, RunnerError>) {
        self.entries.lock().insert(user_id.into(), CacheEntry { value, fetched_at: Instant::now() });
    }

    /// Whether a fetch outcome is eligible to be cached: cancellation is
    /// excluded so a transient cancel doesn't poison the cache for the
    /// full TTL.
    pub fn should_cache(result: &Result<UsageInfo, RunnerError>) -> bool {
        !matches!(result, Err(RunnerError::Canceled))
    }
}

#[cfg(test)]
#[path = "usage_cache_tests.rs"]
mod tests;

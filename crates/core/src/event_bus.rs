// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-user fanout of state-change events to subscribed UIs.
//!
//! Delivery is best-effort: [`EventBus::publish`] must never block the
//! producer. A slow subscriber's queue fills up; the oldest queued
//! event for that subscriber is evicted to make room for the new one
//! (drop-oldest, spec §9c), and a debug line is logged — the rest of
//! the fanout proceeds unaffected.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::Notify;
use tracing::debug;

use crate::model::{Event, UserId};

/// Bound on each subscriber's queue. Tuned generously since events are
/// small JSON payloads and subscribers are expected to drain promptly;
/// overflow only happens for a genuinely stuck UI.
const SUBSCRIBER_CAPACITY: usize = 256;

type SubscriberId = u64;

/// A subscriber's mailbox: a bounded FIFO plus a waker for `recv`.
struct SubscriberQueue {
    queue: Mutex<VecDeque<Event>>,
    notify: Notify,
    closed: AtomicBool,
}

impl SubscriberQueue {
    fn new() -> Self {
        Self { queue: Mutex::new(VecDeque::new()), notify: Notify::new(), closed: AtomicBool::new(false) }
    }
}

struct Subscribers {
    next_id: AtomicU64,
    by_user: RwLock<HashMap<UserId, HashMap<SubscriberId, Arc<SubscriberQueue>>>>,
}

/// Per-user pub/sub used to notify live UIs of state changes.
pub struct EventBus {
    subs: Arc<Subscribers>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle returned by [`EventBus::subscribe`]; dropping it unsubscribes.
pub struct Subscription {
    user_id: UserId,
    id: SubscriberId,
    subs: Arc<Subscribers>,
    queue: Option<Arc<SubscriberQueue>>,
}

impl Subscription {
    /// Wait for the next event. Returns `None` once unsubscribed (either
    /// explicitly or via `Drop`) with no events left queued.
    pub async fn recv(&mut self) -> Option<Event> {
        let queue = self.queue.as_ref()?;
        loop {
            // Register for a wakeup before checking, so a publish that
            // lands between the check and the await isn't missed.
            let notified = queue.notify.notified();
            if let Some(event) = queue.queue.lock().pop_front() {
                return Some(event);
            }
            if queue.closed.load(Ordering::Acquire) {
                return None;
            }
            notified.await;
        }
    }

    /// Explicitly unsubscribe. Idempotent: a second call is a no-op.
    pub fn unsubscribe(&mut self) {
        if let Some(queue) = self.queue.take() {
            queue.closed.store(true, Ordering::Release);
            queue.notify.notify_waiters();
            if let Some(subs) = self.subs.by_user.write().get_mut(&self.user_id) {
                subs.remove(&self.id);
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self { subs: Arc::new(Subscribers { next_id: AtomicU64::new(0), by_user: RwLock::new(HashMap::new()) }) }
    }

    /// Subscribe to events for `user_id`. Returns a [`Subscription`]
    /// whose `Drop` unsubscribes automatically.
    pub fn subscribe(&self, user_id: impl Into<UserId>) -> Subscription {
        let user_id = user_id.into();
        let id = self.subs.next_id.fetch_add(1, Ordering::Relaxed);
        let queue = Arc::new(SubscriberQueue::new());
        self.subs.by_user.write().entry(user_id.clone()).or_default().insert(id, Arc::clone(&queue));
        Subscription { user_id, id, subs: Arc::clone(&self.subs), queue: Some(queue) }
    }

    /// Fan out `event` to every current subscriber for `event.user_id`.
    /// Never blocks: a full subscriber queue evicts its oldest entry to
    /// make room and logs at debug.
    pub fn publish(&self, event: Event) {
        let by_user = self.subs.by_user.read();
        let Some(subscribers) = by_user.get(&event.user_id) else { return };
        for (id, queue) in subscribers.iter() {
            let mut q = queue.queue.lock();
            if q.len() >= SUBSCRIBER_CAPACITY {
                q.pop_front();
                debug!(user_id = %event.user_id, subscriber = id, kind = ?event.kind, "event bus: evicting oldest event for slow subscriber");
            }
            q.push_back(event.clone());
            drop(q);
            queue.notify.notify_one();
        }
    }

    /// Number of live subscribers for a user (test/observability helper).
    pub fn subscriber_count(&self, user_id: &str) -> usize {
        self.subs.by_user.read().get(user_id).map(|m| m.len()).unwrap_or(0)
    }
}

#[cfg(test)]
#[path = "event_bus_tests.rs"]
mod tests;

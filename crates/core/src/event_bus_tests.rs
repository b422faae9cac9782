// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::model::EventKind;

fn event(user: &str) -> Event {
    Event { user_id: user.to_string(), kind: EventKind::TabUpdated, payload: serde_json::json!({}) }
}

#[tokio::test]
async fn publish_delivers_to_same_user_subscriber() {
    let bus = EventBus::new();
    let mut sub = bus.subscribe("alice");
    bus.publish(event("alice"));
    let received = sub.recv().await.expect("event delivered");
    assert_eq!(received.user_id, "alice");
}

#[tokio::test]
async fn publish_does_not_cross_users() {
    let bus = EventBus::new();
    let mut alice_sub = bus.subscribe("alice");
    bus.publish(event("bob"));
    // No event for alice; dropping the runtime without a message would hang,
    // so race it against a short timeout instead.
    let result = tokio::time::timeout(std::time::Duration::from_millis(50), alice_sub.recv()).await;
    assert!(result.is_err(), "alice should not receive bob's event");
}

#[tokio::test]
async fn fifo_per_subscriber() {
    let bus = EventBus::new();
    let mut sub = bus.subscribe("alice");
    for i in 0..5 {
        let mut e = event("alice");
        e.payload = serde_json::json!({ "i": i });
        bus.publish(e);
    }
    for i in 0..5 {
        let e = sub.recv().await.expect("event");
        assert_eq!(e.payload["i"], i);
    }
}

#[tokio::test]
async fn publish_never_blocks_on_full_subscriber_and_drops_oldest() {
    let bus = EventBus::new();
    let mut sub = bus.subscribe("alice");
    let overflow = 10;
    let total = super::SUBSCRIBER_CAPACITY + overflow;
    // Overflow the bounded queue; publish must still return promptly.
    for i in 0..total {
        let mut e = event("alice");
        e.payload = serde_json::json!({ "i": i });
        bus.publish(e);
    }
    // The oldest `overflow` events were evicted to make room for the rest.
    let first = sub.recv().await.expect("event");
    assert_eq!(first.payload["i"], overflow);
    let mut last = first;
    while let Ok(Some(e)) = tokio::time::timeout(std::time::Duration::from_millis(50), sub.recv()).await {
        last = e;
    }
    assert_eq!(last.payload["i"], total - 1);
}

#[tokio::test]
async fn unsubscribe_stops_delivery_and_is_idempotent() {
    let bus = EventBus::new();
    let mut sub = bus.subscribe("alice");
    assert_eq!(bus.subscriber_count("alice"), 1);
    sub.unsubscribe();
    sub.unsubscribe();
    assert_eq!(bus.subscriber_count("alice"), 0);
}

#[tokio::test]
async fn drop_unsubscribes() {
    let bus = EventBus::new();
    let sub = bus.subscribe("alice");
    assert_eq!(bus.subscriber_count("alice"), 1);
    drop(sub);
    assert_eq!(bus.subscriber_count("alice"), 0);
}

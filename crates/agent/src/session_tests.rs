// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the session store

use super::*;
use muster_core::FakeClock;
use std::collections::HashSet;

fn store(max_sessions: usize, ttl_secs: u64, max_history: usize) -> (SessionStore<FakeClock>, FakeClock) {
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_000_000);
    let store = SessionStore::new(clock.clone(), max_sessions, Duration::from_secs(ttl_secs), max_history);
    (store, clock)
}

#[test]
fn minted_ids_are_128_bit_and_unique() {
    let (store, _) = store(100, 3600, 50);
    let mut seen = HashSet::new();
    for _ in 0..50 {
        let id = store.get_or_create(None);
        // 128 bits as 32 hex chars
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(seen.insert(id));
    }
}

#[test]
fn known_id_resumes_its_history() {
    let (store, _) = store(100, 3600, 50);
    let id = store.get_or_create(None);
    store.append(&id, Role::User, "My name is Alice");
    store.append(&id, Role::Assistant, "Hello Alice");

    let same = store.get_or_create(Some(&id));
    assert_eq!(same, id);
    let history = store.history(&id);
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, Role::User);
    assert_eq!(history[0].text, "My name is Alice");
}

#[test]
fn unknown_supplied_id_starts_fresh_under_that_id() {
    let (store, _) = store(100, 3600, 50);
    let id = store.get_or_create(Some("hop-propagated"));
    assert_eq!(id, "hop-propagated");
    assert!(store.history(&id).is_empty());
}

#[test]
fn append_to_unknown_session_is_a_no_op() {
    let (store, _) = store(100, 3600, 50);
    store.append("ghost", Role::User, "hello");
    assert!(store.history("ghost").is_empty());
    assert!(!store.contains("ghost"));
}

#[test]
fn history_caps_at_max_history_most_recent() {
    let (store, _) = store(100, 3600, 3);
    let id = store.get_or_create(None);
    for i in 0..10 {
        store.append(&id, Role::User, format!("msg-{}", i));
    }
    let history = store.history(&id);
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].text, "msg-7");
    assert_eq!(history[2].text, "msg-9");
}

#[test]
fn lru_eviction_drops_least_recently_accessed() {
    let (store, clock) = store(2, 3600, 50);
    let a = store.get_or_create(None);
    clock.advance(Duration::from_secs(1));
    let b = store.get_or_create(None);
    clock.advance(Duration::from_secs(1));
    // touch a so b becomes the oldest
    store.history(&a);
    clock.advance(Duration::from_secs(1));
    let c = store.get_or_create(None);

    assert_eq!(store.len(), 2);
    assert!(store.contains(&a));
    assert!(!store.contains(&b));
    assert!(store.contains(&c));
}

#[test]
fn idle_sessions_expire_lazily() {
    let (store, clock) = store(100, 60, 50);
    let id = store.get_or_create(None);
    store.append(&id, Role::User, "hello");

    clock.advance(Duration::from_secs(61));
    // next access sweeps the expired entry
    let fresh = store.get_or_create(Some(&id));
    assert_eq!(fresh, id);
    assert!(store.history(&id).is_empty(), "expired session kept its history");
}

#[test]
fn active_sessions_survive_the_ttl_window() {
    let (store, clock) = store(100, 60, 50);
    let id = store.get_or_create(None);
    store.append(&id, Role::User, "hello");

    for _ in 0..5 {
        clock.advance(Duration::from_secs(30));
        store.history(&id); // keeps it warm
    }
    let _ = store.get_or_create(None);
    assert!(store.contains(&id));
    assert_eq!(store.history(&id).len(), 1);
}

#[test]
fn messages_are_ordered_by_insert_time() {
    let (store, clock) = store(100, 3600, 50);
    let id = store.get_or_create(None);
    store.append(&id, Role::User, "first");
    clock.advance(Duration::from_millis(5));
    store.append(&id, Role::Assistant, "second");

    let history = store.history(&id);
    assert!(history[0].timestamp_ms < history[1].timestamp_ms);
}

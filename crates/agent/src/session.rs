// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-agent session store.
//!
//! In-memory, process-local, intentionally non-persistent: a restarted agent
//! starts with empty history. LRU eviction over `max_sessions` plus lazy TTL
//! eviction on access. The lock is a plain mutex held only for map
//! operations, never across awaits.

use muster_core::Clock;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

muster_core::simple_display! {
    Role {
        User => "user",
        Assistant => "assistant",
    }
}

/// One conversation turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMessage {
    pub role: Role,
    pub text: String,
    pub timestamp_ms: u64,
}

/// One session's state; messages are append-only.
#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: String,
    pub messages: Vec<SessionMessage>,
    pub created_at_ms: u64,
    pub last_accessed_ms: u64,
}

/// Session store bounded by entry count and idle TTL.
pub struct SessionStore<C: Clock> {
    clock: C,
    max_sessions: usize,
    ttl: Duration,
    max_history: usize,
    inner: Mutex<HashMap<String, Session>>,
}

impl<C: Clock> SessionStore<C> {
    pub fn new(clock: C, max_sessions: usize, ttl: Duration, max_history: usize) -> Self {
        SessionStore {
            clock,
            max_sessions: max_sessions.max(1),
            ttl,
            max_history: max_history.max(1),
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Return the id for this request, minting a fresh 128-bit id when the
    /// caller supplied none or an unknown/expired one.
    pub fn get_or_create(&self, session_id: Option<&str>) -> String {
        let now = self.clock.epoch_ms();
        let mut inner = self.inner.lock();
        Self::evict_expired(&mut inner, now, self.ttl);

        if let Some(id) = session_id {
            if let Some(session) = inner.get_mut(id) {
                session.last_accessed_ms = now;
                return session.session_id.clone();
            }
        }

        let id = match session_id {
            // an unknown caller-supplied id becomes a new session under that
            // id, preserving continuity across agent hops
            Some(id) => id.to_string(),
            None => uuid::Uuid::new_v4().simple().to_string(),
        };
        let session = Session {
            session_id: id.clone(),
            messages: Vec::new(),
            created_at_ms: now,
            last_accessed_ms: now,
        };
        inner.insert(id.clone(), session);
        Self::evict_lru(&mut inner, self.max_sessions);
        id
    }

    pub fn append(&self, session_id: &str, role: Role, text: impl Into<String>) {
        let now = self.clock.epoch_ms();
        let mut inner = self.inner.lock();
        if let Some(session) = inner.get_mut(session_id) {
            session.messages.push(SessionMessage {
                role,
                text: text.into(),
                timestamp_ms: now,
            });
            session.last_accessed_ms = now;
        }
    }

    /// Most recent messages, capped at `max_history`.
    pub fn history(&self, session_id: &str) -> Vec<SessionMessage> {
        let now = self.clock.epoch_ms();
        let mut inner = self.inner.lock();
        match inner.get_mut(session_id) {
            Some(session) => {
                session.last_accessed_ms = now;
                let skip = session.messages.len().saturating_sub(self.max_history);
                session.messages[skip..].to_vec()
            }
            None => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.inner.lock().contains_key(session_id)
    }

    fn evict_expired(inner: &mut HashMap<String, Session>, now: u64, ttl: Duration) {
        let ttl_ms = ttl.as_millis() as u64;
        if ttl_ms == 0 {
            return;
        }
        inner.retain(|_, s| now.saturating_sub(s.last_accessed_ms) <= ttl_ms);
    }

    fn evict_lru(inner: &mut HashMap<String, Session>, max_sessions: usize) {
        while inner.len() > max_sessions {
            let Some(oldest) = inner
                .values()
                .min_by_key(|s| s.last_accessed_ms)
                .map(|s| s.session_id.clone())
            else {
                break;
            };
            inner.remove(&oldest);
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;

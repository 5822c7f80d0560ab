//! TTL-bounded correlation store.
//!
//! Replaces ad hoc process-lifetime maps for transient per-user state
//! (rate-limit backoff deadlines, pending re-auth flags): every entry
//! carries an explicit expiry, expired entries are swept on insert and on
//! demand, and the map can never grow without bound across the process
//! lifetime.
//!
//! `now` is injected on every call so expiry is deterministic under test.

use std::collections::HashMap;

use chrono::Duration;

use crate::types::Timestamp;

struct Entry<V> {
    value: V,
    expires_at: Timestamp,
}

/// An expiring key/value store keyed by caller keys or generated tokens.
pub struct CorrelationStore<V> {
    entries: HashMap<String, Entry<V>>,
}

impl<V> Default for CorrelationStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> CorrelationStore<V> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Insert under a caller-chosen key, replacing any previous entry.
    /// Sweeps expired entries first so inserts keep the map bounded.
    pub fn insert(&mut self, key: impl Into<String>, value: V, ttl: Duration, now: Timestamp) {
        self.sweep(now);
        self.entries.insert(
            key.into(),
            Entry {
                value,
                expires_at: now + ttl,
            },
        );
    }

    /// Insert under a freshly generated correlation token and return it.
    pub fn insert_token(&mut self, value: V, ttl: Duration, now: Timestamp) -> String {
        let token = uuid::Uuid::new_v4().to_string();
        self.insert(token.clone(), value, ttl, now);
        token
    }

    /// Look up a live entry. Expired entries read as absent.
    pub fn get(&self, key: &str, now: Timestamp) -> Option<&V> {
        self.entries
            .get(key)
            .filter(|e| e.expires_at > now)
            .map(|e| &e.value)
    }

    /// Remove an entry, returning its value if it was still live.
    pub fn remove(&mut self, key: &str, now: Timestamp) -> Option<V> {
        self.entries
            .remove(key)
            .filter(|e| e.expires_at > now)
            .map(|e| e.value)
    }

    /// Drop every expired entry; returns how many were removed.
    pub fn sweep(&mut self, now: Timestamp) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| e.expires_at > now);
        before - self.entries.len()
    }

    /// Number of entries currently held, including not-yet-swept expired ones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 6, 3, 12, 0, 0).unwrap()
    }

    #[test]
    fn live_entry_is_readable() {
        let mut store = CorrelationStore::new();
        store.insert("user-1", 42, Duration::minutes(5), t0());
        assert_eq!(store.get("user-1", t0() + Duration::minutes(4)), Some(&42));
    }

    #[test]
    fn expired_entry_reads_as_absent() {
        let mut store = CorrelationStore::new();
        store.insert("user-1", 42, Duration::minutes(5), t0());
        assert_eq!(store.get("user-1", t0() + Duration::minutes(5)), None);
    }

    #[test]
    fn sweep_drops_only_expired() {
        let mut store = CorrelationStore::new();
        store.insert("a", 1, Duration::minutes(1), t0());
        store.insert("b", 2, Duration::minutes(10), t0());
        let dropped = store.sweep(t0() + Duration::minutes(2));
        assert_eq!(dropped, 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("b", t0() + Duration::minutes(2)), Some(&2));
    }

    #[test]
    fn insert_sweeps_expired_entries() {
        let mut store = CorrelationStore::new();
        store.insert("a", 1, Duration::minutes(1), t0());
        store.insert("b", 2, Duration::minutes(1), t0() + Duration::minutes(2));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn generated_tokens_are_unique_and_resolvable() {
        let mut store = CorrelationStore::new();
        let t1 = store.insert_token("first", Duration::minutes(5), t0());
        let t2 = store.insert_token("second", Duration::minutes(5), t0());
        assert_ne!(t1, t2);
        assert_eq!(store.get(&t1, t0()), Some(&"first"));
        assert_eq!(store.remove(&t2, t0()), Some("second"));
        assert_eq!(store.get(&t2, t0()), None);
    }
}

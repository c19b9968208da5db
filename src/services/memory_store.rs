// src/services/memory_store.rs
//! In-process stand-ins for the Redis keyspace: expiring values and sets.
//! Reads check expiry; every write also sweeps entries that have expired.

use crate::services::clock::Clock;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

struct Entry<V> {
    value: V,
    expires_at: Option<DateTime<Utc>>,
}

impl<V> Entry<V> {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| now < at).unwrap_or(true)
    }
}

pub struct ExpiringMap<V> {
    entries: Mutex<HashMap<String, Entry<V>>>,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> ExpiringMap<V> {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    pub fn set_ex(&self, key: &str, value: V, ttl: Duration) {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        entries.retain(|_, entry| entry.is_live(now));
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Some(now + chrono_ttl(ttl)),
            },
        );
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        let live = entries.get(key).map(|entry| entry.is_live(now));
        match live {
            Some(true) => entries.get(key).map(|entry| entry.value.clone()),
            Some(false) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Entries still in memory, expired or not.
    #[cfg(test)]
    fn held(&self) -> usize {
        self.entries.lock().len()
    }
}

impl ExpiringMap<i64> {
    /// INCR semantics: the first increment starts the expiry window, later
    /// ones leave it alone. The whole step runs under one lock.
    pub fn incr_with_expiry(&self, key: &str, ttl: Duration) -> i64 {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get_mut(key).filter(|entry| entry.is_live(now)) {
            entry.value += 1;
            return entry.value;
        }
        entries.retain(|_, entry| entry.is_live(now));
        entries.insert(
            key.to_string(),
            Entry {
                value: 1,
                expires_at: Some(now + chrono_ttl(ttl)),
            },
        );
        1
    }
}

/// Sets without expiry, keyed like `user:{owner}:shares`.
#[derive(Default)]
pub struct SetMap {
    sets: Mutex<HashMap<String, BTreeSet<String>>>,
}

impl SetMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the member was not present yet.
    pub fn sadd(&self, key: &str, member: &str) -> bool {
        self.sets
            .lock()
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string())
    }

    pub fn smembers(&self, key: &str) -> Vec<String> {
        self.sets
            .lock()
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }
}

fn chrono_ttl(ttl: Duration) -> chrono::Duration {
    chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(365))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::mocks::ManualClock;

    #[test]
    fn values_expire_after_ttl() {
        let clock = Arc::new(ManualClock::default());
        let map: ExpiringMap<String> = ExpiringMap::new(clock.clone());
        map.set_ex("share:1", "snapshot".to_string(), Duration::from_secs(60));

        clock.advance(chrono::Duration::seconds(59));
        assert_eq!(map.get("share:1").as_deref(), Some("snapshot"));

        clock.advance(chrono::Duration::seconds(1));
        assert_eq!(map.get("share:1"), None);
        assert_eq!(map.held(), 0);
    }

    #[test]
    fn writes_sweep_entries_nobody_reads_again() {
        let clock = Arc::new(ManualClock::default());
        let map: ExpiringMap<String> = ExpiringMap::new(clock.clone());
        for i in 0..1000 {
            map.set_ex(&format!("share:{}", i), "snapshot".to_string(), Duration::from_secs(60));
        }
        assert_eq!(map.held(), 1000);

        clock.advance(chrono::Duration::hours(48));
        map.set_ex("share:fresh", "snapshot".to_string(), Duration::from_secs(60));
        assert_eq!(map.held(), 1);
        assert_eq!(map.get("share:fresh").as_deref(), Some("snapshot"));
    }

    #[test]
    fn new_counter_windows_sweep_stale_days() {
        let clock = Arc::new(ManualClock::default());
        let counters: ExpiringMap<i64> = ExpiringMap::new(clock.clone());
        let ttl = Duration::from_secs(24 * 60 * 60);
        for caller in 0..50 {
            counters.incr_with_expiry(&format!("runs:{}:20260301", caller), ttl);
        }

        clock.advance(chrono::Duration::hours(25));
        assert_eq!(counters.incr_with_expiry("runs:0:20260302", ttl), 1);
        assert_eq!(counters.held(), 1);
    }

    #[test]
    fn counter_window_starts_on_first_increment() {
        let clock = Arc::new(ManualClock::default());
        let counters: ExpiringMap<i64> = ExpiringMap::new(clock.clone());
        let ttl = Duration::from_secs(100);

        assert_eq!(counters.incr_with_expiry("runs:a", ttl), 1);
        clock.advance(chrono::Duration::seconds(90));
        assert_eq!(counters.incr_with_expiry("runs:a", ttl), 2);
        clock.advance(chrono::Duration::seconds(10));
        assert_eq!(counters.incr_with_expiry("runs:a", ttl), 1);
    }

    #[test]
    fn set_insertion_is_idempotent() {
        let sets = SetMap::new();
        assert!(sets.sadd("user:u:shares", "a"));
        assert!(!sets.sadd("user:u:shares", "a"));
        assert!(sets.sadd("user:u:shares", "b"));
        assert_eq!(sets.smembers("user:u:shares"), vec!["a", "b"]);
        assert!(sets.smembers("user:other:shares").is_empty());
    }
}

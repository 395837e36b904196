use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::utils::clock::Clock;

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub data: Value,
    pub timestamp: DateTime<Utc>,
}

impl CacheEntry {
    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }
}

/// Builds the cache key for an upstream path and its raw query string.
///
/// Query parameters are kept in the order given, so `?a=1&b=2` and
/// `?b=2&a=1` are different keys.
pub fn cache_key(path: &str, query: Option<&str>) -> String {
    match query {
        Some(query) => format!("{}?{}", path, query),
        None => path.to_string(),
    }
}

/// In-memory store of upstream JSON payloads.
///
/// Entries stay valid until the next local midnight, regardless of when in
/// the day they were fetched.
pub struct ResponseCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    clock: Arc<dyn Clock>,
}

impl ResponseCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        self.entries.lock().get(key).cloned()
    }

    pub fn is_valid(&self, entry: &CacheEntry) -> bool {
        entry.timestamp >= self.clock.start_of_day()
    }

    /// Returns the payload for `key` only if it was fetched today.
    pub fn get_valid(&self, key: &str) -> Option<Value> {
        let start_of_day = self.clock.start_of_day();
        let entries = self.entries.lock();
        entries
            .get(key)
            .filter(|entry| entry.timestamp >= start_of_day)
            .map(|entry| entry.data.clone())
    }

    pub fn put(&self, key: impl Into<String>, data: Value) {
        let entry = CacheEntry {
            data,
            timestamp: self.clock.now(),
        };
        self.entries.lock().insert(key.into(), entry);
    }

    /// Drops every entry fetched before today's midnight and returns how
    /// many were removed.
    pub fn sweep(&self) -> usize {
        let start_of_day = self.clock.start_of_day();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|key, entry| {
            let keep = entry.timestamp >= start_of_day;
            if !keep {
                debug!("Evicting stale cache entry {}", key);
            }
            keep
        });
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::clock::ManualClock;
    use chrono::{DateTime, Duration, FixedOffset};
    use serde_json::json;

    fn at(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn cache_at(s: &str) -> (ResponseCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(at(s)));
        (ResponseCache::new(clock.clone()), clock)
    }

    #[test]
    fn key_joins_path_and_query() {
        assert_eq!(
            cache_key("/matches", Some("dateFrom=2024-01-01&dateTo=2024-01-07")),
            "/matches?dateFrom=2024-01-01&dateTo=2024-01-07"
        );
        assert_eq!(cache_key("/competitions", None), "/competitions");
    }

    #[test]
    fn key_is_deterministic_and_not_canonicalized() {
        assert_eq!(
            cache_key("/matches", Some("a=1&b=2")),
            cache_key("/matches", Some("a=1&b=2"))
        );
        assert_ne!(
            cache_key("/matches", Some("a=1&b=2")),
            cache_key("/matches", Some("b=2&a=1"))
        );
        assert_ne!(
            cache_key("/matches", Some("a=1")),
            cache_key("/teams", Some("a=1"))
        );
        assert_ne!(cache_key("/matches", Some("")), cache_key("/matches", None));
    }

    #[test]
    fn get_returns_raw_entry_even_when_stale() {
        let (cache, clock) = cache_at("2024-01-01T12:00:00+00:00");
        cache.put("/areas", json!({"count": 1}));
        clock.advance(Duration::days(1));

        let entry = cache.get("/areas").expect("entry should still be stored");
        assert_eq!(entry.data, json!({"count": 1}));
        assert!(!cache.is_valid(&entry));
        assert!(cache.get_valid("/areas").is_none());
    }

    #[test]
    fn put_records_clock_time() {
        let (cache, clock) = cache_at("2024-01-01T08:15:00+00:00");
        cache.put("/areas", json!([]));
        let entry = cache.get("/areas").unwrap();
        assert_eq!(entry.timestamp, clock.now());
        assert_eq!(entry.timestamp_millis(), clock.now().timestamp_millis());
    }

    #[test]
    fn entry_from_late_evening_expires_after_midnight() {
        let (cache, clock) = cache_at("2024-01-01T23:59:00+01:00");
        cache.put("/matches", json!({"matches": []}));
        clock.set(at("2024-01-02T00:01:00+01:00"));

        let entry = cache.get("/matches").unwrap();
        assert!(!cache.is_valid(&entry));
    }

    #[test]
    fn entry_from_early_morning_is_valid_until_end_of_day() {
        let (cache, clock) = cache_at("2024-01-01T00:01:00+01:00");
        cache.put("/matches", json!({"matches": []}));
        clock.set(at("2024-01-01T23:59:00+01:00"));

        let entry = cache.get("/matches").unwrap();
        assert!(cache.is_valid(&entry));
        assert_eq!(cache.get_valid("/matches"), Some(json!({"matches": []})));
    }

    #[test]
    fn put_overwrites_with_new_timestamp() {
        let (cache, clock) = cache_at("2024-01-01T10:00:00+00:00");
        cache.put("/teams/1", json!({"v": 1}));
        let first = cache.get("/teams/1").unwrap();

        clock.advance(Duration::hours(3));
        cache.put("/teams/1", json!({"v": 2}));
        let second = cache.get("/teams/1").unwrap();

        assert_eq!(cache.len(), 1);
        assert_eq!(second.data, json!({"v": 2}));
        assert!(second.timestamp > first.timestamp);
    }

    #[test]
    fn sweep_removes_only_stale_entries() {
        let (cache, clock) = cache_at("2024-01-01T20:00:00+00:00");
        cache.put("/old/a", json!(1));
        cache.put("/old/b", json!(2));

        clock.set(at("2024-01-02T06:00:00+00:00"));
        cache.put("/fresh", json!(3));
        let fresh_before = cache.get("/fresh").unwrap();

        clock.set(at("2024-01-02T18:00:00+00:00"));
        assert_eq!(cache.sweep(), 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("/old/a").is_none());
        assert!(cache.get("/old/b").is_none());
        assert_eq!(cache.get("/fresh"), Some(fresh_before));
    }

    #[test]
    fn sweep_on_empty_cache_is_a_no_op() {
        let (cache, _clock) = cache_at("2024-01-01T20:00:00+00:00");
        assert_eq!(cache.sweep(), 0);
        assert!(cache.is_empty());
    }
}

// src/cache.rs - Process-wide TTL cache for derived views
use dashmap::DashMap;
use serde_json::Value;
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};
use tracing::{debug, info};

/// A cached view value with its own expiry. Entries are only ever replaced
/// wholesale; there is no partial update.
#[derive(Clone, Debug)]
struct CacheEntry {
    value: Value,
    inserted_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.inserted_at) >= self.ttl
    }
}

/// Builds the cache key for a (view, user) pair. The separator keeps the
/// mapping injective: view names never contain ':'.
#[inline]
pub fn view_key(view: &str, user_id: &str) -> String {
    format!("{}:{}", view, user_id)
}

#[derive(Default)]
pub struct CacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub evictions: AtomicU64,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let total = hits + self.misses.load(Ordering::Relaxed);
        if total > 0 {
            hits as f64 / total as f64
        } else {
            0.0
        }
    }
}

/// In-process key/value store with per-entry TTL.
///
/// Shared mutable state without outer locking: concurrent misses for the same
/// key may both recompute and both insert. The last write wins, which is
/// harmless because a view is a deterministic function of the underlying data.
#[derive(Clone)]
pub struct TtlCache {
    entries: Arc<DashMap<String, CacheEntry>>,
    default_ttl: Duration,
    pub stats: Arc<CacheStats>,
}

impl TtlCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            default_ttl,
            stats: Arc::new(CacheStats::default()),
        }
    }

    /// Returns the cached value unless the entry has expired. Expired entries
    /// are removed lazily here; the sweeper catches abandoned keys.
    ///
    /// The shard guard from the lookup must be released before the removal
    /// below; removing under a live guard on the same shard deadlocks.
    pub fn get(&self, key: &str) -> Option<Value> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired(now) {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.value.clone());
            }
        }
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub fn has(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries
            .get(key)
            .map(|entry| !entry.is_expired(now))
            .unwrap_or(false)
    }

    /// Stores a value, replacing any previous entry under the key. A `ttl`
    /// of `None` uses the configured default.
    pub fn set(&self, key: String, value: Value, ttl: Option<Duration>) {
        self.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
                ttl: ttl.unwrap_or(self.default_ttl),
            },
        );
    }

    pub fn delete(&self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.stats.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Drops every expired entry, bounding memory held by keys nobody reads
    /// anymore. Returns the number of entries removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Background sweep, independent of request traffic.
pub fn start_cache_sweeper(cache: TtlCache, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await; // first tick fires immediately; skip it
        loop {
            ticker.tick().await;
            let removed = cache.purge_expired();
            if removed > 0 {
                debug!("cache sweep removed {} expired entries", removed);
            }
            info!(
                "cache stats: {} entries, {:.1}% hit ratio",
                cache.len(),
                cache.stats.hit_ratio() * 100.0
            );
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn view_key_is_deterministic_and_distinct_per_pair() {
        assert_eq!(view_key("dashboard-summary", "u1"), "dashboard-summary:u1");
        assert_eq!(
            view_key("dashboard-summary", "u1"),
            view_key("dashboard-summary", "u1")
        );
        assert_ne!(
            view_key("dashboard-summary", "u1"),
            view_key("dashboard-summary", "u2")
        );
        assert_ne!(
            view_key("classes", "u1"),
            view_key("dashboard-summary", "u1")
        );
    }

    #[test]
    fn round_trip_before_ttl() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.set("k".to_string(), json!({"a": 1}), None);
        assert!(cache.has("k"));
        assert_eq!(cache.get("k"), Some(json!({"a": 1})));
    }

    #[test]
    fn entry_is_absent_after_ttl() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.set("k".to_string(), json!(1), Some(Duration::from_millis(20)));
        assert_eq!(cache.get("k"), Some(json!(1)));
        std::thread::sleep(Duration::from_millis(40));
        assert!(!cache.has("k"));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn expired_get_returns_promptly_and_drops_the_entry() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.set("k".to_string(), json!(1), Some(Duration::from_millis(10)));
        std::thread::sleep(Duration::from_millis(30));

        // Read from another thread so a hang fails the test instead of
        // wedging the runner.
        let (tx, rx) = std::sync::mpsc::channel();
        let reader = cache.clone();
        std::thread::spawn(move || {
            let _ = tx.send(reader.get("k"));
        });
        let result = rx
            .recv_timeout(Duration::from_secs(3))
            .expect("get on an expired entry did not return");
        assert_eq!(result, None);
        assert!(cache.is_empty());
    }

    #[test]
    fn set_replaces_whole_value() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.set("k".to_string(), json!({"a": 1, "b": 2}), None);
        cache.set("k".to_string(), json!({"a": 3}), None);
        assert_eq!(cache.get("k"), Some(json!({"a": 3})));
    }

    #[test]
    fn sweep_purges_only_expired_entries() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.set(
            "stale".to_string(),
            json!(1),
            Some(Duration::from_millis(10)),
        );
        cache.set("fresh".to_string(), json!(2), None);
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.has("fresh"));
        assert!(!cache.has("stale"));
    }

    #[test]
    fn delete_is_a_noop_on_missing_keys() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.delete("nothing");
        cache.set("k".to_string(), json!(1), None);
        cache.delete("k");
        assert_eq!(cache.get("k"), None);
    }
}

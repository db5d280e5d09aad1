use dashmap::DashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Cache key for the home listing. One entry, no per-page or per-user
/// variation: repeat viewers get the stored bytes verbatim until expiry.
pub const INDEX_CACHE_KEY: &str = "index_page";

/// Default TTL matches the original deployment's 20 second window.
pub const DEFAULT_CACHE_SECS: u64 = 20;

/// Time source injected into the cache so tests can expire entries
/// without sleeping.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock advanced by hand. Test use only, but lives here so integration
/// tests can inject it.
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self { base: Instant::now(), offset: Mutex::new(Duration::ZERO) }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock().unwrap() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock().unwrap()
    }
}

#[derive(Clone)]
pub struct CachedPage {
    pub body: Vec<u8>,
    pub content_type: String,
}

struct Entry {
    page: CachedPage,
    stored_at: Instant,
}

/// Process-wide rendered-page cache with a fixed TTL. Readers and writers
/// only coordinate through the map's atomic get/set; concurrent misses may
/// both recompute and the last write wins.
pub struct ResponseCache {
    entries: DashMap<String, Entry>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl ResponseCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self { entries: DashMap::new(), ttl, clock }
    }

    /// TTL from `QUILL_CACHE_SECS`, wall clock.
    pub fn from_env() -> Self {
        let secs = std::env::var("QUILL_CACHE_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_CACHE_SECS);
        Self::new(Duration::from_secs(secs), Arc::new(SystemClock))
    }

    pub fn get(&self, key: &str) -> Option<CachedPage> {
        let now = self.clock.now();
        if let Some(entry) = self.entries.get(key) {
            if now.duration_since(entry.stored_at) < self.ttl {
                return Some(entry.page.clone());
            }
        }
        // expired entries drop lazily
        self.entries.remove(key);
        None
    }

    pub fn set(&self, key: &str, body: Vec<u8>, content_type: &str) {
        self.entries.insert(
            key.to_string(),
            Entry {
                page: CachedPage { body, content_type: content_type.to_string() },
                stored_at: self.clock.now(),
            },
        );
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_with_clock(ttl_secs: u64) -> (Arc<ManualClock>, ResponseCache) {
        let clock = Arc::new(ManualClock::new());
        let cache = ResponseCache::new(Duration::from_secs(ttl_secs), clock.clone());
        (clock, cache)
    }

    #[test]
    fn hit_within_ttl_miss_after() {
        let (clock, cache) = cache_with_clock(20);
        cache.set(INDEX_CACHE_KEY, b"page".to_vec(), "application/json");

        clock.advance(Duration::from_secs(19));
        let hit = cache.get(INDEX_CACHE_KEY).unwrap();
        assert_eq!(hit.body, b"page");

        clock.advance(Duration::from_secs(2));
        assert!(cache.get(INDEX_CACHE_KEY).is_none());
    }

    #[test]
    fn set_replaces_and_restarts_window() {
        let (clock, cache) = cache_with_clock(10);
        cache.set("k", b"old".to_vec(), "text/plain");
        clock.advance(Duration::from_secs(8));
        cache.set("k", b"new".to_vec(), "text/plain");
        clock.advance(Duration::from_secs(8));
        assert_eq!(cache.get("k").unwrap().body, b"new");
    }

    #[test]
    fn clear_evicts_everything() {
        let (_clock, cache) = cache_with_clock(60);
        cache.set("a", b"1".to_vec(), "text/plain");
        cache.set("b", b"2".to_vec(), "text/plain");
        cache.clear();
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_none());
    }
}

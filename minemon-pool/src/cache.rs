//! Shared TTL cache for upstream API responses.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde_json::Value;

/// Default lifetime of a cached response.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct CacheEntry {
    body: Value,
    inserted: Instant,
}

impl CacheEntry {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.inserted.elapsed() >= ttl
    }
}

/// URL-keyed response cache with a fixed time-to-live.
///
/// One cache is shared by every adapter, so accessors that hit the same
/// endpoint within the TTL reuse a single upstream response. Expired
/// entries are ignored on lookup and dropped on the next insert.
#[derive(Debug)]
pub struct ResponseCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl ResponseCache {
    /// Create a cache with the given time-to-live.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Look up a cached response. Expired entries count as misses.
    pub fn get(&self, url: &str) -> Option<Value> {
        let entries = self.entries.read();
        entries
            .get(url)
            .filter(|entry| !entry.is_expired(self.ttl))
            .map(|entry| entry.body.clone())
    }

    /// Store a response, replacing any previous entry for the URL.
    pub fn insert(&self, url: &str, body: Value) {
        let mut entries = self.entries.write();
        let ttl = self.ttl;
        entries.retain(|_, entry| !entry.is_expired(ttl));
        entries.insert(
            url.to_string(),
            CacheEntry {
                body,
                inserted: Instant::now(),
            },
        );
    }

    /// Number of stored entries, expired ones included.
    pub fn entry_count(&self) -> usize {
        self.entries.read().len()
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

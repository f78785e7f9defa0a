//! In-process cache implementation.
//!
//! [`MemoryCache`] keeps entries in a shared map partitioned by bucket name.
//! Bucket handles returned by [`Cache::bucket`] share storage, so an entry
//! written through one handle is visible through every other handle for the
//! same bucket.
//!
//! Entries expire a fixed time-to-live after they were stored, one hour
//! unless configured otherwise. Expired entries are dropped lazily on lookup.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use crate::{Cache, CacheBucket};

struct Entry {
    etag: String,
    value: Vec<u8>,
    stored_at: Instant,
}

type Buckets = HashMap<String, HashMap<String, Entry>>;

/// In-memory [`Cache`] with bounded expiry.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use trellis_cache::{Cache, MemoryCache};
///
/// let cache = MemoryCache::new().with_ttl(Duration::from_secs(3600));
/// let bucket = cache.bucket("menu_items");
/// bucket.set("menu-1", "2024-01-01T00:00:00Z", b"[]");
/// assert_eq!(bucket.get("menu-1", "2024-01-01T00:00:00Z"), Some(b"[]".to_vec()));
/// ```
#[derive(Clone)]
pub struct MemoryCache {
    buckets: Arc<RwLock<Buckets>>,
    ttl: Duration,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self {
            buckets: Arc::default(),
            ttl: MemoryCache::DEFAULT_TTL,
        }
    }
}

impl MemoryCache {
    /// Expiry used unless [`with_ttl`](Self::with_ttl) sets another.
    pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

    /// Create an empty cache with [`DEFAULT_TTL`](Self::DEFAULT_TTL) expiry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Expire entries `ttl` after they were stored.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Expiry applied to new and existing entries.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of live entries across all buckets.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        let buckets = self.buckets.read().unwrap();
        buckets
            .values()
            .flat_map(HashMap::values)
            .filter(|entry| !is_expired(entry, self.ttl))
            .count()
    }

    /// Whether the cache holds no live entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Cache for MemoryCache {
    fn bucket(&self, name: &str) -> Box<dyn CacheBucket> {
        Box::new(MemoryCacheBucket {
            name: name.to_owned(),
            buckets: Arc::clone(&self.buckets),
            ttl: self.ttl,
        })
    }
}

fn is_expired(entry: &Entry, ttl: Duration) -> bool {
    entry.stored_at.elapsed() >= ttl
}

/// Handle to one named partition of a [`MemoryCache`].
struct MemoryCacheBucket {
    name: String,
    buckets: Arc<RwLock<Buckets>>,
    ttl: Duration,
}

impl CacheBucket for MemoryCacheBucket {
    fn get(&self, key: &str, etag: &str) -> Option<Vec<u8>> {
        {
            let buckets = self.buckets.read().unwrap();
            let entry = buckets.get(&self.name)?.get(key)?;
            if !is_expired(entry, self.ttl) {
                // Validate etag (skip if caller passes empty etag)
                if !etag.is_empty() && entry.etag != etag {
                    return None;
                }
                return Some(entry.value.clone());
            }
        }

        tracing::trace!(bucket = %self.name, key, "cache entry expired");
        self.invalidate(key);
        None
    }

    fn set(&self, key: &str, etag: &str, value: &[u8]) {
        let mut buckets = self.buckets.write().unwrap();
        buckets.entry(self.name.clone()).or_default().insert(
            key.to_owned(),
            Entry {
                etag: etag.to_owned(),
                value: value.to_vec(),
                stored_at: Instant::now(),
            },
        );
    }

    fn invalidate(&self, key: &str) {
        let mut buckets = self.buckets.write().unwrap();
        if let Some(bucket) = buckets.get_mut(&self.name) {
            bucket.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_bucket_set_and_get() {
        let cache = MemoryCache::new();
        let bucket = cache.bucket("menu_items");

        bucket.set("menu-1", "etag1", b"[1,2,3]");

        assert_eq!(bucket.get("menu-1", "etag1"), Some(b"[1,2,3]".to_vec()));
    }

    #[test]
    fn test_memory_bucket_etag_mismatch_misses() {
        let cache = MemoryCache::new();
        let bucket = cache.bucket("menu_items");

        bucket.set("key", "correct-etag", b"data");

        assert_eq!(bucket.get("key", "correct-etag"), Some(b"data".to_vec()));
        assert_eq!(bucket.get("key", "wrong-etag"), None);
    }

    #[test]
    fn test_memory_bucket_empty_etag_skips_validation() {
        let cache = MemoryCache::new();
        let bucket = cache.bucket("menus");

        bucket.set("key", "some-etag", b"data");

        assert_eq!(bucket.get("key", ""), Some(b"data".to_vec()));
    }

    #[test]
    fn test_memory_bucket_overwrite_replaces_etag() {
        let cache = MemoryCache::new();
        let bucket = cache.bucket("menu_items");

        bucket.set("key", "etag1", b"first");
        bucket.set("key", "etag2", b"second");

        assert_eq!(bucket.get("key", "etag1"), None);
        assert_eq!(bucket.get("key", "etag2"), Some(b"second".to_vec()));
    }

    #[test]
    fn test_memory_bucket_invalidate_removes_entry() {
        let cache = MemoryCache::new();
        let bucket = cache.bucket("menus");

        bucket.set("main/1", "", b"data");
        bucket.invalidate("main/1");

        assert_eq!(bucket.get("main/1", ""), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_memory_buckets_are_isolated() {
        let cache = MemoryCache::new();
        let items = cache.bucket("menu_items");
        let menus = cache.bucket("menus");

        items.set("key", "etag", b"items");
        menus.set("key", "etag", b"menus");
        menus.invalidate("key");

        assert_eq!(items.get("key", "etag"), Some(b"items".to_vec()));
        assert_eq!(menus.get("key", "etag"), None);
    }

    #[test]
    fn test_memory_bucket_handles_share_storage() {
        let cache = MemoryCache::new();

        cache.bucket("menus").set("key", "etag", b"shared");

        assert_eq!(
            cache.bucket("menus").get("key", "etag"),
            Some(b"shared".to_vec())
        );
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_memory_bucket_zero_ttl_always_expires() {
        let cache = MemoryCache::new().with_ttl(Duration::ZERO);
        let bucket = cache.bucket("menu_items");

        bucket.set("key", "etag", b"data");

        assert_eq!(bucket.get("key", "etag"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_memory_cache_expires_within_an_hour_by_default() {
        let cache = MemoryCache::new();

        assert_eq!(cache.ttl(), Duration::from_secs(3600));
        assert_eq!(cache.with_ttl(Duration::from_secs(60)).ttl(), Duration::from_secs(60));
    }

    #[test]
    fn test_memory_bucket_long_ttl_keeps_entry() {
        let cache = MemoryCache::new().with_ttl(Duration::from_secs(3600));
        let bucket = cache.bucket("menu_items");

        bucket.set("key", "etag", b"data");

        assert_eq!(bucket.get("key", "etag"), Some(b"data".to_vec()));
    }
}

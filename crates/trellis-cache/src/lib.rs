//! Fragment caches for derived navigation data.
//!
//! Menu listings and menu lookups are expensive to rebuild and cheap to
//! invalidate, so the engine keeps them behind two small traits:
//!
//! - [`Cache`] hands out named buckets (`menu_items`, `menus`)
//! - [`CacheBucket`] stores bytes under a key, guarded by an etag
//!
//! A lookup only hits when the stored etag equals the requested one. Engine
//! callers use the owning record's `updated_at` as the etag, so bumping the
//! timestamp is enough to retire an entry. Entries without a natural version
//! are stored with an empty etag and dropped with [`CacheBucket::invalidate`].
//!
//! [`MemoryCache`] is the in-process backend; [`NullCache`] disables caching.
//!
//! ```
//! use trellis_cache::{Cache, NullCache};
//!
//! let bucket = NullCache.bucket("menu_items");
//! bucket.set("menu-1", "v1", b"[]");
//! assert_eq!(bucket.get("menu-1", "v1"), None);
//! ```

mod ext;
mod memory;

pub use ext::CacheBucketExt;
pub use memory::MemoryCache;

/// One isolated key space of a [`Cache`].
pub trait CacheBucket: Send + Sync {
    /// Look up `key`.
    ///
    /// Misses when the key is absent, expired or stored under another etag.
    /// An empty `etag` matches any stored etag.
    fn get(&self, key: &str, etag: &str) -> Option<Vec<u8>>;

    /// Store `value` under `key`, replacing any previous entry.
    fn set(&self, key: &str, etag: &str, value: &[u8]);

    /// Drop `key` whatever its etag. Missing keys are ignored.
    fn invalidate(&self, key: &str);
}

/// Source of named [`CacheBucket`]s.
///
/// Handles for the same name share storage; different names never collide.
pub trait Cache: Send + Sync {
    fn bucket(&self, name: &str) -> Box<dyn CacheBucket>;
}

/// Bucket that remembers nothing.
pub struct NullCacheBucket;

impl CacheBucket for NullCacheBucket {
    fn get(&self, _key: &str, _etag: &str) -> Option<Vec<u8>> {
        None
    }

    fn set(&self, _key: &str, _etag: &str, _value: &[u8]) {}

    fn invalidate(&self, _key: &str) {}
}

/// Cache used when menu caching is switched off.
pub struct NullCache;

impl Cache for NullCache {
    fn bucket(&self, _name: &str) -> Box<dyn CacheBucket> {
        Box::new(NullCacheBucket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_bucket_never_returns_stored_value() {
        let bucket = NullCache.bucket("menu_items");

        bucket.set("menu-1", "2024-01-01T00:00:00Z", b"[]");

        assert_eq!(bucket.get("menu-1", "2024-01-01T00:00:00Z"), None);
        assert_eq!(bucket.get("menu-1", ""), None);
    }

    #[test]
    fn test_null_bucket_invalidate_is_noop() {
        let bucket = NullCache.bucket("menus");

        bucket.invalidate("main/missing");

        assert_eq!(bucket.get("main/missing", ""), None);
    }
}

//! Typed access to [`CacheBucket`] values.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::CacheBucket;

/// JSON helpers available on every [`CacheBucket`].
///
/// Values are stored as `serde_json` bytes. Entries that no longer decode
/// (for example after a type change) are treated as misses.
///
/// ```
/// use trellis_cache::{CacheBucketExt, MemoryCache, Cache};
///
/// let bucket = MemoryCache::new().bucket("menu_items");
/// let mut loads = 0;
/// for _ in 0..2 {
///     let items: Vec<String> = bucket.get_or_insert_json("menu-1", "v1", || {
///         loads += 1;
///         vec!["Home".to_owned()]
///     });
///     assert_eq!(items, ["Home"]);
/// }
/// assert_eq!(loads, 1);
/// ```
pub trait CacheBucketExt: CacheBucket {
    /// Decode the entry stored under `key` and `etag`.
    fn get_json<T: DeserializeOwned>(&self, key: &str, etag: &str) -> Option<T> {
        let bytes = self.get(key, etag)?;
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!(key, error = %e, "Discarding undecodable cache entry");
                None
            }
        }
    }

    /// Encode and store `value`. Values that fail to encode are not cached.
    fn set_json<T: Serialize>(&self, key: &str, etag: &str, value: &T) {
        match serde_json::to_vec(value) {
            Ok(bytes) => self.set(key, etag, &bytes),
            Err(e) => tracing::debug!(key, error = %e, "Skipping unencodable cache entry"),
        }
    }

    /// Return the cached value, or compute it with `load` and store it.
    fn get_or_insert_json<T, F>(&self, key: &str, etag: &str, load: F) -> T
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> T,
    {
        if let Some(value) = self.get_json(key, etag) {
            return value;
        }
        let value = load();
        self.set_json(key, etag, &value);
        value
    }
}

impl<B: CacheBucket + ?Sized> CacheBucketExt for B {}

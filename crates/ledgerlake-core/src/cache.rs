//! Decompressed-batch cache.
//!
//! Entries are keyed by batch start sequence and hold the decompressed
//! payload. The archive is immutable, so there is no invalidation protocol;
//! `remove` exists only to drop entries that fail to decode.

use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use lru::LruCache;

use crate::error::LakeError;

/// Pluggable batch cache.
///
/// `get` and `put` copy data in and out: a caller mutating its buffer never
/// changes what the cache holds, and vice versa.
#[async_trait]
pub trait BatchCache: Send + Sync {
    /// Payload stored under `key`, refreshing its recency.
    async fn get(&self, key: u32) -> Option<Vec<u8>>;

    /// Store a copy of `payload` under `key`, evicting if over capacity.
    async fn put(&self, key: u32, payload: &[u8]);

    /// Drop `key`. Returns `true` if it was present.
    async fn remove(&self, key: u32) -> bool;

    async fn clear(&self);
}

/// Bounded in-memory LRU cache. Both `get` and `put` count as access.
pub struct LruBatchCache {
    inner: Mutex<LruCache<u32, Vec<u8>>>,
}

impl LruBatchCache {
    /// Create a cache holding at most `capacity` batches.
    pub fn new(capacity: usize) -> Result<Self, LakeError> {
        let capacity = NonZeroUsize::new(capacity)
            .ok_or_else(|| LakeError::Config("cache capacity must be > 0".into()))?;
        Ok(Self {
            inner: Mutex::new(LruCache::new(capacity)),
        })
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.lock().cap().get()
    }

    /// Returns `true` if `key` is cached, without touching recency.
    pub fn contains(&self, key: u32) -> bool {
        self.lock().contains(&key)
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<u32, Vec<u8>>> {
        // a poisoned lock still holds whole entries
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for LruBatchCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cache = self.lock();
        f.debug_struct("LruBatchCache")
            .field("len", &cache.len())
            .field("capacity", &cache.cap())
            .finish()
    }
}

#[async_trait]
impl BatchCache for LruBatchCache {
    async fn get(&self, key: u32) -> Option<Vec<u8>> {
        self.lock().get(&key).cloned()
    }

    async fn put(&self, key: u32, payload: &[u8]) {
        self.lock().put(key, payload.to_vec());
    }

    async fn remove(&self, key: u32) -> bool {
        self.lock().pop(&key).is_some()
    }

    async fn clear(&self) {
        self.lock().clear();
    }
}

/// A cache that stores nothing.
#[derive(Debug, Default)]
pub struct NoCache;

#[async_trait]
impl BatchCache for NoCache {
    async fn get(&self, _key: u32) -> Option<Vec<u8>> {
        None
    }

    async fn put(&self, _key: u32, _payload: &[u8]) {}

    async fn remove(&self, _key: u32) -> bool {
        false
    }

    async fn clear(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn put_then_get_round_trips_bytes() {
        let cache = LruBatchCache::new(4).unwrap();
        cache.put(128, b"batch-128").await;
        assert_eq!(cache.get(128).await.as_deref(), Some(&b"batch-128"[..]));
        assert_eq!(cache.get(192).await, None);
    }

    #[tokio::test]
    async fn value_semantics() {
        let cache = LruBatchCache::new(4).unwrap();
        let mut buf = vec![1u8, 2, 3];
        cache.put(1, &buf).await;
        buf[0] = 99;
        assert_eq!(cache.get(1).await.unwrap(), vec![1, 2, 3]);

        let mut out = cache.get(1).await.unwrap();
        out[1] = 42;
        assert_eq!(cache.get(1).await.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn evicts_least_recently_accessed() {
        let cache = LruBatchCache::new(2).unwrap();
        cache.put(100, b"a").await;
        cache.put(200, b"b").await;
        cache.get(100).await;
        cache.put(300, b"c").await;

        assert!(cache.contains(100));
        assert!(!cache.contains(200));
        assert!(cache.contains(300));
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn put_refreshes_recency() {
        let cache = LruBatchCache::new(2).unwrap();
        cache.put(1, b"a").await;
        cache.put(2, b"b").await;
        cache.put(1, b"a2").await;
        cache.put(3, b"c").await;
        assert_eq!(cache.get(1).await.unwrap(), b"a2".to_vec());
        assert!(!cache.contains(2));
    }

    #[tokio::test]
    async fn remove_and_clear() {
        let cache = LruBatchCache::new(4).unwrap();
        cache.put(1, b"a").await;
        cache.put(2, b"b").await;
        assert!(cache.remove(1).await);
        assert!(!cache.remove(1).await);
        cache.clear().await;
        assert!(cache.is_empty());
    }

    #[test]
    fn zero_capacity_rejected() {
        assert!(LruBatchCache::new(0).is_err());
        assert_eq!(LruBatchCache::new(3).unwrap().capacity(), 3);
    }

    #[tokio::test]
    async fn concurrent_access_stays_bounded() {
        let cache = Arc::new(LruBatchCache::new(8).unwrap());
        let mut handles = Vec::new();
        for t in 0..8u32 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                for i in 0..100u32 {
                    let key = (t * 100 + i) % 20;
                    cache.put(key, &key.to_le_bytes()).await;
                    if let Some(v) = cache.get(key).await {
                        assert_eq!(v, key.to_le_bytes().to_vec());
                    }
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert!(cache.len() <= 8);
    }
}

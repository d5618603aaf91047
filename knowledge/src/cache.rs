//! Memoizing retriever wrapper.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use crate::retriever::{RetrievalError, Retriever};
use crate::types::RetrievedContext;

/// Entries kept before new queries stop being cached.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Caches successful retrievals keyed by `(query, k)`.
///
/// Errors are never cached. Safe to share across concurrent topic analyses.
/// Once `capacity` entries are held, further queries pass through uncached
/// until [`CachedRetriever::clear`] is called.
pub struct CachedRetriever<R> {
    inner: R,
    cache: DashMap<(String, usize), Vec<RetrievedContext>>,
    capacity: usize,
    hits: AtomicU64,
}

impl<R: Retriever> CachedRetriever<R> {
    pub fn new(inner: R) -> Self {
        Self::with_capacity(inner, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(inner: R, capacity: usize) -> Self {
        Self {
            inner,
            cache: DashMap::new(),
            capacity,
            hits: AtomicU64::new(0),
        }
    }

    /// Number of lookups served from the cache.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Number of cached queries.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn clear(&self) {
        self.cache.clear();
    }
}

#[async_trait]
impl<R: Retriever> Retriever for CachedRetriever<R> {
    fn id(&self) -> &str {
        self.inner.id()
    }

    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedContext>, RetrievalError> {
        let key = (query.to_string(), k);
        if let Some(hit) = self.cache.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(hit.value().clone());
        }

        let results = self.inner.retrieve(query, k).await?;
        if self.cache.len() < self.capacity {
            self.cache.insert(key, results.clone());
        } else {
            debug!(capacity = self.capacity, "Retrieval cache full, not caching");
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    struct CountingRetriever {
        calls: AtomicU32,
        fail: bool,
    }

    #[async_trait]
    impl Retriever for CountingRetriever {
        fn id(&self) -> &str {
            "counting"
        }

        async fn retrieve(&self, _query: &str, _k: usize) -> Result<Vec<RetrievedContext>, RetrievalError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(RetrievalError::Unavailable("down".to_string()))
            } else {
                Ok(Vec::new())
            }
        }
    }

    #[tokio::test]
    async fn test_second_lookup_is_cached() {
        let cached = CachedRetriever::new(CountingRetriever {
            calls: AtomicU32::new(0),
            fail: false,
        });

        cached.retrieve("confusion", 5).await.unwrap();
        cached.retrieve("confusion", 5).await.unwrap();
        cached.retrieve("confusion", 3).await.unwrap();

        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cached.hits(), 1);
        assert_eq!(cached.len(), 2);
    }

    #[tokio::test]
    async fn test_errors_not_cached() {
        let cached = CachedRetriever::new(CountingRetriever {
            calls: AtomicU32::new(0),
            fail: true,
        });

        assert!(cached.retrieve("confusion", 5).await.is_err());
        assert!(cached.retrieve("confusion", 5).await.is_err());

        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 2);
        assert!(cached.is_empty());
    }

    #[test]
    fn test_clear_forces_refetch() {
        let cached = CachedRetriever::new(CountingRetriever {
            calls: AtomicU32::new(0),
            fail: false,
        });

        tokio_test::block_on(cached.retrieve("specimen", 5)).unwrap();
        cached.clear();
        assert!(cached.is_empty());
        tokio_test::block_on(cached.retrieve("specimen", 5)).unwrap();

        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cached.hits(), 0);
    }

    #[tokio::test]
    async fn test_full_cache_passes_through() {
        let cached = CachedRetriever::with_capacity(
            CountingRetriever {
                calls: AtomicU32::new(0),
                fail: false,
            },
            1,
        );

        cached.retrieve("confusion", 5).await.unwrap();
        cached.retrieve("ownership", 5).await.unwrap();
        cached.retrieve("ownership", 5).await.unwrap();
        cached.retrieve("confusion", 5).await.unwrap();

        assert_eq!(cached.len(), 1);
        assert_eq!(cached.hits(), 1);
        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 3);
    }
}

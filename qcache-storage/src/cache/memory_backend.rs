//! In-process cache backend.
//!
//! Each scope maps to its own bucket, so dropping a scope is a single map
//! removal. Suitable for tests and single-instance deployments; it has no
//! eviction.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use qcache_core::{CacheBackendError, ScopeKey};

use super::composite_key::CompositeKey;
use super::traits::{CacheBackend, CacheStats};

/// In-memory cache backend partitioned by scope.
#[derive(Debug, Default)]
pub struct InMemoryCacheBackend {
    partitions: DashMap<ScopeKey, HashMap<CompositeKey, String>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl InMemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries stored under `partition`.
    pub fn partition_len(&self, partition: &ScopeKey) -> usize {
        self.partitions
            .get(partition)
            .map(|bucket| bucket.len())
            .unwrap_or(0)
    }

    /// Raw payload lookup that does not touch the hit/miss counters.
    pub fn peek(&self, partition: &ScopeKey, key: &CompositeKey) -> Option<String> {
        self.partitions
            .get(partition)
            .and_then(|bucket| bucket.get(key).cloned())
    }

    /// Drop every partition.
    pub fn clear(&self) {
        self.partitions.clear();
    }
}

#[async_trait]
impl CacheBackend for InMemoryCacheBackend {
    async fn get(
        &self,
        partition: &ScopeKey,
        key: &CompositeKey,
    ) -> Result<Option<String>, CacheBackendError> {
        let payload = self.peek(partition, key);
        if payload.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        Ok(payload)
    }

    async fn set(
        &self,
        partition: &ScopeKey,
        key: &CompositeKey,
        payload: String,
    ) -> Result<(), CacheBackendError> {
        self.partitions
            .entry(partition.clone())
            .or_default()
            .insert(key.clone(), payload);
        Ok(())
    }

    async fn delete_partition(&self, partition: &ScopeKey) -> Result<u64, CacheBackendError> {
        Ok(self
            .partitions
            .remove(partition)
            .map(|(_, bucket)| bucket.len() as u64)
            .unwrap_or(0))
    }

    async fn stats(&self) -> Result<CacheStats, CacheBackendError> {
        let mut stats = CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            ..Default::default()
        };
        for bucket in self.partitions.iter() {
            if bucket.is_empty() {
                continue;
            }
            stats.partitions += 1;
            stats.entry_count += bucket.len() as u64;
            stats.memory_bytes += bucket
                .iter()
                .map(|(key, payload)| (key.as_str().len() + payload.len()) as u64)
                .sum::<u64>();
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qcache_core::Query;

    fn key(collection: &str, status: &str) -> CompositeKey {
        CompositeKey::for_query(&Query::new(collection).filter("status", status))
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let backend = InMemoryCacheBackend::new();
        let scope = ScopeKey::from("user:42");

        backend
            .set(&scope, &key("orders", "active"), "[]".to_string())
            .await
            .expect("set should succeed");

        let cached = backend
            .get(&scope, &key("orders", "active"))
            .await
            .expect("get should succeed");
        assert_eq!(cached.as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let backend = InMemoryCacheBackend::new();
        let cached = backend
            .get(&ScopeKey::from("user:42"), &key("orders", "active"))
            .await
            .expect("get should succeed");
        assert!(cached.is_none());
    }

    #[tokio::test]
    async fn test_overwrite() {
        let backend = InMemoryCacheBackend::new();
        let scope = ScopeKey::from("user:42");
        let k = key("orders", "active");

        backend.set(&scope, &k, "1".to_string()).await.unwrap();
        backend.set(&scope, &k, "2".to_string()).await.unwrap();

        assert_eq!(backend.peek(&scope, &k).as_deref(), Some("2"));
        assert_eq!(backend.partition_len(&scope), 1);
    }

    #[tokio::test]
    async fn test_partition_isolation() {
        let backend = InMemoryCacheBackend::new();
        let user1 = ScopeKey::from("user:1");
        let user2 = ScopeKey::from("user:2");
        let k = key("orders", "active");

        backend.set(&user1, &k, "{}".to_string()).await.unwrap();

        assert!(backend.get(&user2, &k).await.unwrap().is_none());
        assert!(backend.get(&user1, &k).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_partition() {
        let backend = InMemoryCacheBackend::new();
        let user1 = ScopeKey::from("user:1");
        let user2 = ScopeKey::from("user:2");

        for status in ["a", "b", "c"] {
            backend
                .set(&user1, &key("orders", status), "[]".to_string())
                .await
                .unwrap();
        }
        backend
            .set(&user2, &key("orders", "a"), "[]".to_string())
            .await
            .unwrap();

        let deleted = backend.delete_partition(&user1).await.unwrap();

        assert_eq!(deleted, 3);
        assert_eq!(backend.partition_len(&user1), 0);
        assert_eq!(backend.partition_len(&user2), 1);
        assert_eq!(backend.delete_partition(&user1).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_stats() {
        let backend = InMemoryCacheBackend::new();
        let scope = ScopeKey::from("user:42");
        let k = key("orders", "active");

        let _ = backend.get(&scope, &k).await;
        backend.set(&scope, &k, "[]".to_string()).await.unwrap();
        let _ = backend.get(&scope, &k).await;
        let _ = backend.get(&scope, &k).await;

        let stats = backend.stats().await.unwrap();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.entry_count, 1);
        assert_eq!(stats.partitions, 1);
        assert_eq!(stats.memory_bytes, (k.as_str().len() + 2) as u64);
    }

    #[tokio::test]
    async fn test_clear() {
        let backend = InMemoryCacheBackend::new();
        backend
            .set(&ScopeKey::default(), &key("orders", "a"), "[]".to_string())
            .await
            .unwrap();
        backend.clear();
        assert_eq!(backend.stats().await.unwrap().entry_count, 0);
    }
}

//! Cache backend and query executor traits.
//!
//! The read-through cache depends on exactly two collaborators: a backend
//! that stores serialized payloads in scope-partitioned buckets, and an
//! executor that runs a query against the real document store.

use async_trait::async_trait;
use qcache_core::{CacheBackendError, Document, Query, QueryResult, ScopeKey, StoreError};

use super::composite_key::CompositeKey;

/// Cache backend trait for pluggable cache implementations.
///
/// Entries are addressed by (partition, key). The partition is the query's
/// [`ScopeKey`]; the key is the [`CompositeKey`] derived from the query shape.
/// Values are UTF-8 JSON with no envelope.
///
/// # Partition deletion
///
/// `delete_partition` must remove every entry under the partition in a single
/// atomic operation. Deleting an empty or unknown partition is not an error.
#[async_trait]
pub trait CacheBackend: Send + Sync + 'static {
    /// Get a payload from the cache.
    async fn get(
        &self,
        partition: &ScopeKey,
        key: &CompositeKey,
    ) -> Result<Option<String>, CacheBackendError>;

    /// Store a payload, replacing any previous value.
    async fn set(
        &self,
        partition: &ScopeKey,
        key: &CompositeKey,
        payload: String,
    ) -> Result<(), CacheBackendError>;

    /// Remove every entry in the partition. Returns how many were removed.
    async fn delete_partition(&self, partition: &ScopeKey) -> Result<u64, CacheBackendError>;

    /// Get cache statistics.
    async fn stats(&self) -> Result<CacheStats, CacheBackendError>;
}

/// Runs a query against the underlying document store.
///
/// The cache wraps an executor instead of replacing it, so callers that
/// bypass the cache keep working unchanged.
#[async_trait]
pub trait QueryExecutor<T: Document>: Send + Sync {
    /// Execute the query and return documents in the store's own shape.
    async fn execute(&self, query: &Query) -> Result<QueryResult<T>, StoreError>;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of entries currently in cache.
    pub entry_count: u64,
    /// Approximate payload size in bytes.
    pub memory_bytes: u64,
    /// Number of partitions currently holding entries.
    pub partitions: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.8).abs() < 0.001);

        let empty_stats = CacheStats::default();
        assert!((empty_stats.hit_rate() - 0.0).abs() < 0.001);
    }
}

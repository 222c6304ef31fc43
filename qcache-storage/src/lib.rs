//! QCACHE Storage - Read-Through Query Cache
//!
//! Wraps a document store's query execution with a scope-partitioned cache.
//! The store itself is injected through [`QueryExecutor`]; cache backends
//! implement [`CacheBackend`].

pub mod cache;

pub use cache::{
    dehydrate, hydrate, CacheBackend, CacheStats, CompositeKey, InMemoryCacheBackend,
    LmdbCacheBackend, LmdbCacheError, QueryExecutor, ReadThroughCache,
};

// Re-export core types so callers only need one import
pub use qcache_core::{
    CacheConfig, CacheOptions, Document, LmdbConfig, Predicate, QcacheError, QcacheResult, Query,
    QueryResult, ScopeKey, StoreError, WriteBackMode,
};

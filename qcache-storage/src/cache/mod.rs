//! Read-through query cache with scope-partitioned invalidation.
//!
//! # Design
//!
//! A query opts into caching by carrying [`CacheOptions`](qcache_core::CacheOptions).
//! [`ReadThroughCache::execute`] then derives a [`CompositeKey`] from the
//! query's predicate and collection, looks it up in the query's scope, and
//! either hydrates the cached payload or runs the injected
//! [`QueryExecutor`] and writes the result back.
//!
//! Invalidation is coarse on purpose: [`ReadThroughCache::invalidate`] drops
//! every entry in a scope with one backend operation, whatever the composite
//! keys.
//!
//! # Example
//!
//! ```ignore
//! let cache = ReadThroughCache::with_defaults(Arc::new(InMemoryCacheBackend::new()));
//!
//! let query = Query::new("orders").filter("status", "active").cache_in("user:42");
//! let orders: QueryResult<Order> = cache.execute(&query, &store).await?;
//!
//! // after a write
//! cache.invalidate("user:42").await?;
//! ```

pub mod composite_key;
pub mod hydrate;
pub mod lmdb_backend;
pub mod memory_backend;
pub mod read_through;
pub mod traits;

pub use composite_key::CompositeKey;
pub use hydrate::{dehydrate, hydrate};
pub use lmdb_backend::{LmdbCacheBackend, LmdbCacheError};
pub use memory_backend::InMemoryCacheBackend;
pub use read_through::ReadThroughCache;
pub use traits::{CacheBackend, CacheStats, QueryExecutor};

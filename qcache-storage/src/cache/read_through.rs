//! Read-through query cache.
//!
//! This module implements the interception path: cacheable queries are
//! answered from the backend when possible and written back on miss; every
//! other query goes straight to the injected executor.

use std::future::Future;
use std::sync::Arc;

use qcache_core::{
    CacheConfig, Document, QcacheError, QcacheResult, Query, QueryResult, ScopeKey,
    WriteBackMode,
};

use super::composite_key::CompositeKey;
use super::hydrate::{dehydrate, hydrate};
use super::traits::{CacheBackend, QueryExecutor};

/// Read-through cache wrapping a query executor.
///
/// The backend handle is shared: clone the cache freely, every clone talks to
/// the same backend.
///
/// # Type Parameters
///
/// - `C`: The cache backend holding serialized results
///
/// # Example
///
/// ```ignore
/// let cache = ReadThroughCache::with_defaults(Arc::new(InMemoryCacheBackend::new()));
///
/// let query = Query::new("orders").filter("status", "active").cache_in("user:42");
/// let orders = cache.execute::<Order, _>(&query, &store).await?;
///
/// // after a write affecting user 42
/// cache.invalidate("user:42").await?;
/// ```
pub struct ReadThroughCache<C>
where
    C: CacheBackend,
{
    /// The cache backend.
    cache: Arc<C>,
    /// Cache configuration.
    config: CacheConfig,
}

impl<C> ReadThroughCache<C>
where
    C: CacheBackend,
{
    /// Create a new read-through cache.
    pub fn new(cache: Arc<C>, config: CacheConfig) -> Self {
        Self { cache, config }
    }

    /// Create a new read-through cache with default configuration.
    pub fn with_defaults(cache: Arc<C>) -> Self {
        Self::new(cache, CacheConfig::default())
    }

    /// Get the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Get a reference to the cache backend.
    pub fn backend(&self) -> &C {
        &self.cache
    }

    /// Execute a query, consulting the cache when the query opted in.
    ///
    /// - Uncached queries are delegated to `executor` untouched.
    /// - Cacheable queries are looked up under their scope and composite key.
    ///   A hit is hydrated and returned without touching the store. A miss
    ///   runs the executor, writes the serialized result back and returns the
    ///   executor's result as-is.
    ///
    /// Store errors and hydration errors propagate. Write-back errors are
    /// logged and dropped. Read errors are treated as a miss unless
    /// `fail_open_reads` is disabled.
    ///
    /// Concurrent misses for the same key are not coalesced: each one reaches
    /// the store and the last write wins.
    pub async fn execute<T, E>(&self, query: &Query, executor: &E) -> QcacheResult<QueryResult<T>>
    where
        T: Document,
        E: QueryExecutor<T> + ?Sized,
    {
        let Some(options) = query.cache_options() else {
            return executor.execute(query).await.map_err(QcacheError::from);
        };

        let scope = options.scope();
        let key = CompositeKey::for_query(query);

        if let Some(payload) = self.read(scope, &key).await? {
            tracing::debug!(
                collection = query.collection(),
                scope = %scope,
                "query cache hit"
            );
            return Ok(hydrate::<T>(&payload)?);
        }

        tracing::debug!(
            collection = query.collection(),
            scope = %scope,
            "query cache miss"
        );

        let result = executor.execute(query).await?;
        self.write_back(scope, key, &result).await;
        Ok(result)
    }

    /// Read a payload, applying the fail-open policy.
    async fn read(&self, scope: &ScopeKey, key: &CompositeKey) -> QcacheResult<Option<String>> {
        match self.cache.get(scope, key).await {
            Ok(Some(payload)) if !payload.is_empty() => Ok(Some(payload)),
            Ok(_) => Ok(None),
            Err(e) if self.config.fail_open_reads => {
                tracing::warn!(
                    scope = %scope,
                    error = %e,
                    "cache read failed, falling back to store"
                );
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Store a freshly executed result. Never fails the caller.
    async fn write_back<T: Document>(
        &self,
        scope: &ScopeKey,
        key: CompositeKey,
        result: &QueryResult<T>,
    ) {
        let payload = match dehydrate(result) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(scope = %scope, error = %e, "cache write-back skipped");
                return;
            }
        };

        match self.config.write_back {
            WriteBackMode::Detached => match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    let cache = Arc::clone(&self.cache);
                    let scope = scope.clone();
                    handle.spawn(async move {
                        store_payload(cache.as_ref(), &scope, &key, payload).await;
                    });
                }
                // No runtime to detach onto
                Err(_) => store_payload(self.cache.as_ref(), scope, &key, payload).await,
            },
            WriteBackMode::Awaited => {
                store_payload(self.cache.as_ref(), scope, &key, payload).await;
            }
        }
    }

    /// Delete every cached result under `scope`.
    ///
    /// Returns the number of entries removed. Invalidating an empty scope
    /// succeeds with 0. Backend errors propagate: callers rely on the scope
    /// being clean once this returns.
    pub async fn invalidate(&self, scope: impl Into<ScopeKey>) -> QcacheResult<u64> {
        let scope = scope.into();
        let removed = self.cache.delete_partition(&scope).await?;
        tracing::debug!(scope = %scope, removed, "query cache scope invalidated");
        Ok(removed)
    }

    /// Run a write, then invalidate `scope` if the write succeeded.
    ///
    /// The write's output is returned once the invalidation has completed. A
    /// failed write leaves the cache untouched and returns the write error.
    pub async fn invalidate_after<F, O, Er>(
        &self,
        scope: impl Into<ScopeKey>,
        write: F,
    ) -> Result<O, Er>
    where
        F: Future<Output = Result<O, Er>>,
        Er: From<QcacheError>,
    {
        let scope = scope.into();
        let output = write.await?;
        self.invalidate(scope).await.map_err(Er::from)?;
        Ok(output)
    }
}

async fn store_payload<C: CacheBackend + ?Sized>(
    cache: &C,
    scope: &ScopeKey,
    key: &CompositeKey,
    payload: String,
) {
    if let Err(e) = cache.set(scope, key, payload).await {
        tracing::warn!(scope = %scope, error = %e, "cache write-back failed");
    }
}

impl<C> Clone for ReadThroughCache<C>
where
    C: CacheBackend,
{
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            config: self.config.clone(),
        }
    }
}

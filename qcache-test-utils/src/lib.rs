//! QCACHE Test Utilities
//!
//! Centralized test infrastructure for the QCACHE workspace:
//! - Fixture document types
//! - An in-memory document store that counts executions
//! - A cache backend with switchable failures
//! - Proptest generators for predicates, scopes and documents

pub mod generators;

// Re-export core types for convenience
pub use qcache_core::{
    CacheBackendError, CacheConfig, Predicate, QcacheError, Query, QueryResult, ScopeKey,
    StoreError, WriteBackMode,
};
pub use qcache_storage::{
    CacheBackend, CacheStats, CompositeKey, InMemoryCacheBackend, QueryExecutor,
    ReadThroughCache,
};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Duration;
use uuid::Uuid;

// ============================================================================
// FIXTURES
// ============================================================================

/// Order document used across tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: u64,
    pub status: String,
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn new(user_id: u64, status: &str, total_cents: i64) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id,
            status: status.to_string(),
            total_cents,
            created_at: Utc::now(),
        }
    }
}

/// Invoice document used across tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub user_id: u64,
    pub status: String,
    pub lines: Vec<InvoiceLine>,
}

/// Nested invoice line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub sku: String,
    pub quantity: u32,
}

impl Invoice {
    pub fn new(user_id: u64, status: &str, skus: &[&str]) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id,
            status: status.to_string(),
            lines: skus
                .iter()
                .map(|sku| InvoiceLine {
                    sku: sku.to_string(),
                    quantity: 1,
                })
                .collect(),
        }
    }
}

/// Fixed timestamp for deterministic fixtures.
pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

// ============================================================================
// MOCK DOCUMENT STORE
// ============================================================================

/// In-memory document store implementing [`QueryExecutor`] for any document
/// type.
///
/// Predicates are matched by top-level field equality. Every execution is
/// counted so tests can assert whether the cache short-circuited the store.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    collections: RwLock<HashMap<String, Vec<Value>>>,
    executions: AtomicUsize,
    fail: AtomicBool,
    latency: RwLock<Option<Duration>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document into a collection.
    pub fn insert<D: Serialize>(&self, collection: &str, doc: &D) {
        let value = serde_json::to_value(doc).expect("fixture documents serialize");
        self.collections
            .write()
            .expect("store lock")
            .entry(collection.to_string())
            .or_default()
            .push(value);
    }

    /// Set `field` to `value` on every document in `collection` matching
    /// `predicate`. Returns the number of documents changed.
    pub fn update_where(
        &self,
        collection: &str,
        predicate: &Predicate,
        field: &str,
        value: Value,
    ) -> usize {
        let mut collections = self.collections.write().expect("store lock");
        let Some(docs) = collections.get_mut(collection) else {
            return 0;
        };
        let mut changed = 0;
        for doc in docs.iter_mut().filter(|doc| matches(doc, predicate)) {
            if let Value::Object(map) = doc {
                map.insert(field.to_string(), value.clone());
                changed += 1;
            }
        }
        changed
    }

    /// Number of times the store was executed.
    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }

    /// Make every following execution fail.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Delay every execution by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.write().expect("store lock") = Some(latency);
    }

    fn matching(&self, query: &Query) -> Vec<Value> {
        self.collections
            .read()
            .expect("store lock")
            .get(query.collection())
            .map(|docs| {
                docs.iter()
                    .filter(|doc| matches(doc, query.predicate()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    async fn run(&self, query: &Query) -> Result<Vec<Value>, StoreError> {
        self.executions.fetch_add(1, Ordering::SeqCst);

        let latency = *self.latency.read().expect("store lock");
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::QueryFailed {
                collection: query.collection().to_string(),
                reason: "injected failure".to_string(),
            });
        }
        Ok(self.matching(query))
    }

    /// View of this store returning only the first match (`findOne`).
    pub fn find_one(&self) -> FindOne<'_> {
        FindOne { store: self }
    }
}

fn matches(doc: &Value, predicate: &Predicate) -> bool {
    predicate
        .iter()
        .all(|(field, expected)| doc.get(field) == Some(expected))
}

fn decode<T: qcache_core::Document>(query: &Query, value: Value) -> Result<T, StoreError> {
    serde_json::from_value(value).map_err(|e| StoreError::QueryFailed {
        collection: query.collection().to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl<T: qcache_core::Document> QueryExecutor<T> for InMemoryDocumentStore {
    async fn execute(&self, query: &Query) -> Result<QueryResult<T>, StoreError> {
        let docs = self
            .run(query)
            .await?
            .into_iter()
            .map(|value| decode(query, value))
            .collect::<Result<Vec<T>, _>>()?;
        Ok(QueryResult::Many(docs))
    }
}

/// Single-document view over an [`InMemoryDocumentStore`].
#[derive(Debug, Clone, Copy)]
pub struct FindOne<'a> {
    store: &'a InMemoryDocumentStore,
}

#[async_trait]
impl<'a, T: qcache_core::Document> QueryExecutor<T> for FindOne<'a> {
    async fn execute(&self, query: &Query) -> Result<QueryResult<T>, StoreError> {
        match self.store.run(query).await?.into_iter().next() {
            Some(value) => Ok(QueryResult::One(decode(query, value)?)),
            None => Ok(QueryResult::Empty),
        }
    }
}

// ============================================================================
// FLAKY CACHE BACKEND
// ============================================================================

/// In-memory cache backend whose operations can be made to fail on demand.
#[derive(Debug, Default)]
pub struct FlakyCacheBackend {
    inner: InMemoryCacheBackend,
    fail_get: AtomicBool,
    fail_set: AtomicBool,
    fail_delete: AtomicBool,
    sets: AtomicUsize,
}

impl FlakyCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &InMemoryCacheBackend {
        &self.inner
    }

    pub fn fail_gets(&self, fail: bool) {
        self.fail_get.store(fail, Ordering::SeqCst);
    }

    pub fn fail_sets(&self, fail: bool) {
        self.fail_set.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    /// Number of `set` calls attempted, successful or not.
    pub fn set_attempts(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    fn unavailable() -> CacheBackendError {
        CacheBackendError::Unavailable {
            reason: "injected failure".to_string(),
        }
    }
}

#[async_trait]
impl CacheBackend for FlakyCacheBackend {
    async fn get(
        &self,
        partition: &ScopeKey,
        key: &CompositeKey,
    ) -> Result<Option<String>, CacheBackendError> {
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.inner.get(partition, key).await
    }

    async fn set(
        &self,
        partition: &ScopeKey,
        key: &CompositeKey,
        payload: String,
    ) -> Result<(), CacheBackendError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        if self.fail_set.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.inner.set(partition, key, payload).await
    }

    async fn delete_partition(&self, partition: &ScopeKey) -> Result<u64, CacheBackendError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.inner.delete_partition(partition).await
    }

    async fn stats(&self) -> Result<CacheStats, CacheBackendError> {
        self.inner.stats().await
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

/// A store seeded with orders and invoices for users 42 and 7.
pub fn seeded_store() -> InMemoryDocumentStore {
    let store = InMemoryDocumentStore::new();
    let mut first = Order::new(42, "active", 1_250);
    first.created_at = fixed_time();
    store.insert("orders", &first);
    store.insert("orders", &Order::new(42, "active", 990));
    store.insert("orders", &Order::new(42, "shipped", 4_500));
    store.insert("orders", &Order::new(7, "active", 300));
    store.insert("invoices", &Invoice::new(42, "active", &["sku-1", "sku-2"]));
    store.insert("invoices", &Invoice::new(7, "void", &["sku-3"]));
    store
}

/// Read-through cache over an in-memory backend with awaited write-back.
pub fn memory_cache() -> ReadThroughCache<InMemoryCacheBackend> {
    ReadThroughCache::new(
        std::sync::Arc::new(InMemoryCacheBackend::new()),
        CacheConfig::new().with_write_back(WriteBackMode::Awaited),
    )
}

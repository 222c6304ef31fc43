//! Query description and caching options.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

use crate::canonical::canonical_json;

/// The query shape: an arbitrary JSON object, treated as opaque data.
pub type Predicate = Map<String, Value>;

// ============================================================================
// SCOPE KEY
// ============================================================================

/// Identifies the cache partition an entry lives under.
///
/// The scope value is stored in its canonical JSON form, so a scope built from
/// `"user:42"` is addressed as `"\"user:42\""` on every path (store, read and
/// invalidate). The default scope is the empty string. Build scopes from
/// serialized data with [`ScopeKey::from_serialize`] so they are canonicalized
/// too.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeKey(String);

impl ScopeKey {
    /// Build a scope key from any JSON value.
    pub fn new(scope: impl Into<Value>) -> Self {
        Self(canonical_json(&scope.into()))
    }

    /// Build a scope key from a serializable value.
    ///
    /// Fails only for values serde_json cannot represent (e.g. maps with
    /// non-string keys).
    pub fn from_serialize<S: Serialize + ?Sized>(scope: &S) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::to_value(scope)?))
    }

    /// The serialized partition name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Raw bytes of the partition name.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl Default for ScopeKey {
    fn default() -> Self {
        Self::new("")
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScopeKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ScopeKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&String> for ScopeKey {
    fn from(s: &String) -> Self {
        Self::new(s.as_str())
    }
}

impl From<i64> for ScopeKey {
    fn from(n: i64) -> Self {
        Self::new(n)
    }
}

impl From<u64> for ScopeKey {
    fn from(n: u64) -> Self {
        Self::new(n)
    }
}

impl From<Value> for ScopeKey {
    fn from(v: Value) -> Self {
        Self::new(v)
    }
}

// ============================================================================
// CACHE OPTIONS
// ============================================================================

/// Per-query caching options. A query carries these only when it has opted
/// into the cached path.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CacheOptions {
    scope: ScopeKey,
}

impl CacheOptions {
    pub fn new(scope: impl Into<ScopeKey>) -> Self {
        Self {
            scope: scope.into(),
        }
    }

    pub fn scope(&self) -> &ScopeKey {
        &self.scope
    }
}

// ============================================================================
// QUERY
// ============================================================================

/// A read against one collection.
///
/// Queries are plain values. Opting into the cache returns a new query rather
/// than flipping a flag on a shared one:
///
/// ```
/// use qcache_core::Query;
/// use serde_json::json;
///
/// let query = Query::new("orders")
///     .filter("status", json!("active"))
///     .cache_in("user:42");
/// assert!(query.is_cacheable());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    collection: String,
    predicate: Predicate,
    cache: Option<CacheOptions>,
}

impl Query {
    /// Create a query matching every document in `collection`.
    pub fn new(collection: impl Into<String>) -> Self {
        Self::with_predicate(collection, Predicate::new())
    }

    /// Create a query with an explicit predicate.
    pub fn with_predicate(collection: impl Into<String>, predicate: Predicate) -> Self {
        Self {
            collection: collection.into(),
            predicate,
            cache: None,
        }
    }

    /// Add a field condition to the predicate.
    pub fn filter(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.predicate.insert(field.into(), value.into());
        self
    }

    /// Opt into the cached path under the default (empty) scope.
    pub fn cache(self) -> Self {
        self.cache_with(CacheOptions::default())
    }

    /// Opt into the cached path under `scope`.
    pub fn cache_in(self, scope: impl Into<ScopeKey>) -> Self {
        self.cache_with(CacheOptions::new(scope))
    }

    /// Opt into the cached path with explicit options.
    pub fn cache_with(mut self, options: CacheOptions) -> Self {
        self.cache = Some(options);
        self
    }

    /// Drop any caching options; the query will always reach the store.
    pub fn uncached(mut self) -> Self {
        self.cache = None;
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    pub fn is_cacheable(&self) -> bool {
        self.cache.is_some()
    }

    pub fn cache_options(&self) -> Option<&CacheOptions> {
        self.cache.as_ref()
    }

    /// Scope the query is cached under, if it is cacheable.
    pub fn scope(&self) -> Option<&ScopeKey> {
        self.cache.as_ref().map(CacheOptions::scope)
    }
}

//! Composite cache keys derived from query shape.
//!
//! A `CompositeKey` can only be produced by [`CompositeKey::compose`], so every
//! key in the cache went through the same canonicalization. Two predicates that
//! are structurally equal yield the same key no matter what order their fields
//! were inserted in.

use std::fmt;

use qcache_core::{canonical_json, Predicate, Query};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Field the collection name is merged into.
pub const COLLECTION_FIELD: &str = "collection";

/// Deterministic identifier for one cached query result within a scope.
///
/// # Format
///
/// The key is the canonical JSON of `{ ...predicate, collection: <name> }`:
/// object keys sorted at every level, no whitespace. A predicate field named
/// `collection` is overwritten by the target collection, as an object spread
/// would.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompositeKey {
    inner: String,
}

impl CompositeKey {
    /// Compose the key for `predicate` against `collection`.
    ///
    /// The caller's predicate is left untouched; the collection is merged into
    /// a copy.
    pub fn compose(predicate: &Predicate, collection: &str) -> Self {
        let mut merged = predicate.clone();
        merged.insert(
            COLLECTION_FIELD.to_string(),
            Value::String(collection.to_string()),
        );
        Self {
            inner: canonical_json(&Value::Object(merged)),
        }
    }

    /// Compose the key for a query.
    pub fn for_query(query: &Query) -> Self {
        Self::compose(query.predicate(), query.collection())
    }

    /// The canonical string form.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// SHA-256 of the canonical form.
    ///
    /// Used by backends with bounded key sizes.
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.inner.as_bytes());
        hasher.finalize().into()
    }

    /// Hex-encoded [`digest`](Self::digest).
    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest())
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner)
    }
}

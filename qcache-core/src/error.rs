//! Error types for QCACHE operations

use thiserror::Error;

/// Errors raised by the underlying document store.
///
/// These are always propagated to the caller unchanged; the cache layer never
/// masks a store failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Query against {collection} failed: {reason}")]
    QueryFailed { collection: String, reason: String },

    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Errors raised by a cache backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheBackendError {
    #[error("Cache backend unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Cache {operation} failed: {reason}")]
    OperationFailed { operation: String, reason: String },

    #[error("Cache lock poisoned")]
    LockPoisoned,
}

/// Errors raised while turning a cached payload back into documents, or a
/// result into a payload.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HydrationError {
    #[error("Corrupt cache payload: {reason}")]
    CorruptPayload { reason: String },

    #[error("Element {index} does not match the document type: {reason}")]
    InvalidElement { index: usize, reason: String },

    #[error("Failed to serialize result: {reason}")]
    SerializationFailed { reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all QCACHE errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QcacheError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheBackendError),

    #[error("Hydration error: {0}")]
    Hydration(#[from] HydrationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl QcacheError {
    /// True when the error came from the cache backend rather than the store
    /// or the payload itself.
    pub fn is_cache_unavailable(&self) -> bool {
        matches!(self, QcacheError::Cache(_))
    }
}

/// Result type alias for QCACHE operations.
pub type QcacheResult<T> = Result<T, QcacheError>;

// =============================================================================
// TESTS
// =============================================================================

//! QCACHE Core - Query and Result Types
//!
//! Pure data structures shared by the cache layer and its callers: the query
//! description, scope keys, result shapes, configuration and errors.
//! This crate contains no I/O.

pub mod canonical;
pub mod config;
pub mod error;
pub mod query;
pub mod result;

pub use canonical::canonical_json;
pub use config::{CacheConfig, LmdbConfig, WriteBackMode};
pub use error::{
    CacheBackendError, ConfigError, HydrationError, QcacheError, QcacheResult, StoreError,
};
pub use query::{CacheOptions, Predicate, Query, ScopeKey};
pub use result::{Document, QueryResult};

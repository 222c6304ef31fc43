//! LMDB-backed cache implementation with scope partitioning.
//!
//! Uses the heed crate (Rust bindings for LMDB) to provide a memory-mapped
//! key-value store for cached query results that survives process restarts.
//!
//! # Key Layout
//!
//! LMDB keys are limited to 511 bytes, while composite keys grow with the
//! predicate. Both halves are therefore hashed:
//!
//! - Bytes 0-31: SHA-256 of the scope key
//! - Byte 32: separator (0xFF)
//! - Bytes 33-64: SHA-256 of the composite key
//!
//! All entries of one scope are contiguous, so dropping a scope is a single
//! range delete inside one write transaction.

use std::collections::HashMap;
use std::ops::Bound;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use qcache_core::{CacheBackendError, LmdbConfig, ScopeKey};
use sha2::{Digest, Sha256};

use super::composite_key::CompositeKey;
use super::traits::{CacheBackend, CacheStats};

/// Separator byte between the scope hash and the key hash.
const SEPARATOR: u8 = 0xFF;
/// Length of the scope prefix (hash + separator).
const PREFIX_LEN: usize = 33;
/// Length of a full entry key.
const KEY_LEN: usize = 65;

/// Error type for LMDB cache operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbCacheError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Stored bytes are not UTF-8.
    #[error("Invalid payload encoding: {0}")]
    Encoding(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The statistics lock was poisoned by a panicking thread.
    #[error("Statistics lock poisoned")]
    LockPoisoned,
}

/// Convert LmdbCacheError to CacheBackendError.
impl From<LmdbCacheError> for CacheBackendError {
    fn from(e: LmdbCacheError) -> Self {
        match e {
            LmdbCacheError::EnvOpen(_) | LmdbCacheError::DbOpen(_) | LmdbCacheError::Io(_) => {
                CacheBackendError::Unavailable {
                    reason: e.to_string(),
                }
            }
            LmdbCacheError::LockPoisoned => CacheBackendError::LockPoisoned,
            LmdbCacheError::Transaction(_) | LmdbCacheError::Encoding(_) => {
                CacheBackendError::OperationFailed {
                    operation: "lmdb".to_string(),
                    reason: e.to_string(),
                }
            }
        }
    }
}

fn sha256(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// Prefix shared by every entry of a scope.
fn scope_prefix(partition: &ScopeKey) -> [u8; PREFIX_LEN] {
    let mut prefix = [0u8; PREFIX_LEN];
    prefix[0..32].copy_from_slice(&sha256(partition.as_bytes()));
    prefix[32] = SEPARATOR;
    prefix
}

/// Full LMDB key for an entry.
fn entry_key(partition: &ScopeKey, key: &CompositeKey) -> [u8; KEY_LEN] {
    let mut bytes = [0u8; KEY_LEN];
    bytes[0..PREFIX_LEN].copy_from_slice(&scope_prefix(partition));
    bytes[PREFIX_LEN..KEY_LEN].copy_from_slice(&key.digest());
    bytes
}

/// Per-scope hit/miss tracking.
#[derive(Debug, Default)]
struct ScopeStatsInner {
    hits: u64,
    misses: u64,
}

/// LMDB-backed cache partitioned by scope.
///
/// # Example
///
/// ```ignore
/// use qcache_storage::LmdbCacheBackend;
///
/// let backend = LmdbCacheBackend::new("/tmp/qcache", 100)?;
/// let cache = ReadThroughCache::with_defaults(Arc::new(backend));
/// ```
pub struct LmdbCacheBackend {
    /// The LMDB environment.
    env: Env,
    /// The main database (single unnamed database).
    db: Database<Bytes, Bytes>,
    /// Per-scope statistics, kept only for scopes that have been written or
    /// hit. Dropped with the scope on `delete_partition`.
    scope_stats: RwLock<HashMap<ScopeKey, ScopeStatsInner>>,
    /// Misses against scopes with no tracked entry.
    untracked_misses: AtomicU64,
}

impl LmdbCacheBackend {
    /// Create a new LMDB cache backend.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the database in megabytes
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory cannot be created
    /// - LMDB environment cannot be opened
    /// - Database cannot be created
    pub fn new<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbCacheError> {
        // Ensure directory exists
        std::fs::create_dir_all(&path)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbCacheError::EnvOpen(e.to_string()))?;

        let mut wtxn = env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbCacheError::DbOpen(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        Ok(Self {
            env,
            db,
            scope_stats: RwLock::new(HashMap::new()),
            untracked_misses: AtomicU64::new(0),
        })
    }

    /// Create a backend from configuration.
    pub fn from_config(config: &LmdbConfig) -> Result<Self, LmdbCacheError> {
        Self::new(&config.path, config.max_size_mb)
    }

    fn record_hit(&self, partition: &ScopeKey) -> Result<(), LmdbCacheError> {
        let mut stats = self
            .scope_stats
            .write()
            .map_err(|_| LmdbCacheError::LockPoisoned)?;
        stats.entry(partition.clone()).or_default().hits += 1;
        Ok(())
    }

    /// Misses never create a tracking entry, so reads of empty scopes do not
    /// grow the map.
    fn record_miss(&self, partition: &ScopeKey) -> Result<(), LmdbCacheError> {
        let mut stats = self
            .scope_stats
            .write()
            .map_err(|_| LmdbCacheError::LockPoisoned)?;
        match stats.get_mut(partition) {
            Some(scope) => scope.misses += 1,
            None => {
                self.untracked_misses.fetch_add(1, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    fn track_scope(&self, partition: &ScopeKey) -> Result<(), LmdbCacheError> {
        let mut stats = self
            .scope_stats
            .write()
            .map_err(|_| LmdbCacheError::LockPoisoned)?;
        stats.entry(partition.clone()).or_default();
        Ok(())
    }

    /// Number of scopes with hit/miss tracking.
    pub fn tracked_scopes(&self) -> Result<usize, LmdbCacheError> {
        self.scope_stats
            .read()
            .map(|stats| stats.len())
            .map_err(|_| LmdbCacheError::LockPoisoned)
    }

    /// Get hit/miss statistics and entry count for a single scope.
    ///
    /// Misses recorded before the scope held any entry are not attributed to
    /// it; they only show up in [`CacheBackend::stats`].
    pub fn scope_stats(&self, partition: &ScopeKey) -> Result<CacheStats, LmdbCacheError> {
        let (hits, misses) = self
            .scope_stats
            .read()
            .map_err(|_| LmdbCacheError::LockPoisoned)?
            .get(partition)
            .map(|s| (s.hits, s.misses))
            .unwrap_or((0, 0));

        let prefix = scope_prefix(partition);
        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
        let iter = self
            .db
            .prefix_iter(&rtxn, &prefix[..])
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        let mut stats = CacheStats {
            hits,
            misses,
            ..Default::default()
        };
        for result in iter {
            let (_, value) = result.map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
            stats.entry_count += 1;
            stats.memory_bytes += value.len() as u64;
        }
        if stats.entry_count > 0 {
            stats.partitions = 1;
        }
        Ok(stats)
    }
}

#[async_trait]
impl CacheBackend for LmdbCacheBackend {
    async fn get(
        &self,
        partition: &ScopeKey,
        key: &CompositeKey,
    ) -> Result<Option<String>, CacheBackendError> {
        let encoded_key = entry_key(partition, key);

        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        match self.db.get(&rtxn, &encoded_key[..]) {
            Ok(Some(bytes)) => {
                self.record_hit(partition)?;
                let payload = std::str::from_utf8(bytes)
                    .map_err(|e| LmdbCacheError::Encoding(e.to_string()))?;
                Ok(Some(payload.to_string()))
            }
            Ok(None) => {
                self.record_miss(partition)?;
                Ok(None)
            }
            Err(e) => {
                self.record_miss(partition)?;
                Err(LmdbCacheError::Transaction(e.to_string()).into())
            }
        }
    }

    async fn set(
        &self,
        partition: &ScopeKey,
        key: &CompositeKey,
        payload: String,
    ) -> Result<(), CacheBackendError> {
        let encoded_key = entry_key(partition, key);

        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        self.db
            .put(&mut wtxn, &encoded_key[..], payload.as_bytes())
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        self.track_scope(partition)?;
        Ok(())
    }

    async fn delete_partition(&self, partition: &ScopeKey) -> Result<u64, CacheBackendError> {
        let prefix = scope_prefix(partition);
        let mut start = [0x00u8; KEY_LEN];
        let mut end = [0xFFu8; KEY_LEN];
        start[0..PREFIX_LEN].copy_from_slice(&prefix);
        end[0..PREFIX_LEN].copy_from_slice(&prefix);

        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        let range = (Bound::Included(&start[..]), Bound::Included(&end[..]));
        let deleted = self
            .db
            .delete_range(&mut wtxn, &range)
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        self.scope_stats
            .write()
            .map_err(|_| LmdbCacheError::LockPoisoned)?
            .remove(partition);

        Ok(deleted as u64)
    }

    async fn stats(&self) -> Result<CacheStats, CacheBackendError> {
        let (hits, misses) = self
            .scope_stats
            .read()
            .map_err(|_| LmdbCacheError::LockPoisoned)?
            .values()
            .fold((0, 0), |(h, m), s| (h + s.hits, m + s.misses));
        let misses = misses + self.untracked_misses.load(Ordering::Relaxed);

        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
        let iter = self
            .db
            .iter(&rtxn)
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        let mut stats = CacheStats {
            hits,
            misses,
            ..Default::default()
        };
        let mut last_prefix: Option<[u8; PREFIX_LEN]> = None;
        for result in iter {
            let (key, value) = result.map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;
            stats.entry_count += 1;
            stats.memory_bytes += value.len() as u64;

            // Keys are sorted, so each scope's entries are adjacent
            if key.len() >= PREFIX_LEN && last_prefix.map_or(true, |p| p[..] != key[..PREFIX_LEN]) {
                let mut prefix = [0u8; PREFIX_LEN];
                prefix.copy_from_slice(&key[..PREFIX_LEN]);
                last_prefix = Some(prefix);
                stats.partitions += 1;
            }
        }
        Ok(stats)
    }
}

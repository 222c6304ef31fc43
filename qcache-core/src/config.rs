//! Configuration types
//!
//! Configuration is loaded from environment variables with defaults suitable
//! for development. The `try_*` constructors report malformed values, the
//! plain ones fall back to defaults.

use std::path::PathBuf;

use crate::error::ConfigError;

/// Environment variable selecting the write-back mode.
pub const ENV_WRITE_BACK: &str = "QCACHE_WRITE_BACK";
/// Environment variable toggling fail-open cache reads.
pub const ENV_FAIL_OPEN_READS: &str = "QCACHE_FAIL_OPEN_READS";
/// Environment variable holding the LMDB directory.
pub const ENV_LMDB_PATH: &str = "QCACHE_LMDB_PATH";
/// Environment variable holding the LMDB map size in megabytes.
pub const ENV_LMDB_MAX_SIZE_MB: &str = "QCACHE_LMDB_MAX_SIZE_MB";

/// How the post-miss cache write is performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteBackMode {
    /// The caller waits for the cache write (errors are still swallowed).
    #[default]
    Awaited,
    /// The cache write runs as a spawned task; the caller returns immediately.
    Detached,
}

impl WriteBackMode {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_lowercase().as_str() {
            "awaited" | "await" | "sync" => Ok(WriteBackMode::Awaited),
            "detached" | "spawn" | "async" => Ok(WriteBackMode::Detached),
            _ => Err(ConfigError::InvalidValue {
                field: ENV_WRITE_BACK.to_string(),
                value: value.to_string(),
                reason: "expected `awaited` or `detached`".to_string(),
            }),
        }
    }
}

fn parse_bool(field: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}

// ============================================================================
// READ-THROUGH CACHE CONFIGURATION
// ============================================================================

/// Configuration for the read-through cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// How the write-back after a miss is performed.
    pub write_back: WriteBackMode,
    /// Treat a failing cache read as a miss instead of failing the query.
    pub fail_open_reads: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            write_back: WriteBackMode::Awaited,
            fail_open_reads: true,
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the write-back mode.
    pub fn with_write_back(mut self, mode: WriteBackMode) -> Self {
        self.write_back = mode;
        self
    }

    /// Enable or disable fail-open reads.
    pub fn with_fail_open_reads(mut self, enabled: bool) -> Self {
        self.fail_open_reads = enabled;
        self
    }

    /// Load from the process environment, falling back to defaults for
    /// missing or malformed values.
    ///
    /// Environment variables:
    /// - `QCACHE_WRITE_BACK`: `awaited` or `detached` (default: awaited)
    /// - `QCACHE_FAIL_OPEN_READS`: `true` or `false` (default: true)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let write_back = std::env::var(ENV_WRITE_BACK)
            .ok()
            .and_then(|s| WriteBackMode::parse(&s).ok())
            .unwrap_or(defaults.write_back);
        let fail_open_reads = std::env::var(ENV_FAIL_OPEN_READS)
            .ok()
            .and_then(|s| parse_bool(ENV_FAIL_OPEN_READS, &s).ok())
            .unwrap_or(defaults.fail_open_reads);

        Self {
            write_back,
            fail_open_reads,
        }
    }

    /// Load from the process environment, rejecting malformed values.
    pub fn try_from_env() -> Result<Self, ConfigError> {
        Self::try_from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup.
    pub fn try_from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(value) = lookup(ENV_WRITE_BACK) {
            config.write_back = WriteBackMode::parse(&value)?;
        }
        if let Some(value) = lookup(ENV_FAIL_OPEN_READS) {
            config.fail_open_reads = parse_bool(ENV_FAIL_OPEN_READS, &value)?;
        }
        Ok(config)
    }
}

// ============================================================================
// LMDB BACKEND CONFIGURATION
// ============================================================================

/// Configuration for the LMDB cache backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LmdbConfig {
    /// Directory holding the LMDB environment.
    pub path: PathBuf,
    /// Maximum map size in megabytes.
    pub max_size_mb: usize,
}

impl Default for LmdbConfig {
    fn default() -> Self {
        Self {
            path: std::env::temp_dir().join("qcache"),
            max_size_mb: 256,
        }
    }
}

impl LmdbConfig {
    pub fn new(path: impl Into<PathBuf>, max_size_mb: usize) -> Self {
        Self {
            path: path.into(),
            max_size_mb,
        }
    }

    /// Load from the process environment, falling back to defaults.
    ///
    /// Environment variables:
    /// - `QCACHE_LMDB_PATH`: directory for the LMDB files (default: `$TMPDIR/qcache`)
    /// - `QCACHE_LMDB_MAX_SIZE_MB`: map size in megabytes (default: 256)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let path = std::env::var(ENV_LMDB_PATH)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.path);
        let max_size_mb = std::env::var(ENV_LMDB_MAX_SIZE_MB)
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|mb| *mb > 0)
            .unwrap_or(defaults.max_size_mb);

        Self { path, max_size_mb }
    }

    /// Load from the process environment, rejecting malformed values.
    pub fn try_from_env() -> Result<Self, ConfigError> {
        Self::try_from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup.
    pub fn try_from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(path) = lookup(ENV_LMDB_PATH) {
            if path.trim().is_empty() {
                return Err(ConfigError::MissingRequired {
                    field: ENV_LMDB_PATH.to_string(),
                });
            }
            config.path = PathBuf::from(path);
        }
        if let Some(value) = lookup(ENV_LMDB_MAX_SIZE_MB) {
            config.max_size_mb = match value.trim().parse::<usize>() {
                Ok(mb) if mb > 0 => mb,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: ENV_LMDB_MAX_SIZE_MB.to_string(),
                        value,
                        reason: "expected a positive integer".to_string(),
                    })
                }
            };
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_cache_config_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.write_back, WriteBackMode::Awaited);
        assert!(config.fail_open_reads);
    }

    #[test]
    fn test_cache_config_builder() {
        let config = CacheConfig::new()
            .with_write_back(WriteBackMode::Detached)
            .with_fail_open_reads(false);

        assert_eq!(config.write_back, WriteBackMode::Detached);
        assert!(!config.fail_open_reads);
    }

    #[test]
    fn test_cache_config_from_lookup() {
        let config = CacheConfig::try_from_lookup(lookup(&[
            (ENV_WRITE_BACK, "Detached"),
            (ENV_FAIL_OPEN_READS, "false"),
        ]))
        .expect("valid config");

        assert_eq!(config.write_back, WriteBackMode::Detached);
        assert!(!config.fail_open_reads);
    }

    #[test]
    fn test_cache_config_rejects_unknown_mode() {
        let err = CacheConfig::try_from_lookup(lookup(&[(ENV_WRITE_BACK, "sometimes")]))
            .expect_err("unknown mode");
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == ENV_WRITE_BACK));
    }

    #[test]
    fn test_cache_config_rejects_bad_bool() {
        let err = CacheConfig::try_from_lookup(lookup(&[(ENV_FAIL_OPEN_READS, "maybe")]))
            .expect_err("bad bool");
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_lmdb_config_from_lookup() {
        let config = LmdbConfig::try_from_lookup(lookup(&[
            (ENV_LMDB_PATH, "/var/cache/qcache"),
            (ENV_LMDB_MAX_SIZE_MB, "64"),
        ]))
        .expect("valid config");

        assert_eq!(config.path, PathBuf::from("/var/cache/qcache"));
        assert_eq!(config.max_size_mb, 64);
    }

    #[test]
    fn test_lmdb_config_rejects_zero_size() {
        let err = LmdbConfig::try_from_lookup(lookup(&[(ENV_LMDB_MAX_SIZE_MB, "0")]))
            .expect_err("zero size");
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_lmdb_config_rejects_empty_path() {
        let err = LmdbConfig::try_from_lookup(lookup(&[(ENV_LMDB_PATH, "  ")]))
            .expect_err("empty path");
        assert!(matches!(err, ConfigError::MissingRequired { .. }));
    }
}

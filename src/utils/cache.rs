//! Content-addressed disk cache for API responses.
//!
//! Each response is stored under the SHA-256 fingerprint of its request.
//!
//! # Cache Structure
//!
//! ```text
//! <cache dir>/
//!   <fingerprint>.json        response payload
//!   <fingerprint>.metadata    originating path and parameters
//! ```
//!
//! Entries never expire. A store without a directory is disabled: every
//! lookup misses and nothing is written.

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::api::ClientError;
use crate::models::QueryParams;

/// Key under which the request path is folded into the canonical form
const PATH_KEY: &str = "path";

const PAYLOAD_EXTENSION: &str = "json";
const METADATA_EXTENSION: &str = "metadata";

/// Deterministic identity of a request, used as the cache key.
///
/// Derived from the sorted parameters plus the path, so the order in which
/// parameters were added never changes the fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestFingerprint(String);

impl RequestFingerprint {
    /// Fingerprint a request
    pub fn compute(path: &str, params: &QueryParams) -> Self {
        let canonical = serde_json::to_string(&canonical_request(path, params))
            .unwrap_or_default();
        let digest = Sha256::digest(canonical.as_bytes());
        Self(format!("{:x}", digest))
    }

    /// Hex-encoded digest
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sorted `{params..., path}` map that is hashed and written as the sidecar
pub fn canonical_request(path: &str, params: &QueryParams) -> BTreeMap<String, String> {
    let mut key = params.as_map().clone();
    key.insert(PATH_KEY.to_string(), path.to_string());
    key
}

/// Result of a cache lookup
#[derive(Debug, Clone, PartialEq)]
pub enum CacheResult<T> {
    /// Item was found
    Hit(T),

    /// Item was not found
    Miss,
}

/// File-backed response cache
#[derive(Debug, Clone, Default)]
pub struct CacheStore {
    dir: Option<PathBuf>,
}

impl CacheStore {
    /// Open a cache rooted at `dir`, creating the directory if needed
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, ClientError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| ClientError::CacheIo {
            path: dir.clone(),
            source,
        })?;
        tracing::debug!("Cache initialized at: {}", dir.display());
        Ok(Self { dir: Some(dir) })
    }

    /// A store that never hits and never writes
    pub fn disabled() -> Self {
        Self { dir: None }
    }

    /// Open `dir` when given, otherwise return a disabled store
    pub fn from_dir(dir: Option<&Path>) -> Result<Self, ClientError> {
        match dir {
            Some(dir) => Self::open(dir),
            None => Ok(Self::disabled()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.dir.is_some()
    }

    fn entry_path(dir: &Path, fingerprint: &RequestFingerprint, extension: &str) -> PathBuf {
        dir.join(format!("{}.{}", fingerprint, extension))
    }

    /// Read the payload stored for `fingerprint`.
    ///
    /// An absent file is a miss. Any other I/O failure, including a payload
    /// that is no longer valid JSON, is returned as [`ClientError::CacheIo`].
    pub fn lookup(&self, fingerprint: &RequestFingerprint) -> Result<CacheResult<Value>, ClientError> {
        let Some(dir) = &self.dir else {
            return Ok(CacheResult::Miss);
        };

        let path = Self::entry_path(dir, fingerprint, PAYLOAD_EXTENSION);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("Cache MISS: {}", fingerprint);
                return Ok(CacheResult::Miss);
            }
            Err(source) => return Err(ClientError::CacheIo { path, source }),
        };

        let payload = serde_json::from_str(&content).map_err(|e| ClientError::CacheIo {
            path: path.clone(),
            source: io::Error::new(io::ErrorKind::InvalidData, e.to_string()),
        })?;

        tracing::debug!("Cache HIT: {} at {}", fingerprint, path.display());
        Ok(CacheResult::Hit(payload))
    }

    /// Persist `payload` under `fingerprint`, with a sidecar describing the
    /// request. Each file is written to a temporary file and renamed into
    /// place, so concurrent writers leave the last complete payload.
    pub fn store(
        &self,
        fingerprint: &RequestFingerprint,
        payload: &Value,
        path: &str,
        params: &QueryParams,
    ) -> Result<(), ClientError> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };

        let payload_path = Self::entry_path(dir, fingerprint, PAYLOAD_EXTENSION);
        let payload_bytes = serde_json::to_vec(payload)?;
        write_atomic(dir, &payload_path, &payload_bytes)?;

        let metadata_path = Self::entry_path(dir, fingerprint, METADATA_EXTENSION);
        let metadata = serde_json::to_vec_pretty(&canonical_request(path, params))?;
        write_atomic(dir, &metadata_path, &metadata)?;

        tracing::debug!("Cached {} at {}", path, payload_path.display());
        Ok(())
    }

    /// Remove every cached entry
    pub fn clear(&self) -> Result<(), ClientError> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };

        let io_err = |source| ClientError::CacheIo {
            path: dir.clone(),
            source,
        };
        for entry in fs::read_dir(dir).map_err(io_err)? {
            let entry = entry.map_err(io_err)?;
            let path = entry.path();
            if is_cache_file(&path) {
                fs::remove_file(&path).map_err(|source| ClientError::CacheIo {
                    path: path.clone(),
                    source,
                })?;
            }
        }
        tracing::info!("Cache cleared");
        Ok(())
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let Some(dir) = &self.dir else {
            return CacheStats::disabled();
        };

        let mut stats = CacheStats {
            enabled: true,
            cache_dir: Some(dir.clone()),
            entry_count: 0,
            size_kb: 0,
        };
        let mut bytes = 0;
        if let Ok(entries) = dir.read_dir() {
            for entry in entries.flatten() {
                let path = entry.path();
                if !is_cache_file(&path) {
                    continue;
                }
                if path.extension().and_then(|e| e.to_str()) == Some(PAYLOAD_EXTENSION) {
                    stats.entry_count += 1;
                }
                bytes += entry.metadata().map(|m| m.len()).unwrap_or(0);
            }
        }
        stats.size_kb = bytes / 1024;
        stats
    }
}

fn is_cache_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some(PAYLOAD_EXTENSION) | Some(METADATA_EXTENSION)
    )
}

fn write_atomic(dir: &Path, target: &Path, bytes: &[u8]) -> Result<(), ClientError> {
    let io_err = |source| ClientError::CacheIo {
        path: target.to_path_buf(),
        source,
    };
    let mut file = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
    file.write_all(bytes).map_err(io_err)?;
    file.persist(target).map_err(|e| io_err(e.error))?;
    Ok(())
}

/// Statistics about the cache
#[derive(Debug, Clone, serde::Serialize)]
pub struct CacheStats {
    /// Whether caching is enabled
    pub enabled: bool,

    /// Cache directory path
    pub cache_dir: Option<PathBuf>,

    /// Number of cached responses
    pub entry_count: usize,

    /// Size of payloads and sidecars in KB
    pub size_kb: u64,
}

impl CacheStats {
    fn disabled() -> Self {
        Self {
            enabled: false,
            cache_dir: None,
            entry_count: 0,
            size_kb: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ParamBuilder;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_fingerprint_ignores_call_order() {
        let a = ParamBuilder::new()
            .with_query("movie", Some(true))
            .with_sender("Studio", None)
            .with_amount(50)
            .unwrap();
        let b = ParamBuilder::new()
            .with_amount(50)
            .unwrap()
            .with_sender("Studio", None)
            .with_query("movie", Some(true));

        assert_eq!(
            RequestFingerprint::compute("/notices/search.json", a.params()),
            RequestFingerprint::compute("/notices/search.json", b.params())
        );
    }

    #[test]
    fn test_fingerprint_depends_on_path_and_values() {
        let params = ParamBuilder::new().with_query("movie", None).into_params();
        let search = RequestFingerprint::compute("/notices/search.json", &params);
        let entities = RequestFingerprint::compute("/entities/search.json", &params);
        assert_ne!(search, entities);

        let other = ParamBuilder::new().with_query("movies", None).into_params();
        assert_ne!(
            search,
            RequestFingerprint::compute("/notices/search.json", &other)
        );
    }

    #[test]
    fn test_fingerprint_format() {
        let fp = RequestFingerprint::compute("/topics.json", &QueryParams::new());
        assert_eq!(fp.as_str().len(), 64);
        assert!(fp.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_store_and_lookup() {
        let temp_dir = TempDir::new().unwrap();
        let cache = CacheStore::open(temp_dir.path()).unwrap();
        let params = ParamBuilder::new().with_query("test", None).into_params();
        let fp = RequestFingerprint::compute("/notices/search.json", &params);

        assert_eq!(cache.lookup(&fp).unwrap(), CacheResult::Miss);

        let payload = json!({"notices": [], "meta": {}});
        cache
            .store(&fp, &payload, "/notices/search.json", &params)
            .unwrap();

        assert_eq!(cache.lookup(&fp).unwrap(), CacheResult::Hit(payload));

        let sidecar = temp_dir.path().join(format!("{}.metadata", fp));
        let sidecar: BTreeMap<String, String> =
            serde_json::from_str(&fs::read_to_string(sidecar).unwrap()).unwrap();
        assert_eq!(sidecar.get("path").unwrap(), "/notices/search.json");
        assert_eq!(sidecar.get("term").unwrap(), "test");
    }

    #[test]
    fn test_last_writer_wins() {
        let temp_dir = TempDir::new().unwrap();
        let cache = CacheStore::open(temp_dir.path()).unwrap();
        let params = QueryParams::new();
        let fp = RequestFingerprint::compute("/topics.json", &params);

        cache.store(&fp, &json!({"v": 1}), "/topics.json", &params).unwrap();
        cache.store(&fp, &json!({"v": 2}), "/topics.json", &params).unwrap();

        assert_eq!(cache.lookup(&fp).unwrap(), CacheResult::Hit(json!({"v": 2})));
    }

    #[test]
    fn test_disabled_cache() {
        let cache = CacheStore::disabled();
        let params = QueryParams::new();
        let fp = RequestFingerprint::compute("/topics.json", &params);

        cache.store(&fp, &json!({"v": 1}), "/topics.json", &params).unwrap();
        assert_eq!(cache.lookup(&fp).unwrap(), CacheResult::Miss);
        assert!(!cache.stats().enabled);
    }

    #[test]
    fn test_corrupt_entry_is_surfaced() {
        let temp_dir = TempDir::new().unwrap();
        let cache = CacheStore::open(temp_dir.path()).unwrap();
        let fp = RequestFingerprint::compute("/topics.json", &QueryParams::new());
        fs::write(temp_dir.path().join(format!("{}.json", fp)), "{not json").unwrap();

        let err = cache.lookup(&fp).unwrap_err();
        assert!(matches!(err, ClientError::CacheIo { .. }));
    }

    #[test]
    fn test_stats_and_clear() {
        let temp_dir = TempDir::new().unwrap();
        let cache = CacheStore::open(temp_dir.path()).unwrap();
        let params = QueryParams::new();

        for path in ["/topics.json", "/notices/1.json"] {
            let fp = RequestFingerprint::compute(path, &params);
            cache.store(&fp, &json!({"path": path}), path, &params).unwrap();
        }

        let stats = cache.stats();
        assert!(stats.enabled);
        assert_eq!(stats.entry_count, 2);

        cache.clear().unwrap();
        assert_eq!(cache.stats().entry_count, 0);
        assert!(temp_dir.path().exists());
    }
}

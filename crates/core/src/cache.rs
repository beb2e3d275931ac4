//! TTL cache for expensive lookups
//!
//! Used to remember distance matrix responses between calculations for the
//! same origin, destination and route options. Entries live in memory and,
//! when a cache directory is configured, on disk as a `.meta`/`.data` pair
//! keyed by the SHA-256 of the logical key.
//!
//! # Example
//!
//! ```rust,ignore
//! use gosend_core::cache::{Cache, CacheConfig};
//!
//! let cache = Cache::new(CacheConfig::default())?;
//! cache.set("distance:origin|destination", &route, None)?;
//!
//! if let Some(route) = cache.get::<Route>("distance:origin|destination")? {
//!     println!("Cached: {route:?}");
//! }
//! ```

use crate::error::{Error, ErrorCode, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// One hour, the lifetime of a cached distance lookup
pub const DEFAULT_TTL_SECS: u64 = 3600;

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Disk cache directory (`None` keeps everything in memory)
    pub cache_dir: Option<PathBuf>,
    /// Default TTL in seconds (0 = no expiry)
    pub default_ttl_secs: u64,
    /// Prefix applied to every key, so several tools can share a directory
    pub namespace: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join("gosend");

        Self {
            cache_dir: Some(cache_dir),
            default_ttl_secs: DEFAULT_TTL_SECS,
            namespace: "gosend".to_string(),
        }
    }
}

impl CacheConfig {
    /// In-memory only configuration
    #[must_use]
    pub fn memory_only() -> Self {
        Self {
            cache_dir: None,
            ..Self::default()
        }
    }

    /// Builder-style method to set the directory
    #[must_use]
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Builder-style method to set the default TTL
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl_secs = ttl.as_secs();
        self
    }
}

/// Cache entry metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    created_at: u64,
    /// 0 = never
    expires_at: u64,
    size_bytes: u64,
    /// Integrity hash of the data file
    hash: String,
}

impl CacheEntry {
    fn is_expired(&self, now: u64) -> bool {
        self.expires_at != 0 && now > self.expires_at
    }
}

/// TTL cache with an in-memory layer and an optional disk layer
pub struct Cache {
    config: CacheConfig,
    memory: RwLock<HashMap<String, (CacheEntry, Vec<u8>)>>,
}

impl Cache {
    /// Create a new cache instance, creating the directory if needed
    pub fn new(config: CacheConfig) -> Result<Self> {
        if let Some(dir) = &config.cache_dir {
            fs::create_dir_all(dir)?;
        }

        Ok(Self {
            config,
            memory: RwLock::new(HashMap::new()),
        })
    }

    /// Create with default configuration
    pub fn default_cache() -> Result<Self> {
        Self::new(CacheConfig::default())
    }

    /// Get a cached value, `None` when missing, expired or corrupted
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let cache_key = self.hash_key(key);
        let now = now_secs();

        {
            let guard = self.memory.read().map_err(|_| poisoned())?;
            if let Some((entry, data)) = guard.get(&cache_key) {
                if !entry.is_expired(now) {
                    return Ok(Some(serde_json::from_slice(data)?));
                }
            }
        }

        let Some((entry_path, data_path)) = self.paths(&cache_key) else {
            return Ok(None);
        };

        if !entry_path.exists() || !data_path.exists() {
            return Ok(None);
        }

        let entry: CacheEntry = serde_json::from_str(&fs::read_to_string(&entry_path)?)?;

        if entry.is_expired(now) {
            let _ = fs::remove_file(&entry_path);
            let _ = fs::remove_file(&data_path);
            return Ok(None);
        }

        let data = fs::read(&data_path)?;

        if hash_bytes(&data) != entry.hash {
            let _ = fs::remove_file(&entry_path);
            let _ = fs::remove_file(&data_path);
            return Ok(None);
        }

        let value: T = serde_json::from_slice(&data)?;

        if let Ok(mut guard) = self.memory.write() {
            guard.insert(cache_key, (entry, data));
        }

        Ok(Some(value))
    }

    /// Set a cached value; `ttl = None` uses the configured default
    pub fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) -> Result<()> {
        let cache_key = self.hash_key(key);
        let data = serde_json::to_vec(value)?;
        let now = now_secs();

        let ttl_secs = ttl.map_or(self.config.default_ttl_secs, |d| d.as_secs());

        let entry = CacheEntry {
            created_at: now,
            expires_at: if ttl_secs > 0 { now + ttl_secs } else { 0 },
            size_bytes: data.len() as u64,
            hash: hash_bytes(&data),
        };

        if let Some((entry_path, data_path)) = self.paths(&cache_key) {
            fs::write(&entry_path, serde_json::to_string(&entry)?)?;
            fs::write(&data_path, &data)?;
        }

        let mut guard = self.memory.write().map_err(|_| poisoned())?;
        guard.insert(cache_key, (entry, data));

        Ok(())
    }

    /// Clear all cached values
    pub fn clear(&self) -> Result<()> {
        self.memory.write().map_err(|_| poisoned())?.clear();

        if let Some(dir) = self.config.cache_dir.as_ref().filter(|d| d.exists()) {
            for entry in fs::read_dir(dir)? {
                let path = entry?.path();
                if is_cache_file(&path) {
                    let _ = fs::remove_file(path);
                }
            }
        }

        Ok(())
    }

    /// Drop expired entries, returning how many were removed
    pub fn cleanup(&self) -> Result<usize> {
        let now = now_secs();
        let mut removed = 0;

        {
            let mut guard = self.memory.write().map_err(|_| poisoned())?;
            let before = guard.len();
            guard.retain(|_, (entry, _)| !entry.is_expired(now));
            removed += before - guard.len();
        }

        if let Some(dir) = self.config.cache_dir.as_ref().filter(|d| d.exists()) {
            for entry in fs::read_dir(dir)? {
                let path = entry?.path();
                if path.extension().is_some_and(|e| e == "meta") {
                    let expired = fs::read_to_string(&path)
                        .ok()
                        .and_then(|content| serde_json::from_str::<CacheEntry>(&content).ok())
                        .is_some_and(|e| e.is_expired(now));
                    if expired {
                        let _ = fs::remove_file(path.with_extension("data"));
                        let _ = fs::remove_file(&path);
                        removed += 1;
                    }
                }
            }
        }

        Ok(removed)
    }

    /// Get cache statistics
    pub fn stats(&self) -> Result<CacheStats> {
        let now = now_secs();
        let guard = self.memory.read().map_err(|_| poisoned())?;

        let mut stats = CacheStats {
            memory_entries: guard.len(),
            cache_dir: self.config.cache_dir.clone(),
            ..CacheStats::default()
        };

        for (entry, _) in guard.values() {
            stats.total_size_bytes += entry.size_bytes;
            if entry.is_expired(now) {
                stats.expired_entries += 1;
            }
        }

        Ok(stats)
    }

    fn hash_key(&self, key: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.config.namespace.as_bytes());
        hasher.update(b":");
        hasher.update(key.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn paths(&self, cache_key: &str) -> Option<(PathBuf, PathBuf)> {
        self.config.cache_dir.as_ref().map(|dir| {
            (
                dir.join(format!("{cache_key}.meta")),
                dir.join(format!("{cache_key}.data")),
            )
        })
    }
}

/// Cache statistics (in-memory layer)
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Number of entries in memory
    pub memory_entries: usize,
    /// Number of expired entries still held in memory
    pub expired_entries: usize,
    /// Total size of cached data in bytes
    pub total_size_bytes: u64,
    /// Path to the cache directory, if any
    pub cache_dir: Option<PathBuf>,
}

fn hash_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn is_cache_file(path: &std::path::Path) -> bool {
    path.extension().is_some_and(|e| e == "meta" || e == "data")
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

fn poisoned() -> Error {
    Error::new(ErrorCode::CacheLockPoisoned, "Cache lock poisoned")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn disk_cache() -> (Cache, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = CacheConfig::memory_only().with_dir(temp_dir.path());
        let cache = Cache::new(config).unwrap();
        (cache, temp_dir)
    }

    #[test]
    fn test_set_and_get() {
        let (cache, _temp) = disk_cache();

        cache.set("route", &"12.5 km".to_string(), None).unwrap();
        let value: Option<String> = cache.get("route").unwrap();

        assert_eq!(value, Some("12.5 km".to_string()));
    }

    #[test]
    fn test_get_missing() {
        let cache = Cache::new(CacheConfig::memory_only()).unwrap();
        let value: Option<String> = cache.get("nonexistent").unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_disk_layer_survives_new_instance() {
        let temp_dir = TempDir::new().unwrap();
        let config = CacheConfig::memory_only().with_dir(temp_dir.path());

        Cache::new(config.clone()).unwrap().set("km", &7.3_f64, None).unwrap();

        let reopened = Cache::new(config).unwrap();
        assert_eq!(reopened.get::<f64>("km").unwrap(), Some(7.3));
    }

    #[test]
    fn test_namespace_separates_keys() {
        let temp_dir = TempDir::new().unwrap();
        let a = Cache::new(CacheConfig {
            namespace: "a".into(),
            ..CacheConfig::memory_only().with_dir(temp_dir.path())
        })
        .unwrap();
        let b = Cache::new(CacheConfig {
            namespace: "b".into(),
            ..CacheConfig::memory_only().with_dir(temp_dir.path())
        })
        .unwrap();

        a.set("key", &1_u32, None).unwrap();
        assert!(b.get::<u32>("key").unwrap().is_none());
    }

    #[test]
    fn test_expiry() {
        let temp_dir = TempDir::new().unwrap();
        let config = CacheConfig::memory_only()
            .with_dir(temp_dir.path())
            .with_ttl(Duration::from_secs(1));
        let cache = Cache::new(config).unwrap();

        cache.set("expires", &"value".to_string(), None).unwrap();
        assert!(cache.get::<String>("expires").unwrap().is_some());

        std::thread::sleep(Duration::from_secs(2));
        assert!(cache.get::<String>("expires").unwrap().is_none());
        assert_eq!(cache.cleanup().unwrap(), 1);
    }

    #[test]
    fn test_stats() {
        let cache = Cache::new(CacheConfig::memory_only()).unwrap();

        cache.set("key1", &"value1".to_string(), None).unwrap();
        cache.set("key2", &"value2".to_string(), None).unwrap();

        let stats = cache.stats().unwrap();
        assert_eq!(stats.memory_entries, 2);
        assert_eq!(stats.expired_entries, 0);
        assert!(stats.cache_dir.is_none());
    }
}

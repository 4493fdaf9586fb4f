//! Content-addressed, persistent chunk cache.
//!
//! Backs the client's resumable chunked downloads and parsed-byte reuse
//! with an embedded key-value store (`sled`) rather than an in-memory-only
//! LRU, so a process restart does not lose in-flight downloads. Entries are
//! one of three concrete kinds — [`Blob`], [`Chunk`], [`Kv`] — routed by
//! type rather than a single polymorphic record.

use chrono::{DateTime, Utc};
use hydro_common::HydroError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

const SCHEMA_VERSION: u32 = 1;
const SCHEMA_KEY: &[u8] = b"__schema_version__";

/// What role a cache entry plays, per the spec's "Blob / Chunk / Kv" split.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum EntryKind {
    /// A fully assembled, independently addressable byte blob.
    Blob,
    /// One fragment of a chunked download, addressed by its parent blob's
    /// key and its ascending index.
    Chunk { base_key: String, index: u32, byte_range: (u64, u64) },
    /// A small opaque user key/value pair (not used for raw file bytes).
    Kv,
}

/// Metadata stored alongside (but separately from) an entry's bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMeta {
    pub cache_key: String,
    pub url: String,
    pub source_id: String,
    pub dataset_id: String,
    pub format_kind: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub kind: EntryKind,
}

/// Tunable eviction/retention knobs, mapped from the `MAX_TOTAL_CACHE_BYTES`
/// / `MAX_ENTRY_BYTES` / `MAX_AGE_SECONDS` environment knobs.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub max_total_bytes: u64,
    pub max_entry_bytes: u64,
    pub max_age_seconds: i64,
    pub max_chunks_per_resource: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_total_bytes: 2 * 1024 * 1024 * 1024,
            max_entry_bytes: 512 * 1024 * 1024,
            max_age_seconds: 24 * 3600,
            max_chunks_per_resource: 1000,
        }
    }
}

#[derive(Debug, Default)]
pub struct CacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub evictions: AtomicU64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed) as f64;
        let misses = self.misses.load(Ordering::Relaxed) as f64;
        if hits + misses == 0.0 {
            0.0
        } else {
            hits / (hits + misses)
        }
    }
}

/// The persistent content-addressed cache.
pub struct ChunkCache {
    meta: sled::Tree,
    data: sled::Tree,
    config: CacheConfig,
    stats: CacheStats,
    // sled operations are internally synchronized; this guards the
    // read-modify-write eviction sequence so concurrent put()s don't race
    // past the total-size budget.
    eviction_lock: Mutex<()>,
}

impl ChunkCache {
    /// Open (or create) a cache store at `path`. A schema version mismatch
    /// wipes the store rather than attempting a migration.
    pub fn open(path: impl AsRef<Path>, config: CacheConfig) -> Result<Self, HydroError> {
        let db = sled::open(path).map_err(|e| HydroError::CacheCorrupt {
            key: "__open__".into(),
            message: e.to_string(),
        })?;

        let needs_reset = match db.get(SCHEMA_KEY) {
            Ok(Some(v)) => v.as_ref() != SCHEMA_VERSION.to_le_bytes(),
            _ => true,
        };
        if needs_reset {
            db.drop_tree("meta").ok();
            db.drop_tree("data").ok();
            db.insert(SCHEMA_KEY, &SCHEMA_VERSION.to_le_bytes()).ok();
        }

        let meta = db.open_tree("meta").map_err(|e| HydroError::CacheCorrupt {
            key: "meta".into(),
            message: e.to_string(),
        })?;
        let data = db.open_tree("data").map_err(|e| HydroError::CacheCorrupt {
            key: "data".into(),
            message: e.to_string(),
        })?;

        Ok(Self {
            meta,
            data,
            config,
            stats: CacheStats::default(),
            eviction_lock: Mutex::new(()),
        })
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    fn total_bytes(&self) -> u64 {
        self.meta
            .iter()
            .values()
            .filter_map(Result::ok)
            .filter_map(|v| serde_json::from_slice::<CacheMeta>(&v).ok())
            .map(|m| m.size_bytes)
            .sum()
    }

    /// Store an entry, evicting by oldest `last_accessed_at` until the
    /// budget is satisfied if needed.
    pub fn put(&self, meta: CacheMeta, bytes: Vec<u8>) -> Result<(), HydroError> {
        if bytes.len() as u64 > self.config.max_entry_bytes {
            return Err(HydroError::CacheFull {
                key: meta.cache_key,
                size: bytes.len() as u64,
            });
        }

        let _guard = self.eviction_lock.lock().unwrap();
        self.evict_to_fit(bytes.len() as u64)?;

        let meta_bytes = serde_json::to_vec(&meta)?;
        self.meta
            .insert(meta.cache_key.as_bytes(), meta_bytes)
            .map_err(cache_io_err(&meta.cache_key))?;
        self.data
            .insert(meta.cache_key.as_bytes(), bytes)
            .map_err(cache_io_err(&meta.cache_key))?;
        Ok(())
    }

    fn evict_to_fit(&self, incoming: u64) -> Result<(), HydroError> {
        let mut current = self.total_bytes();
        if current + incoming <= self.config.max_total_bytes {
            return Ok(());
        }

        let mut entries: Vec<CacheMeta> = self
            .meta
            .iter()
            .values()
            .filter_map(Result::ok)
            .filter_map(|v| serde_json::from_slice::<CacheMeta>(&v).ok())
            .collect();
        entries.sort_by_key(|m| m.last_accessed_at);

        for entry in entries {
            if current + incoming <= self.config.max_total_bytes {
                break;
            }
            self.meta.remove(entry.cache_key.as_bytes()).ok();
            self.data.remove(entry.cache_key.as_bytes()).ok();
            current = current.saturating_sub(entry.size_bytes);
            self.stats.evictions.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    /// Fetch an entry's bytes, touching `last_accessed_at`. Returns `None`
    /// if missing or older than `max_age_seconds`.
    pub fn get(&self, cache_key: &str) -> Result<Option<Vec<u8>>, HydroError> {
        let Some(meta_bytes) = self.meta.get(cache_key.as_bytes()).map_err(cache_io_err(cache_key))? else {
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        };
        let mut meta: CacheMeta = serde_json::from_slice(&meta_bytes)?;

        let age = Utc::now().signed_duration_since(meta.created_at).num_seconds();
        if age > self.config.max_age_seconds {
            self.meta.remove(cache_key.as_bytes()).ok();
            self.data.remove(cache_key.as_bytes()).ok();
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        }

        let Some(bytes) = self.data.get(cache_key.as_bytes()).map_err(cache_io_err(cache_key))? else {
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        };

        meta.last_accessed_at = Utc::now();
        if let Ok(updated) = serde_json::to_vec(&meta) {
            self.meta.insert(cache_key.as_bytes(), updated).ok();
        }
        self.stats.hits.fetch_add(1, Ordering::Relaxed);
        Ok(Some(bytes.to_vec()))
    }

    /// Indices of chunks already present for `base_key`, ascending.
    pub fn present_chunk_indices(&self, base_key: &str) -> Vec<u32> {
        let prefix = format!("{base_key}/chunk-");
        let mut indices: Vec<u32> = self
            .meta
            .scan_prefix(prefix.as_bytes())
            .values()
            .filter_map(Result::ok)
            .filter_map(|v| serde_json::from_slice::<CacheMeta>(&v).ok())
            .filter_map(|m| match m.kind {
                EntryKind::Chunk { index, .. } => Some(index),
                _ => None,
            })
            .collect();
        indices.sort_unstable();
        indices
    }

    /// Concatenate all chunks for `base_key` in ascending index order. Only
    /// succeeds if indices `0..count` are contiguous (no gaps).
    pub fn assemble(&self, base_key: &str, expected_count: u32) -> Result<Option<Vec<u8>>, HydroError> {
        let indices = self.present_chunk_indices(base_key);
        if indices.len() as u32 != expected_count || indices != (0..expected_count).collect::<Vec<_>>() {
            return Ok(None);
        }

        let mut out = Vec::new();
        for i in 0..expected_count {
            let key = format!("{base_key}/chunk-{i}");
            match self.get(&key)? {
                Some(bytes) => out.extend_from_slice(&bytes),
                None => return Ok(None),
            }
        }
        Ok(Some(out))
    }

    /// Store a small opaque key/value pair (not subject to chunk assembly).
    pub fn put_kv(&self, key: &str, value: Vec<u8>) -> Result<(), HydroError> {
        let meta = CacheMeta {
            cache_key: key.to_string(),
            url: String::new(),
            source_id: String::new(),
            dataset_id: String::new(),
            format_kind: "kv".into(),
            size_bytes: value.len() as u64,
            created_at: Utc::now(),
            last_accessed_at: Utc::now(),
            kind: EntryKind::Kv,
        };
        self.put(meta, value)
    }
}

fn cache_io_err(key: &str) -> impl Fn(sled::Error) -> HydroError + '_ {
    move |e| HydroError::CacheCorrupt {
        key: key.to_string(),
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cache() -> (ChunkCache, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let cache = ChunkCache::open(dir.path(), CacheConfig::default()).unwrap();
        (cache, dir)
    }

    fn blob_meta(key: &str, size: u64) -> CacheMeta {
        CacheMeta {
            cache_key: key.to_string(),
            url: "https://example.com".into(),
            source_id: "mrms".into(),
            dataset_id: "mrms-radar".into(),
            format_kind: "grib2".into(),
            size_bytes: size,
            created_at: Utc::now(),
            last_accessed_at: Utc::now(),
            kind: EntryKind::Blob,
        }
    }

    #[test]
    fn put_then_get_round_trips() {
        let (cache, _dir) = test_cache();
        let bytes = vec![1, 2, 3, 4];
        cache.put(blob_meta("k1", bytes.len() as u64), bytes.clone()).unwrap();
        assert_eq!(cache.get("k1").unwrap(), Some(bytes));
        assert_eq!(cache.stats().hits.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn missing_key_counts_as_miss() {
        let (cache, _dir) = test_cache();
        assert_eq!(cache.get("nope").unwrap(), None);
        assert_eq!(cache.stats().misses.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn entry_over_max_size_is_rejected() {
        let (cache, _dir) = test_cache();
        let big = vec![0u8; (cache.config.max_entry_bytes + 1) as usize];
        let err = cache.put(blob_meta("big", big.len() as u64), big).unwrap_err();
        assert_eq!(err.tag(), "cache_full");
    }

    #[test]
    fn chunk_assembly_requires_contiguous_indices() {
        let (cache, _dir) = test_cache();
        let base = "base123";
        for i in [0u32, 1, 2] {
            let key = format!("{base}/chunk-{i}");
            let meta = CacheMeta {
                kind: EntryKind::Chunk {
                    base_key: base.to_string(),
                    index: i,
                    byte_range: (i as u64 * 4, i as u64 * 4 + 3),
                },
                ..blob_meta(&key, 4)
            };
            cache.put(meta, vec![i as u8; 4]).unwrap();
        }
        let assembled = cache.assemble(base, 3).unwrap().unwrap();
        assert_eq!(assembled, vec![0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2]);
    }

    #[test]
    fn eviction_removes_oldest_first_when_over_budget() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ChunkCache::open(
            dir.path(),
            CacheConfig {
                max_total_bytes: 10,
                max_entry_bytes: 10,
                ..CacheConfig::default()
            },
        )
        .unwrap();

        cache.put(blob_meta("old", 5), vec![0u8; 5]).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        cache.put(blob_meta("new", 5), vec![1u8; 5]).unwrap();
        // Exceeding budget evicts "old" before inserting a third entry.
        cache.put(blob_meta("newer", 5), vec![2u8; 5]).unwrap();

        assert!(cache.get("old").unwrap().is_none());
        assert!(cache.stats().evictions.load(Ordering::Relaxed) >= 1);
    }
}

//! Two-tier content cache: file metadata and content-addressed artifacts
//!
//! Tier one maps absolute paths to (mtime, size, hash) so unchanged files
//! are never re-read. Tier two maps content hashes to parsed results so
//! identical content anywhere in the tree shares one entry. The cache is
//! always an optimization, never a correctness dependency: any load or
//! hash failure degrades to recomputation.

use crate::model::{DiagramKind, ParseIssue, Relationship};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// Cache directory: .trellis/
pub const CACHE_DIR: &str = ".trellis";

/// File-metadata tier file
pub const FILE_META_CACHE: &str = "file_meta.json";

/// Artifact tier file
pub const ARTIFACT_CACHE: &str = "artifacts.json";

/// Bumped whenever the artifact schema changes; older entries are misses.
pub const FORMAT_VERSION: u32 = 1;

/// Default artifact retention.
pub const DEFAULT_MAX_AGE_DAYS: i64 = 30;

/// Metadata for one observed file. Valid only while the file's mtime and
/// size are unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetaEntry {
    pub mtime_ms: i64,
    pub size: u64,
    pub content_hash: String,
}

/// A cached parse result, keyed by content hash. Never mutated in place;
/// replaced wholesale on re-parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactEntry {
    pub kind: DiagramKind,
    pub validation_errors: Vec<ParseIssue>,
    pub timestamp: DateTime<Utc>,
    pub format_version: u32,
    pub nodes: Vec<String>,
    pub defined_nodes: Vec<String>,
    pub relationships: Vec<Relationship>,
    pub aux_mappings: BTreeMap<String, String>,
}

pub struct ContentCache {
    root: PathBuf,
    file_meta: DashMap<PathBuf, FileMetaEntry>,
    artifacts: DashMap<String, ArtifactEntry>,
    dirty: AtomicBool,
}

impl ContentCache {
    /// Load both tiers from `<root>/.trellis/`. A corrupt or unreadable
    /// cache file is treated as an empty tier (warn, continue).
    pub fn load(root: &Path) -> Self {
        let cache = ContentCache {
            root: root.to_path_buf(),
            file_meta: DashMap::new(),
            artifacts: DashMap::new(),
            dirty: AtomicBool::new(false),
        };
        let meta_path = cache.tier_path(FILE_META_CACHE);
        if let Some(map) = read_tier::<BTreeMap<PathBuf, FileMetaEntry>>(&meta_path) {
            for (path, entry) in map {
                cache.file_meta.insert(path, entry);
            }
        }
        let artifact_path = cache.tier_path(ARTIFACT_CACHE);
        if let Some(map) = read_tier::<BTreeMap<String, ArtifactEntry>>(&artifact_path) {
            for (hash, entry) in map {
                cache.artifacts.insert(hash, entry);
            }
        }
        tracing::debug!(
            "Cache loaded: {} file entries, {} artifacts",
            cache.file_meta.len(),
            cache.artifacts.len()
        );
        cache
    }

    fn tier_path(&self, file: &str) -> PathBuf {
        self.root.join(CACHE_DIR).join(file)
    }

    /// Hash a file's content, short-circuiting through the metadata tier.
    /// If the stored (mtime, size) still match the filesystem, the stored
    /// hash is returned without reading the file. On any filesystem error
    /// the caller's in-memory content is hashed instead — degraded but
    /// correct.
    pub fn file_hash(&self, path: &Path, fallback_content: &str) -> String {
        match std::fs::metadata(path) {
            Ok(meta) => {
                let mtime_ms = mtime_millis(&meta);
                let size = meta.len();
                if let Some(entry) = self.file_meta.get(path) {
                    if entry.mtime_ms == mtime_ms && entry.size == size {
                        return entry.content_hash.clone();
                    }
                }
                let content = match std::fs::read(path) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        tracing::warn!("Cannot read {} for hashing: {}", path.display(), e);
                        return hash_bytes(fallback_content.as_bytes());
                    }
                };
                let hash = hash_bytes(&content);
                self.file_meta.insert(
                    path.to_path_buf(),
                    FileMetaEntry {
                        mtime_ms,
                        size,
                        content_hash: hash.clone(),
                    },
                );
                self.dirty.store(true, Ordering::Relaxed);
                hash
            }
            Err(e) => {
                tracing::warn!("Cannot stat {}: {}", path.display(), e);
                hash_bytes(fallback_content.as_bytes())
            }
        }
    }

    /// Look up an artifact by content hash. Entries written under an older
    /// schema version are treated as absent.
    pub fn artifact(&self, hash: &str) -> Option<ArtifactEntry> {
        let entry = self.artifacts.get(hash)?;
        if entry.format_version != FORMAT_VERSION {
            return None;
        }
        Some(entry.clone())
    }

    /// Store an artifact. No eviction on write.
    pub fn store_artifact(&self, hash: &str, entry: ArtifactEntry) {
        self.artifacts.insert(hash.to_string(), entry);
        self.dirty.store(true, Ordering::Relaxed);
    }

    /// Persist both tiers, compactly, if anything changed since the last
    /// flush. Safe to call multiple times and at process exit.
    pub fn flush(&self) -> std::io::Result<()> {
        if !self.dirty.swap(false, Ordering::Relaxed) {
            return Ok(());
        }
        let dir = self.root.join(CACHE_DIR);
        std::fs::create_dir_all(&dir)?;

        let meta: BTreeMap<_, _> = self
            .file_meta
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        write_compact(&self.tier_path(FILE_META_CACHE), &meta)?;

        let artifacts: BTreeMap<_, _> = self
            .artifacts
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        write_compact(&self.tier_path(ARTIFACT_CACHE), &artifacts)?;

        tracing::debug!(
            "Cache flushed: {} file entries, {} artifacts",
            meta.len(),
            artifacts.len()
        );
        Ok(())
    }

    /// Drop metadata for files that no longer exist and artifacts older
    /// than `max_age`. Marks the cache dirty only if anything changed.
    pub fn prune(&self, max_age: Duration) {
        let mut changed = false;

        let vanished: Vec<PathBuf> = self
            .file_meta
            .iter()
            .filter(|e| !e.key().exists())
            .map(|e| e.key().clone())
            .collect();
        for path in vanished {
            self.file_meta.remove(&path);
            changed = true;
        }

        let cutoff = Utc::now() - max_age;
        let stale: Vec<String> = self
            .artifacts
            .iter()
            .filter(|e| e.value().timestamp < cutoff)
            .map(|e| e.key().clone())
            .collect();
        for hash in stale {
            self.artifacts.remove(&hash);
            changed = true;
        }

        if changed {
            self.dirty.store(true, Ordering::Relaxed);
        }
    }

    /// Reset both tiers and flush immediately.
    pub fn clear(&self) -> std::io::Result<()> {
        self.file_meta.clear();
        self.artifacts.clear();
        self.dirty.store(true, Ordering::Relaxed);
        self.flush()
    }

    pub fn file_entry_count(&self) -> usize {
        self.file_meta.len()
    }

    pub fn artifact_count(&self) -> usize {
        self.artifacts.len()
    }
}

/// SHA-256 of a byte slice, lowercase hex.
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn mtime_millis(meta: &std::fs::Metadata) -> i64 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

fn read_tier<T: for<'de> Deserialize<'de>>(path: &Path) -> Option<T> {
    if !path.exists() {
        return None;
    }
    let text = match std::fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) => {
            tracing::warn!("Unreadable cache file {}: {}", path.display(), e);
            return None;
        }
    };
    match serde_json::from_str(&text) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!("Corrupt cache file {}: {}", path.display(), e);
            None
        }
    }
}

fn write_compact<T: Serialize>(path: &Path, value: &T) -> std::io::Result<()> {
    // No pretty-printing: these files grow with the tree.
    let json = serde_json::to_string(value)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    std::fs::write(path, json)
}

//! Persistent resolution cache.
//!
//! Maps the title a paper was resolved from (`title_from_file`) to its
//! resolved [`PaperRecord`]. The whole collection is stored as one
//! pretty-printed JSON array and rewritten after every insert, so an
//! interrupted run loses at most the paper that was in flight.
//!
//! Keys are compared case-insensitively. Lookups are linear scans; the
//! collection is expected to hold tens to low hundreds of papers.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::PaperRecord;

/// Default cache file name, relative to the working directory.
pub const DEFAULT_CACHE_FILE: &str = "paperlist-cache.json";

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("failed to read cache {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write cache {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to serialize cache: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("a record for {0:?} is already cached")]
    Duplicate(String),
    #[error("record for {0:?} is missing its resolved title or key")]
    Incomplete(String),
}

fn key(title: &str) -> String {
    title.to_lowercase()
}

/// Ordered collection of resolved papers backed by a JSON file.
#[derive(Debug)]
pub struct ResolutionCache {
    records: Vec<PaperRecord>,
    /// `None` for an in-memory cache that never touches disk.
    path: Option<PathBuf>,
}

impl ResolutionCache {
    /// A cache that is never loaded from or written to disk.
    pub fn in_memory() -> Self {
        Self {
            records: Vec::new(),
            path: None,
        }
    }

    /// Open the cache stored at `path`.
    ///
    /// With `refresh` set, any existing file is ignored (and overwritten on
    /// the first insert). A missing file yields an empty cache. A file that
    /// is not valid UTF-8 JSON is moved aside to `<path>.corrupt` and the cache
    /// starts empty; other read failures are returned.
    pub fn open(path: &Path, refresh: bool) -> Result<Self, CacheError> {
        let mut cache = Self {
            records: Vec::new(),
            path: Some(path.to_path_buf()),
        };
        if refresh {
            tracing::info!(path = %path.display(), "refresh requested, ignoring existing cache");
            return Ok(cache);
        }

        let content = match std::fs::read(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no cache file, starting empty");
                return Ok(cache);
            }
            Err(source) => {
                return Err(CacheError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let loaded: Vec<PaperRecord> = match serde_json::from_slice(&content) {
            Ok(records) => records,
            Err(e) => {
                let backup = corrupt_path(path);
                tracing::warn!(
                    path = %path.display(),
                    backup = %backup.display(),
                    error = %e,
                    "cache file is unreadable, starting empty"
                );
                if let Err(e) = std::fs::rename(path, &backup) {
                    tracing::warn!(error = %e, "failed to move corrupt cache aside");
                }
                return Ok(cache);
            }
        };

        for record in loaded {
            if !record.is_complete() {
                tracing::warn!(key = %record.title_from_file, "dropping incomplete cached record");
                continue;
            }
            if cache.find(&record.title_from_file).is_some() {
                tracing::warn!(key = %record.title_from_file, "dropping duplicate cached record");
                continue;
            }
            cache.records.push(record);
        }
        tracing::info!(path = %path.display(), records = cache.records.len(), "opened cache");
        Ok(cache)
    }

    /// Case-insensitive exact match on `title_from_file`. Empty titles never match.
    pub fn find(&self, title_from_file: &str) -> Option<&PaperRecord> {
        if title_from_file.is_empty() {
            return None;
        }
        let wanted = key(title_from_file);
        self.records
            .iter()
            .find(|r| key(&r.title_from_file) == wanted)
    }

    /// First record matching any of `candidates`, checked in record order.
    pub fn find_any(&self, candidates: &[&str]) -> Option<&PaperRecord> {
        let wanted: Vec<String> = candidates
            .iter()
            .filter(|c| !c.is_empty())
            .map(|c| key(c))
            .collect();
        if wanted.is_empty() {
            return None;
        }
        self.records
            .iter()
            .find(|r| wanted.contains(&key(&r.title_from_file)))
    }

    /// Append a record. The key must not already be present.
    pub fn insert(&mut self, record: PaperRecord) -> Result<(), CacheError> {
        if !record.is_complete() {
            return Err(CacheError::Incomplete(record.title_from_file));
        }
        if self.find(&record.title_from_file).is_some() {
            return Err(CacheError::Duplicate(record.title_from_file));
        }
        self.records.push(record);
        Ok(())
    }

    /// Write the full collection to disk, replacing the previous file atomically.
    pub fn persist(&self) -> Result<(), CacheError> {
        let Some(ref path) = self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| CacheError::Write {
                path: path.clone(),
                source,
            })?;
        }

        let content = serde_json::to_string_pretty(&self.records)?;
        let tmp = tmp_path(path);
        std::fs::write(&tmp, content).map_err(|source| CacheError::Write {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, path).map_err(|source| CacheError::Write {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), records = self.records.len(), "cache persisted");
        Ok(())
    }

    /// Insert then persist; the record is kept in memory even if the write fails.
    pub fn insert_and_persist(&mut self, record: PaperRecord) -> Result<(), CacheError> {
        self.insert(record)?;
        self.persist()
    }

    pub fn records(&self) -> &[PaperRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Backing file, `None` for an in-memory cache.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

fn tmp_path(path: &Path) -> PathBuf {
    with_suffix(path, ".tmp")
}

fn corrupt_path(path: &Path) -> PathBuf {
    with_suffix(path, ".corrupt")
}

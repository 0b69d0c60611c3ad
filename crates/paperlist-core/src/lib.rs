use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod backend;
pub mod cache;
pub mod citation;
pub mod config_file;
pub mod lookup;
pub mod rate_limit;
pub mod resolver;
pub mod scan;
pub mod title;

// Re-export for convenience
pub use backend::{BackendError, PdfMetadataBackend};
pub use cache::{CacheError, DEFAULT_CACHE_FILE, ResolutionCache};
pub use citation::{RenderOptions, render_line};
pub use lookup::{LookupBackend, LookupError, LookupOutcome};
pub use rate_limit::AdaptiveLimiter;
pub use resolver::{BatchOutcome, Resolver};
pub use scan::{ScanError, ScannedDirectory, scan_collection};
pub use title::{ExtractedTitle, extract_title};

/// Bibliographic metadata as returned by the lookup service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperMetadata {
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub venue: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub arxiv_id: Option<String>,
    /// The service's own page for this paper.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub citation_count: Option<u64>,
    #[serde(default)]
    pub paper_id: Option<String>,
}

/// A resolved paper: lookup metadata plus the title it was resolved from.
///
/// `title_from_file` is the cache key (either the PDF's embedded title or its
/// file name without extension). `rendered_line` is derived from the other
/// fields and is never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperRecord {
    pub title_from_file: String,
    #[serde(flatten)]
    pub metadata: PaperMetadata,
    #[serde(skip)]
    pub rendered_line: String,
}

impl PaperRecord {
    pub fn new(title_from_file: impl Into<String>, metadata: PaperMetadata) -> Self {
        Self {
            title_from_file: title_from_file.into(),
            metadata,
            rendered_line: String::new(),
        }
    }

    /// Whether this record may be written to the cache.
    pub fn is_complete(&self) -> bool {
        !self.title_from_file.trim().is_empty() && !self.metadata.title.trim().is_empty()
    }

    /// Recompute `rendered_line` from the structured fields.
    pub fn refresh_line(&mut self, options: &RenderOptions) {
        self.rendered_line = render_line(&self.metadata, options);
    }
}

/// Papers found directly inside one directory of the collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryGroup {
    /// Path segments of the directory relative to the collection root.
    pub category: Vec<String>,
    pub papers: Vec<PaperRecord>,
}

/// Why a single paper could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The PDF could not be opened or its metadata read.
    Extraction,
    /// The service had no result for either title.
    NotFound,
    /// The last lookup attempt failed at the transport or service level.
    Lookup,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Extraction => "extraction",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Lookup => "lookup",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}: {message} ({})", .kind.as_str(), .path.display())]
pub struct ResolutionError {
    pub kind: ErrorKind,
    pub path: PathBuf,
    pub message: String,
}

impl ResolutionError {
    pub fn new(kind: ErrorKind, path: &Path, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}

/// Progress events emitted while resolving a collection.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Resolving {
        index: usize,
        total: usize,
        path: PathBuf,
    },
    CacheHit {
        index: usize,
        total: usize,
        title: String,
    },
    Resolved {
        index: usize,
        total: usize,
        title: String,
    },
    Failed {
        index: usize,
        total: usize,
        error: ResolutionError,
    },
}

/// Runtime configuration for the resolver and its lookup client.
#[derive(Clone)]
pub struct Config {
    pub s2_api_key: Option<String>,
    /// Base URL of the Semantic Scholar Graph API.
    pub s2_base_url: String,
    pub cache_path: PathBuf,
    /// Start from an empty cache and re-resolve every paper.
    pub refresh: bool,
    pub timeout_secs: u64,
    /// Overrides the default request spacing when set.
    pub requests_per_second: Option<f64>,
    pub render: RenderOptions,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("s2_api_key", &self.s2_api_key.as_ref().map(|_| "***"))
            .field("s2_base_url", &self.s2_base_url)
            .field("cache_path", &self.cache_path)
            .field("refresh", &self.refresh)
            .field("timeout_secs", &self.timeout_secs)
            .field("requests_per_second", &self.requests_per_second)
            .field("render", &self.render)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            s2_api_key: None,
            s2_base_url: lookup::semantic_scholar::DEFAULT_BASE_URL.to_string(),
            cache_path: PathBuf::from(DEFAULT_CACHE_FILE),
            refresh: false,
            timeout_secs: 10,
            requests_per_second: None,
            render: RenderOptions::default(),
        }
    }
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Request limiter for the lookup service.
    ///
    /// Semantic Scholar allows roughly 100 requests per 5 minutes without a
    /// key and 1 request/s with one.
    pub fn build_limiter(&self) -> AdaptiveLimiter {
        let configured = self
            .requests_per_second
            .filter(|rps| *rps > 0.0)
            .and_then(|rps| Duration::try_from_secs_f64(1.0 / rps).ok());
        match configured {
            Some(period) => AdaptiveLimiter::new(period),
            None if self.s2_api_key.is_some() => AdaptiveLimiter::per_second(1),
            None => AdaptiveLimiter::new(Duration::from_secs(3)),
        }
    }
}

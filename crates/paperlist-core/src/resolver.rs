//! Paper resolution: title extraction, cache check, lookup with
//! disambiguation, and incremental cache persistence.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::backend::PdfMetadataBackend;
use crate::cache::ResolutionCache;
use crate::citation::RenderOptions;
use crate::lookup::{LookupBackend, LookupError, LookupOutcome};
use crate::rate_limit::{AdaptiveLimiter, lookup_with_rate_limit};
use crate::scan::ScannedDirectory;
use crate::title::extract_title;
use crate::{CategoryGroup, Config, ErrorKind, PaperRecord, ProgressEvent, ResolutionError};

/// Where a resolved record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Cache,
    Lookup,
}

/// Result of resolving a whole collection.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Groups in traversal order; directories where nothing resolved are omitted.
    pub groups: Vec<CategoryGroup>,
    pub failures: Vec<ResolutionError>,
    pub from_cache: usize,
    pub from_lookup: usize,
}

impl BatchOutcome {
    pub fn resolved(&self) -> usize {
        self.from_cache + self.from_lookup
    }
}

/// Resolves PDFs to [`PaperRecord`]s, one at a time.
///
/// Owns the [`ResolutionCache`] for its lifetime; every freshly resolved
/// record is persisted before `resolve` returns.
pub struct Resolver {
    pdf: Arc<dyn PdfMetadataBackend>,
    lookup: Arc<dyn LookupBackend>,
    cache: ResolutionCache,
    client: reqwest::Client,
    limiter: Option<AdaptiveLimiter>,
    timeout: Duration,
    render: RenderOptions,
}

impl Resolver {
    /// A resolver with no request spacing and default rendering.
    pub fn new(
        pdf: Arc<dyn PdfMetadataBackend>,
        lookup: Arc<dyn LookupBackend>,
        cache: ResolutionCache,
    ) -> Self {
        Self {
            pdf,
            lookup,
            cache,
            client: reqwest::Client::new(),
            limiter: None,
            timeout: Duration::from_secs(10),
            render: RenderOptions::default(),
        }
    }

    /// A resolver configured from `config`, including its request limiter.
    pub fn from_config(
        config: &Config,
        pdf: Arc<dyn PdfMetadataBackend>,
        lookup: Arc<dyn LookupBackend>,
        cache: ResolutionCache,
    ) -> Self {
        Self::new(pdf, lookup, cache)
            .with_limiter(config.build_limiter())
            .with_timeout(config.timeout())
            .with_render_options(config.render.clone())
    }

    pub fn with_limiter(mut self, limiter: AdaptiveLimiter) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_render_options(mut self, render: RenderOptions) -> Self {
        self.render = render;
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    /// Resolve one PDF to a record with a freshly rendered citation line.
    pub async fn resolve(&mut self, path: &Path) -> Result<PaperRecord, ResolutionError> {
        self.resolve_with_source(path).await.map(|(record, _)| record)
    }

    /// Like [`resolve`](Self::resolve), also reporting whether the cache answered.
    pub async fn resolve_with_source(
        &mut self,
        path: &Path,
    ) -> Result<(PaperRecord, Source), ResolutionError> {
        let titles = extract_title(self.pdf.as_ref(), path)
            .map_err(|e| ResolutionError::new(ErrorKind::Extraction, path, e.to_string()))?;

        if let Some(hit) = self.cache.find_any(&[&titles.embedded, &titles.file]) {
            let mut record = hit.clone();
            record.refresh_line(&self.render);
            tracing::debug!(path = %path.display(), key = %record.title_from_file, "cache hit");
            return Ok((record, Source::Cache));
        }

        let mut record = self.lookup_disambiguated(path, &titles.embedded, &titles.file).await?;

        if let Err(e) = self.cache.insert_and_persist(record.clone()) {
            tracing::warn!(path = %path.display(), error = %e, "failed to persist cache");
        }
        record.refresh_line(&self.render);
        tracing::info!(
            path = %path.display(),
            title = %record.metadata.title,
            key = %record.title_from_file,
            "resolved"
        );
        Ok((record, Source::Lookup))
    }

    /// Trust the embedded title only when the service returns the same title;
    /// otherwise fall back to the file name and accept its top result.
    async fn lookup_disambiguated(
        &self,
        path: &Path,
        embedded: &str,
        file: &str,
    ) -> Result<PaperRecord, ResolutionError> {
        let mut embedded_outcome = None;
        if !embedded.is_empty() {
            match self.lookup_logged(path, embedded).await {
                Ok(LookupOutcome::Found(metadata))
                    if metadata.title.to_lowercase() == embedded.to_lowercase() =>
                {
                    return Ok(PaperRecord::new(embedded, metadata));
                }
                Ok(LookupOutcome::Found(metadata)) => {
                    tracing::debug!(
                        path = %path.display(),
                        embedded,
                        found = %metadata.title,
                        "embedded title mismatch, falling back to file name"
                    );
                    embedded_outcome = Some(Ok(LookupOutcome::Found(metadata)));
                }
                other => embedded_outcome = Some(other),
            }
        }

        if file.is_empty() {
            return Err(ResolutionError::new(
                ErrorKind::NotFound,
                path,
                "no usable title",
            ));
        }

        // Same query text would hit the service twice for the same answer
        let outcome = match embedded_outcome {
            Some(outcome) if embedded.to_lowercase() == file.to_lowercase() => outcome,
            _ => self.lookup_logged(path, file).await,
        };

        match outcome {
            Ok(LookupOutcome::Found(metadata)) => Ok(PaperRecord::new(file, metadata)),
            Ok(LookupOutcome::NotFound) => Err(ResolutionError::new(
                ErrorKind::NotFound,
                path,
                if embedded.is_empty() {
                    format!("no match for file title {:?}", file)
                } else {
                    format!(
                        "no match for embedded title {:?} or file title {:?}",
                        embedded, file
                    )
                },
            )),
            Err(e) => Err(ResolutionError::new(
                ErrorKind::Lookup,
                path,
                format!("lookup of {:?} failed: {}", file, e),
            )),
        }
    }

    /// One lookup; service failures are logged distinctly from "not found".
    async fn lookup_logged(
        &self,
        path: &Path,
        title: &str,
    ) -> Result<LookupOutcome, LookupError> {
        tracing::debug!(backend = self.lookup.name(), title, "looking up");
        let result = lookup_with_rate_limit(
            self.lookup.as_ref(),
            title,
            &self.client,
            self.timeout,
            self.limiter.as_ref(),
        )
        .await;
        match &result {
            Ok(LookupOutcome::NotFound) => {
                tracing::debug!(path = %path.display(), title, "not found");
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    backend = self.lookup.name(),
                    title,
                    error = %e,
                    "lookup service unavailable, treating as not found"
                );
            }
            Ok(LookupOutcome::Found(_)) => {}
        }
        result
    }

    /// Resolve every scanned PDF in traversal order.
    ///
    /// Per-paper failures are logged, reported through `progress`, and
    /// collected; they never stop the batch.
    pub async fn resolve_all(
        &mut self,
        directories: Vec<ScannedDirectory>,
        progress: impl Fn(ProgressEvent),
    ) -> BatchOutcome {
        let total: usize = directories.iter().map(|d| d.pdfs.len()).sum();
        let mut outcome = BatchOutcome::default();
        let mut index = 0;

        for dir in directories {
            let mut papers = Vec::with_capacity(dir.pdfs.len());
            for path in dir.pdfs {
                progress(ProgressEvent::Resolving {
                    index,
                    total,
                    path: path.clone(),
                });
                match self.resolve_with_source(&path).await {
                    Ok((record, source)) => {
                        let title = record.metadata.title.clone();
                        match source {
                            Source::Cache => {
                                outcome.from_cache += 1;
                                progress(ProgressEvent::CacheHit {
                                    index,
                                    total,
                                    title,
                                });
                            }
                            Source::Lookup => {
                                outcome.from_lookup += 1;
                                progress(ProgressEvent::Resolved {
                                    index,
                                    total,
                                    title,
                                });
                            }
                        }
                        papers.push(record);
                    }
                    Err(error) => {
                        tracing::warn!(path = %error.path.display(), kind = error.kind.as_str(), message = %error.message, "paper omitted");
                        progress(ProgressEvent::Failed {
                            index,
                            total,
                            error: error.clone(),
                        });
                        outcome.failures.push(error);
                    }
                }
                index += 1;
            }
            if !papers.is_empty() {
                outcome.groups.push(CategoryGroup {
                    category: dir.category,
                    papers,
                });
            }
        }
        outcome
    }
}

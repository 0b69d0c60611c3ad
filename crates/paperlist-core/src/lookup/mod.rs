//! Bibliographic lookup backends.

pub mod mock;
pub mod semantic_scholar;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;

use crate::PaperMetadata;

pub use semantic_scholar::SemanticScholar;

/// Result of a successful lookup round-trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    /// Top-ranked candidate with full details.
    Found(PaperMetadata),
    /// No candidate, or the top candidate's details could not be fetched.
    NotFound,
}

/// Error type for lookups, distinguishing rate limiting from other failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// Server returned 429 Too Many Requests.
    #[error("rate limited (429){}", retry_after.map(|d| format!(", retry after {:.1}s", d.as_secs_f64())).unwrap_or_default())]
    RateLimited { retry_after: Option<Duration> },
    /// Connection, timeout, or body decoding failure.
    #[error("transport error: {0}")]
    Transport(String),
    /// The service answered with an unexpected status.
    #[error("service error: {0}")]
    Service(String),
}

impl From<reqwest::Error> for LookupError {
    fn from(e: reqwest::Error) -> Self {
        LookupError::Transport(e.to_string())
    }
}

/// A bibliographic service that can find a paper by title.
pub trait LookupBackend: Send + Sync {
    /// The canonical name of this service (e.g., "Semantic Scholar").
    fn name(&self) -> &str;

    /// Search for `title` and return the top-ranked candidate's details.
    fn lookup<'a>(
        &'a self,
        title: &'a str,
        client: &'a reqwest::Client,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<LookupOutcome, LookupError>> + Send + 'a>>;
}

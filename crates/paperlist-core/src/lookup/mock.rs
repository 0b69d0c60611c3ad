//! Mock lookup backend for testing.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{LookupBackend, LookupError, LookupOutcome};
use crate::PaperMetadata;

/// A configurable mock response for [`MockLookup`].
#[derive(Clone, Debug)]
pub enum MockResponse {
    /// Simulate a successful lookup.
    Found(PaperMetadata),
    /// Simulate "no results".
    NotFound,
    /// Simulate a 429 rate-limit response.
    RateLimited { retry_after: Option<Duration> },
    /// Simulate an unreachable service.
    Transport(String),
}

impl MockResponse {
    /// A found paper with only a title, one author and a year.
    pub fn found(title: &str, year: i32) -> Self {
        MockResponse::Found(PaperMetadata {
            title: title.to_string(),
            authors: vec!["A. Author".to_string()],
            venue: "Test Venue".to_string(),
            year: Some(year),
            ..Default::default()
        })
    }
}

/// A hand-rolled mock implementing [`LookupBackend`] for tests.
///
/// Responses are keyed by the queried title (case-insensitive). Titles
/// without a scripted response get the fallback. Every call is recorded.
pub struct MockLookup {
    responses: Mutex<HashMap<String, Vec<MockResponse>>>,
    fallback: MockResponse,
    calls: Mutex<Vec<String>>,
    call_count: AtomicUsize,
}

impl MockLookup {
    /// Create a mock that answers `fallback` for every unscripted title.
    pub fn new(fallback: MockResponse) -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            fallback,
            calls: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
        }
    }

    /// Script the response for one query title (repeated on every call).
    pub fn with(self, title: &str, response: MockResponse) -> Self {
        self.with_sequence(title, vec![response])
    }

    /// Script responses for one query title, returned in order; the last
    /// one repeats once the sequence is exhausted.
    pub fn with_sequence(self, title: &str, mut responses: Vec<MockResponse>) -> Self {
        assert!(
            !responses.is_empty(),
            "sequence must have at least one response"
        );
        // Reverse so we can pop() from the front cheaply.
        responses.reverse();
        if let Ok(mut map) = self.responses.lock() {
            map.insert(title.to_lowercase(), responses);
        }
        self
    }

    /// How many times `lookup()` has been called.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Titles queried so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn next_response(&self, title: &str) -> MockResponse {
        let Ok(mut map) = self.responses.lock() else {
            return self.fallback.clone();
        };
        match map.get_mut(&title.to_lowercase()) {
            Some(seq) if seq.len() > 1 => seq.pop().unwrap_or_else(|| self.fallback.clone()),
            Some(seq) => seq.last().cloned().unwrap_or_else(|| self.fallback.clone()),
            None => self.fallback.clone(),
        }
    }
}

impl LookupBackend for MockLookup {
    fn name(&self) -> &str {
        "Mock"
    }

    fn lookup<'a>(
        &'a self,
        title: &'a str,
        _client: &'a reqwest::Client,
        _timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<LookupOutcome, LookupError>> + Send + 'a>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(title.to_string());
        }
        let response = self.next_response(title);

        Box::pin(async move {
            match response {
                MockResponse::Found(metadata) => Ok(LookupOutcome::Found(metadata)),
                MockResponse::NotFound => Ok(LookupOutcome::NotFound),
                MockResponse::RateLimited { retry_after } => {
                    Err(LookupError::RateLimited { retry_after })
                }
                MockResponse::Transport(msg) => Err(LookupError::Transport(msg)),
            }
        })
    }
}

//! Request spacing for the lookup service with adaptive slowdown on 429.
//!
//! Each lookup waits for its governor permit via `until_ready()`, which
//! spaces requests at the configured rate. On 429, the governor is slowed,
//! the `Retry-After` delay is honored, and the lookup is retried once.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

use crate::lookup::{LookupBackend, LookupError, LookupOutcome};

/// Type alias for governor's direct rate limiter.
type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Slowdown is undone after this long without a 429.
const DECAY_AFTER: Duration = Duration::from_secs(60);

/// Upper bound on the slowdown factor.
const MAX_FACTOR: u32 = 16;

fn quota_for(period: Duration) -> Quota {
    Quota::with_period(period.max(Duration::from_millis(1)))
        .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN))
}

/// Rate limiter with adaptive rate adjustment via ArcSwap.
///
/// When a 429 is received, the governor is atomically swapped to a slower rate.
/// After a cooldown period (60s) with no 429s, the original rate is restored.
pub struct AdaptiveLimiter {
    limiter: ArcSwap<DirectLimiter>,
    /// Base period between allowed requests.
    base_period: Duration,
    /// Current slowdown factor (1 = normal, 2 = half rate, etc.).
    current_factor: AtomicU32,
    /// Timestamp of the last 429 response.
    last_429: std::sync::Mutex<Option<Instant>>,
}

impl AdaptiveLimiter {
    /// Create a new limiter with the given period between requests.
    pub fn new(period: Duration) -> Self {
        let limiter = Arc::new(DirectLimiter::direct(quota_for(period)));
        Self {
            limiter: ArcSwap::from(limiter),
            base_period: period,
            current_factor: AtomicU32::new(1),
            last_429: std::sync::Mutex::new(None),
        }
    }

    /// Create a limiter allowing `n` requests per second.
    pub fn per_second(n: u32) -> Self {
        let ms = 1000 / n.max(1) as u64;
        Self::new(Duration::from_millis(ms))
    }

    pub fn base_period(&self) -> Duration {
        self.base_period
    }

    pub fn factor(&self) -> u32 {
        self.current_factor.load(Ordering::SeqCst)
    }

    /// Wait until the rate limiter allows a request.
    pub async fn acquire(&self) {
        self.try_decay();
        let limiter = self.limiter.load();
        limiter.until_ready().await;
    }

    /// Called when a 429 is received. Doubles the slowdown factor and swaps the governor.
    pub fn on_rate_limited(&self) {
        if let Ok(mut last) = self.last_429.lock() {
            *last = Some(Instant::now());
        }

        let _ = self
            .current_factor
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |f| {
                Some((f * 2).min(MAX_FACTOR))
            });

        let factor = self.current_factor.load(Ordering::SeqCst);
        if let Some(scaled) = self.base_period.checked_mul(factor) {
            self.limiter
                .store(Arc::new(DirectLimiter::direct(quota_for(scaled))));
        }
    }

    /// If 60s have passed since the last 429, restore the original rate.
    fn try_decay(&self) {
        let should_restore = self
            .last_429
            .lock()
            .ok()
            .and_then(|last| last.map(|t| t.elapsed() >= DECAY_AFTER))
            .unwrap_or(false);

        if should_restore && self.current_factor.load(Ordering::SeqCst) > 1 {
            self.current_factor.store(1, Ordering::SeqCst);
            self.limiter
                .store(Arc::new(DirectLimiter::direct(quota_for(self.base_period))));
        }
    }
}

/// Check if an HTTP response is a 429 and extract Retry-After if present.
pub fn check_rate_limit_response(resp: &reqwest::Response) -> Result<(), LookupError> {
    if resp.status().as_u16() == 429 {
        let retry_after = resp
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        Err(LookupError::RateLimited { retry_after })
    } else {
        Ok(())
    }
}

/// Parse a Retry-After header value (seconds or HTTP-date).
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    if let Ok(secs) = value.trim().parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    // HTTP-date: use a conservative fixed delay rather than parsing it
    if value.contains(',') || value.contains("GMT") {
        return Some(Duration::from_secs(5));
    }
    None
}

/// Look up a title with proactive rate limiting.
///
/// 1. Acquires the governor permit (waits if needed)
/// 2. Calls `backend.lookup()`
/// 3. On 429: slows the governor, sleeps for Retry-After (capped at
///    `timeout`, default 2s), and retries once
/// 4. Any other outcome is returned as-is; transport errors are not retried
pub async fn lookup_with_rate_limit(
    backend: &dyn LookupBackend,
    title: &str,
    client: &reqwest::Client,
    timeout: Duration,
    limiter: Option<&AdaptiveLimiter>,
) -> Result<LookupOutcome, LookupError> {
    if let Some(lim) = limiter {
        lim.acquire().await;
    }

    match backend.lookup(title, client, timeout).await {
        Err(LookupError::RateLimited { retry_after }) => {
            if let Some(lim) = limiter {
                lim.on_rate_limited();
            }

            let wait = retry_after.unwrap_or(Duration::from_secs(2)).min(timeout);
            tracing::info!(
                backend = backend.name(),
                wait_secs = wait.as_secs_f64(),
                "429 rate limited, waiting then retrying"
            );
            tokio::time::sleep(wait).await;

            if let Some(lim) = limiter {
                lim.acquire().await;
            }

            // Single retry; a second 429 is returned to the caller
            backend.lookup(title, client, timeout).await
        }
        other => other,
    }
}

//! Retry policy for outbound messaging requests.
//!
//! Retries are driven by response status only. Transport errors surface
//! immediately.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{header::HeaderMap, Method, StatusCode};

/// Upper bound on any single backoff sleep.
pub const BACKOFF_MAX: Duration = Duration::from_secs(120);

/// Status-based retry policy with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Number of retries after the first attempt
    pub total: u32,
    /// Seconds; the n-th retry (n >= 2) sleeps `factor * 2^(n-1)`
    pub backoff_factor: f64,
    pub status_forcelist: Vec<u16>,
    pub allowed_methods: Vec<Method>,
    /// Honor `Retry-After` on 429 and 503 responses
    pub respect_retry_after: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            total: 3,
            backoff_factor: 0.5,
            status_forcelist: vec![429, 500, 502, 503, 504],
            allowed_methods: vec![Method::POST],
            respect_retry_after: true,
        }
    }
}

impl RetryPolicy {
    /// Whether a response with `status` should be retried after `retries_done` retries.
    pub fn should_retry(&self, method: &Method, status: StatusCode, retries_done: u32) -> bool {
        retries_done < self.total
            && self.allowed_methods.contains(method)
            && self.status_forcelist.contains(&status.as_u16())
    }

    /// Sleep before retry number `retry` (1-based).
    ///
    /// The first retry goes out immediately.
    pub fn backoff(&self, retry: u32) -> Duration {
        if retry <= 1 || self.backoff_factor <= 0.0 {
            return Duration::ZERO;
        }
        let secs = self.backoff_factor * 2f64.powi(retry as i32 - 1);
        Duration::from_secs_f64(secs).min(BACKOFF_MAX)
    }

    /// Delay to use before retry number `retry`, given the response that triggered it.
    pub fn delay_for(&self, retry: u32, status: StatusCode, headers: &HeaderMap) -> Duration {
        if self.respect_retry_after
            && (status == StatusCode::TOO_MANY_REQUESTS
                || status == StatusCode::SERVICE_UNAVAILABLE)
        {
            if let Some(after) = retry_after(headers) {
                return after.min(BACKOFF_MAX);
            }
        }
        self.backoff(retry)
    }
}

/// Parse a `Retry-After` header, either delta-seconds or an HTTP date.
///
/// A date in the past means no wait.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(reqwest::header::RETRY_AFTER)?.to_str().ok()?.trim();

    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    let at = DateTime::parse_from_rfc2822(value).ok()?;
    let wait = at.with_timezone(&Utc) - Utc::now();
    Some(wait.to_std().unwrap_or(Duration::ZERO))
}

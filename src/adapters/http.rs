//! HTTP plumbing shared by the REST data-source adapters
//!
//! - `RateLimiter`: per-minute request budget plus a minimum spacing
//! - `execute_with_retry`: status mapping and backoff for one logical request

use std::time::{Duration, Instant};

use rand::Rng;
use reqwest::{Response, StatusCode};

use crate::ports::sources::{SourceError, SourceResult};

/// Upper bound for a single backoff sleep
const MAX_BACKOFF_MS: u64 = 5_000;

/// Request budget: at most `rpm_limit` per rolling minute, spaced by `min_interval`
#[derive(Debug)]
pub struct RateLimiter {
    /// Maximum requests per minute
    rpm_limit: u32,
    /// Minimum spacing between two requests
    min_interval: Duration,
    /// Timestamp of last request
    last_request: Option<Instant>,
    /// Requests made in current window
    requests_in_window: u32,
    /// Window start time
    window_start: Instant,
}

impl RateLimiter {
    pub fn new(rpm_limit: u32, min_interval: Duration) -> Self {
        Self {
            rpm_limit: rpm_limit.max(1),
            min_interval,
            last_request: None,
            requests_in_window: 0,
            window_start: Instant::now(),
        }
    }

    /// How long the next request has to wait, None if it may go now
    pub fn check_rate_limit(&mut self) -> Option<Duration> {
        let now = Instant::now();
        let elapsed = now.duration_since(self.window_start);

        if elapsed >= Duration::from_secs(60) {
            self.window_start = now;
            self.requests_in_window = 0;
        }

        if self.requests_in_window >= self.rpm_limit {
            return Some(Duration::from_secs(60).saturating_sub(elapsed));
        }

        let since_last = self.last_request.map(|last| now.duration_since(last))?;
        (since_last < self.min_interval).then(|| self.min_interval - since_last)
    }

    pub fn record_request(&mut self) {
        self.last_request = Some(Instant::now());
        self.requests_in_window += 1;
    }

    /// Sleep until a request is allowed, then count it
    pub async fn wait_if_needed(&mut self) {
        if let Some(wait) = self.check_rate_limit() {
            if !wait.is_zero() {
                tracing::trace!(wait_ms = wait.as_millis() as u64, "Throttling request");
                tokio::time::sleep(wait).await;
            }
            // a full window may have rolled over while sleeping
            if self.requests_in_window >= self.rpm_limit {
                self.window_start = Instant::now();
                self.requests_in_window = 0;
            }
        }
        self.record_request();
    }
}

/// Retry settings for one provider
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Attempts including the first
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay_ms,
        }
    }

    /// Exponential backoff (base * 2^attempt, capped) plus up to 50% jitter
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt))
            .min(MAX_BACKOFF_MS);
        let jitter = if exp > 0 {
            rand::thread_rng().gen_range(0..=exp / 2)
        } else {
            0
        };
        Duration::from_millis(exp + jitter)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, 250)
    }
}

/// Map a reqwest failure onto the port error
pub fn transport_error(err: reqwest::Error) -> SourceError {
    if err.is_timeout() {
        SourceError::Timeout
    } else {
        SourceError::Transport(err.to_string())
    }
}

/// Run `request_fn` until it yields a usable response.
///
/// - 2xx: `Ok(Some(response))`
/// - 404: `Ok(None)`
/// - 429: `Err(RateLimited)` right away; callers own the rate-limit backoff
/// - 5xx and transport errors: retried, then surfaced
/// - other statuses: `Err(Upstream)` without retry
pub async fn execute_with_retry<F, Fut>(
    provider: &str,
    policy: RetryPolicy,
    request_fn: F,
) -> SourceResult<Option<Response>>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<Response, reqwest::Error>>,
{
    let mut last_error = None;

    for attempt in 0..policy.max_attempts {
        match request_fn().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return Ok(Some(response));
                }
                if status == StatusCode::NOT_FOUND {
                    return Ok(None);
                }
                if status == StatusCode::TOO_MANY_REQUESTS {
                    tracing::warn!(provider, "Rate limited (429)");
                    return Err(SourceError::RateLimited(provider.to_string()));
                }

                let error = SourceError::Upstream {
                    provider: provider.to_string(),
                    status: status.as_u16(),
                };
                if !status.is_server_error() {
                    return Err(error);
                }
                last_error = Some(error);
            }
            Err(e) => {
                last_error = Some(transport_error(e));
            }
        }

        if attempt + 1 < policy.max_attempts {
            let backoff = policy.backoff(attempt);
            tracing::debug!(
                provider,
                "Request failed (attempt {}/{}), retrying in {:?}",
                attempt + 1,
                policy.max_attempts,
                backoff
            );
            tokio::time::sleep(backoff).await;
        }
    }

    Err(last_error.unwrap_or_else(|| SourceError::Transport("Max retries exceeded".into())))
}

/// Deserialize the body, mapping failures to `Malformed`
pub async fn read_json<T: serde::de::DeserializeOwned>(response: Response) -> SourceResult<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| SourceError::Malformed(format!("Failed to parse JSON: {}", e)))
}

/// Lenient number parsing for upstream payloads that mix strings and numbers
pub mod flex {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
        Other(serde_json::Value),
    }

    fn to_f64(raw: Raw) -> Option<f64> {
        match raw {
            Raw::Number(n) => Some(n),
            Raw::Text(text) => text.trim().parse::<f64>().ok(),
            Raw::Other(_) => None,
        }
        .filter(|n| n.is_finite())
    }

    /// `"1.5"`, `1.5`, `null` or garbage; unparseable becomes None
    pub fn opt_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        Ok(Option::<Raw>::deserialize(deserializer)?.and_then(to_f64))
    }

    /// Same as [`opt_f64`] for integer counters
    pub fn opt_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
        Ok(opt_f64(deserializer)?
            .filter(|n| *n >= 0.0)
            .map(|n| n.floor() as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Sample {
        #[serde(default, deserialize_with = "flex::opt_f64")]
        price: Option<f64>,
        #[serde(default, deserialize_with = "flex::opt_u64")]
        count: Option<u64>,
    }

    #[test]
    fn test_flex_accepts_strings_and_numbers() {
        let s: Sample = serde_json::from_str(r#"{"price":"0.0042","count":17}"#).unwrap();
        assert_eq!(s.price, Some(0.0042));
        assert_eq!(s.count, Some(17));

        let s: Sample = serde_json::from_str(r#"{"price":12.5,"count":"3"}"#).unwrap();
        assert_eq!(s.price, Some(12.5));
        assert_eq!(s.count, Some(3));
    }

    #[test]
    fn test_flex_tolerates_null_and_garbage() {
        let s: Sample = serde_json::from_str(r#"{"price":null,"count":"n/a"}"#).unwrap();
        assert!(s.price.is_none());
        assert!(s.count.is_none());

        let s: Sample = serde_json::from_str("{}").unwrap();
        assert!(s.price.is_none());
    }

    #[test]
    fn test_rate_limiter_first_request_is_free() {
        let mut limiter = RateLimiter::new(10, Duration::from_millis(100));
        assert!(limiter.check_rate_limit().is_none());
    }

    #[test]
    fn test_rate_limiter_enforces_min_interval() {
        let mut limiter = RateLimiter::new(10, Duration::from_millis(500));
        limiter.record_request();
        let wait = limiter.check_rate_limit();
        assert!(wait.is_some());
        assert!(wait.unwrap() <= Duration::from_millis(500));
    }

    #[test]
    fn test_rate_limiter_enforces_window_budget() {
        let mut limiter = RateLimiter::new(2, Duration::ZERO);
        limiter.record_request();
        limiter.record_request();
        let wait = limiter.check_rate_limit().unwrap();
        assert!(wait > Duration::from_secs(50));
    }

    #[test]
    fn test_backoff_grows_and_is_capped() {
        let policy = RetryPolicy::new(3, 100);
        let first = policy.backoff(0);
        assert!(first >= Duration::from_millis(100) && first <= Duration::from_millis(150));

        let policy = RetryPolicy::new(3, 10_000);
        assert!(policy.backoff(5) <= Duration::from_millis(MAX_BACKOFF_MS + MAX_BACKOFF_MS / 2));
    }

    #[test]
    fn test_zero_base_delay_has_no_backoff() {
        assert_eq!(RetryPolicy::new(2, 0).backoff(3), Duration::ZERO);
    }
}

use crate::fetch::{fetch_with_timeout, FetchError, Transport};
use reqwest::header::HeaderMap;
use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(3000);
pub const DEFAULT_BACKOFF_STEP: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Bound on each individual attempt.
    pub timeout: Duration,
    /// Attempt `n` (0-based) waits `n * backoff_step` before starting.
    pub backoff_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            timeout: DEFAULT_TIMEOUT,
            backoff_step: DEFAULT_BACKOFF_STEP,
        }
    }
}

/// Fetches `url` until a 2xx response arrives or the attempt budget runs out,
/// returning the response body.
pub async fn fetch_with_retry(
    transport: &dyn Transport,
    url: &str,
    policy: &RetryPolicy,
    headers: &HeaderMap,
) -> Result<String, FetchError> {
    let attempts = policy.max_attempts.max(1);
    let mut last_error = None;

    for attempt in 0..attempts {
        if attempt > 0 {
            log::debug!("{url}: retrying ({}/{attempts})", attempt + 1);
            tokio::time::sleep(policy.backoff_step.saturating_mul(attempt)).await;
        }

        match fetch_with_timeout(transport, url, policy.timeout, headers).await {
            Ok(page) if page.status.is_success() => return Ok(page.body),
            Ok(page) => last_error = Some(FetchError::Status(page.status.as_u16())),
            Err(err) => {
                log::debug!("{url}: attempt {} failed: {err}", attempt + 1);
                last_error = Some(err);
            }
        }
    }

    Err(FetchError::RetryExhausted {
        attempts,
        source: Box::new(
            last_error.unwrap_or_else(|| FetchError::Network("no attempt made".into())),
        ),
    })
}

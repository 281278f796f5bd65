pub mod http;
pub mod proxy;
pub mod retry;

pub use http::HttpTransport;
pub use proxy::proxy_target;
pub use retry::{fetch_with_retry, RetryPolicy};

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use std::time::Duration;

/// Failure of a single page fetch or of a whole retry sequence.
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("gave up after {attempts} attempts: {source}")]
    RetryExhausted {
        attempts: u32,
        #[source]
        source: Box<FetchError>,
    },
}

/// Raw response of one GET.
#[derive(Debug, Clone)]
pub struct Page {
    pub status: StatusCode,
    pub body: String,
}

/// Issues one GET. Implementations do no retrying and no timing out of their own.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str, headers: &HeaderMap) -> Result<Page, FetchError>;
}

/// One GET bounded by `timeout`. A request still pending when the timeout
/// fires is dropped.
pub async fn fetch_with_timeout(
    transport: &dyn Transport,
    url: &str,
    timeout: Duration,
    headers: &HeaderMap,
) -> Result<Page, FetchError> {
    match tokio::time::timeout(timeout, transport.get(url, headers)).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout(timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stalled;

    #[async_trait]
    impl Transport for Stalled {
        async fn get(&self, _url: &str, _headers: &HeaderMap) -> Result<Page, FetchError> {
            std::future::pending().await
        }
    }

    struct Ready;

    #[async_trait]
    impl Transport for Ready {
        async fn get(&self, _url: &str, _headers: &HeaderMap) -> Result<Page, FetchError> {
            Ok(Page {
                status: StatusCode::OK,
                body: "<html></html>".into(),
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_fires() {
        let started = tokio::time::Instant::now();
        let res = fetch_with_timeout(
            &Stalled,
            "https://example.com/",
            Duration::from_millis(3000),
            &HeaderMap::new(),
        )
        .await;
        assert!(matches!(res, Err(FetchError::Timeout(d)) if d == Duration::from_millis(3000)));
        assert_eq!(started.elapsed(), Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_response_within_timeout() {
        let page = fetch_with_timeout(
            &Ready,
            "https://example.com/",
            Duration::from_millis(3000),
            &HeaderMap::new(),
        )
        .await
        .unwrap();
        assert_eq!(page.status, StatusCode::OK);
    }
}

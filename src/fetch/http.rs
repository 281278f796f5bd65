use crate::fetch::{FetchError, Page, Transport};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use std::error::Error;
use std::time::Duration;

/// Innermost cause of a reqwest error, which is usually the readable one.
fn get_error(error: &reqwest::Error) -> String {
    match error.source() {
        Some(e) => match e.source() {
            Some(e) => e.to_string(),
            None => e.to_string(),
        },
        None => error.to_string(),
    }
}

/// `Transport` backed by a shared reqwest client.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(10))
            .build()
            .map_err(|err| FetchError::Network(get_error(&err)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str, headers: &HeaderMap) -> Result<Page, FetchError> {
        log::debug!("{url}: requesting");

        let resp = self
            .client
            .get(url)
            .headers(headers.clone())
            .send()
            .await
            .map_err(|err| {
                log::debug!("{url}: {err}: {}", get_error(&err));
                FetchError::Network(get_error(&err))
            })?;

        let status = resp.status();
        if !status.is_success() {
            log::debug!("{url}: {status}");
        }

        let body = resp
            .text()
            .await
            .map_err(|err| FetchError::Network(get_error(&err)))?;

        Ok(Page { status, body })
    }
}

mod web;

use crate::fetch::{FetchError, Page, Transport};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub enum Reply {
    Html(String),
    Status(u16),
    Refused,
    Hang,
    Panic,
}

type Responder = Box<dyn Fn(&str, usize) -> Reply + Send + Sync>;

/// In-memory transport. Replies are picked per request by `respond(url, call_index)`.
pub struct MockTransport {
    respond: Responder,
    delay: Option<Duration>,
    calls: AtomicUsize,
    requests: Mutex<Vec<(String, HeaderMap)>>,
}

impl MockTransport {
    pub fn new(respond: impl Fn(&str, usize) -> Reply + Send + Sync + 'static) -> Self {
        Self {
            respond: Box::new(respond),
            delay: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn html(body: &str) -> Self {
        let body = body.to_string();
        Self::new(move |_, _| Reply::Html(body.clone()))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<(String, HeaderMap)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, url: &str, headers: &HeaderMap) -> Result<Page, FetchError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), headers.clone()));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match (self.respond)(url, n) {
            Reply::Html(body) => Ok(Page {
                status: StatusCode::OK,
                body,
            }),
            Reply::Status(code) => Ok(Page {
                status: StatusCode::from_u16(code).unwrap(),
                body: String::new(),
            }),
            Reply::Refused => Err(FetchError::Network("connection refused".into())),
            Reply::Hang => std::future::pending().await,
            Reply::Panic => panic!("transport crashed on {url}"),
        }
    }
}

pub const ARTICLE_HTML: &str = r#"<html><head>
    <title>Article | Example</title>
    <meta property="og:title" content="An Article">
    <meta property="og:description" content="What the article says">
    <meta property="og:image" content="/images/cover.png">
    <meta property="og:site_name" content="Example News">
</head><body><p>text</p></body></html>"#;

//! Metadata lookups with TTL caching and per-key request coalescing.
//!
//! Each `(lang, url)` key has at most one cached entry and at most one
//! outstanding fetch. Concurrent lookups for a key that is being fetched all
//! await the same shared result. Failed fetches are cached too, as degraded
//! records with a short lifetime, so a dead origin is not hammered.
//!
//! Entries expire lazily: an expired entry is dropped by the lookup that
//! finds it. The store is bounded by `max_entries`; when full, expired
//! entries go first, then the one closest to expiry.

use crate::config::{Config, DEFAULT_USER_AGENT};
use crate::fetch::{fetch_with_retry, proxy_target, FetchError, HttpTransport, RetryPolicy, Transport};
use crate::lang::{self, Lang};
use crate::metadata::{self, MetadataRecord};
use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Longest lifetime any entry gets, whatever the configured TTL.
const MAX_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub lang: Lang,
    pub url: String,
}

struct CacheEntry {
    data: Arc<MetadataRecord>,
    expires_at: Instant,
}

/// Result of the one fetch running for a key, awaited by every caller.
type Pending = Shared<BoxFuture<'static, Arc<MetadataRecord>>>;

#[derive(Default)]
struct CacheState {
    entries: HashMap<CacheKey, CacheEntry>,
    in_flight: HashMap<CacheKey, Pending>,
}

impl CacheState {
    fn fresh(&mut self, key: &CacheKey, now: Instant) -> Option<Arc<MetadataRecord>> {
        let entry = self.entries.get(key)?;
        if now < entry.expires_at {
            return Some(entry.data.clone());
        }

        self.entries.remove(key);
        None
    }

    fn store(&mut self, key: CacheKey, entry: CacheEntry, max_entries: usize, now: Instant) {
        if !self.entries.contains_key(&key) && self.entries.len() >= max_entries {
            self.entries.retain(|_, entry| now < entry.expires_at);

            if self.entries.len() >= max_entries {
                let soonest = self
                    .entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.expires_at)
                    .map(|(key, _)| key.clone());
                if let Some(soonest) = soonest {
                    log::debug!("{}: evicted to make room", soonest.url);
                    self.entries.remove(&soonest);
                }
            }
        }

        self.entries.insert(key, entry);
    }
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub default_lang: Lang,
    /// Used when the caller supplies no usable User-Agent.
    pub user_agent: String,
    pub fallback_proxy: Option<String>,
    pub success_ttl: Duration,
    pub fallback_ttl: Duration,
    pub retry: RetryPolicy,
    pub max_entries: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for CacheSettings {
    fn from(config: &Config) -> Self {
        Self {
            default_lang: config.default_lang,
            user_agent: config.user_agent.clone(),
            fallback_proxy: config.fallback_proxy.clone(),
            success_ttl: Duration::from_secs(config.success_ttl_secs),
            fallback_ttl: Duration::from_millis(config.fallback_ttl_ms),
            retry: config.retry_policy(),
            max_entries: config.max_entries.max(1),
        }
    }
}

struct Inner {
    transport: Arc<dyn Transport>,
    settings: CacheSettings,
    state: Mutex<CacheState>,
}

/// Handle to the process-wide metadata cache. Clones share the same store.
#[derive(Clone)]
pub struct MetaCache {
    inner: Arc<Inner>,
}

impl MetaCache {
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let transport = HttpTransport::new()?;
        Ok(Self::with_transport(
            CacheSettings::from(config),
            Arc::new(transport),
        ))
    }

    pub fn with_transport(settings: CacheSettings, transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                settings,
                state: Mutex::new(CacheState::default()),
            }),
        }
    }

    /// Metadata for `url` in `lang`, served from cache, from a fetch already
    /// in progress, or from a new fetch. Failures come back as a degraded
    /// record; `None` only when no URL was given.
    pub async fn get(
        &self,
        url: Option<&str>,
        lang: Option<&str>,
        user_agent: Option<&str>,
    ) -> Option<Arc<MetadataRecord>> {
        let url = url.filter(|url| !url.is_empty())?;
        let key = CacheKey {
            lang: lang::select(lang, self.inner.settings.default_lang),
            url: url.to_string(),
        };

        let pending = {
            let mut state = self.inner.lock_state();

            if let Some(record) = state.fresh(&key, Instant::now()) {
                log::debug!("{url}: cache hit ({})", key.lang);
                return Some(record);
            }

            match state.in_flight.get(&key).cloned() {
                Some(pending) => {
                    log::debug!("{url}: joining in-flight fetch ({})", key.lang);
                    pending
                }
                None => {
                    let pending = self.dispatch(key.clone(), user_agent);
                    state.in_flight.insert(key, pending.clone());
                    pending
                }
            }
        };

        Some(pending.await)
    }

    /// Starts the fetch for `key` on its own task. The task runs to completion
    /// even if every waiter goes away, and settles the key before its result
    /// is handed out.
    fn dispatch(&self, key: CacheKey, user_agent: Option<&str>) -> Pending {
        let inner = self.inner.clone();
        let task_key = key.clone();
        let user_agent = user_agent.map(str::to_string);

        let handle = tokio::spawn(async move {
            let (record, ttl) = inner.resolve(&task_key, user_agent.as_deref()).await;
            let record = Arc::new(record);
            inner.settle(task_key, record.clone(), ttl);
            record
        });

        let inner = self.inner.clone();
        async move {
            match handle.await {
                Ok(record) => record,
                Err(err) => {
                    log::error!("{}: metadata task failed: {err}", key.url);
                    let record = Arc::new(MetadataRecord::degraded(&key.url));
                    let ttl = inner.settings.fallback_ttl;
                    inner.settle(key, record.clone(), ttl);
                    record
                }
            }
        }
        .boxed()
        .shared()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.inner.lock_state().entries.len()
    }

    #[cfg(test)]
    pub(crate) fn in_flight(&self) -> usize {
        self.inner.lock_state().in_flight.len()
    }
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Caches `record` for `ttl` and releases the in-flight slot, in one step.
    fn settle(&self, key: CacheKey, record: Arc<MetadataRecord>, ttl: Duration) {
        let now = Instant::now();
        let mut state = self.lock_state();
        state.in_flight.remove(&key);
        state.store(
            key,
            CacheEntry {
                data: record,
                expires_at: now + ttl.min(MAX_TTL),
            },
            self.settings.max_entries,
            now,
        );
    }

    async fn resolve(&self, key: &CacheKey, user_agent: Option<&str>) -> (MetadataRecord, Duration) {
        let url = key.url.as_str();

        let page_url = match Url::parse(url) {
            Ok(page_url) => page_url,
            Err(err) => {
                log::warn!("{url}: not an absolute url: {err}");
                return (MetadataRecord::degraded(url), self.settings.fallback_ttl);
            }
        };

        let headers = self.request_headers(key.lang, user_agent);

        match self.fetch_html(url, &headers).await {
            Some(html) if !html.is_empty() => {
                let extracted = metadata::extract(&html, &page_url);
                log::info!("{url}: metadata fetched ({})", key.lang);
                (
                    MetadataRecord::from_extracted(extracted, url),
                    self.settings.success_ttl,
                )
            }
            _ => {
                log::warn!("{url}: no html, serving fallback metadata");
                (MetadataRecord::degraded(url), self.settings.fallback_ttl)
            }
        }
    }

    /// Direct fetch, then the fallback proxy if one is configured.
    async fn fetch_html(&self, url: &str, headers: &HeaderMap) -> Option<String> {
        let transport = self.transport.as_ref();
        let retry = &self.settings.retry;

        let err = match fetch_with_retry(transport, url, retry, headers).await {
            Ok(html) => return Some(html),
            Err(err) => err,
        };
        log::warn!("{url}: {err}");

        let template = self.settings.fallback_proxy.as_deref()?;
        let proxied = proxy_target(template, url);
        log::debug!("{url}: trying fallback proxy");

        match fetch_with_retry(transport, &proxied, retry, &HeaderMap::new()).await {
            Ok(html) => Some(html),
            Err(err) => {
                log::warn!("{url}: fallback proxy: {err}");
                None
            }
        }
    }

    fn request_headers(&self, lang: Lang, user_agent: Option<&str>) -> HeaderMap {
        let user_agent = user_agent
            .map(str::trim)
            .filter(|user_agent| !user_agent.is_empty())
            .and_then(|user_agent| HeaderValue::from_str(user_agent).ok())
            .or_else(|| HeaderValue::from_str(&self.settings.user_agent).ok())
            .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_USER_AGENT));

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, user_agent);
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static(lang.accept_language()),
        );
        headers
    }
}

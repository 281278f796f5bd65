use crate::fetch::RetryPolicy;
use crate::lang::Lang;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_LISTEN: &str = "0.0.0.0:3090";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; ogp-api/1.0)";
const DEFAULT_FALLBACK_TTL_MS: u64 = 60 * 1000;
const DEFAULT_SUCCESS_TTL_SECS: u64 = 30 * 60;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 3000;
const DEFAULT_MAX_ATTEMPTS: u32 = 2;
const DEFAULT_BACKOFF_STEP_MS: u64 = 200;
const DEFAULT_MAX_ENTRIES: usize = 10_000;

pub const ENV_USER_AGENT: &str = "OGP_USER_AGENT";
pub const ENV_FALLBACK_PROXY: &str = "OGP_FALLBACK_PROXY";
pub const ENV_FALLBACK_TTL_MS: &str = "OGP_FALLBACK_TTL_MS";
pub const ENV_LISTEN: &str = "OGP_LISTEN";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config {} is malformed: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_yml::Error,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Address the daemon binds to
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Outbound User-Agent when the caller does not supply one
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Language used when a request names none or an unsupported one
    #[serde(default)]
    pub default_lang: Lang,

    /// Proxy tried after the direct fetch fails. `{url}` is replaced with the
    /// encoded target, otherwise the target is appended.
    #[serde(default)]
    pub fallback_proxy: Option<String>,

    /// Lifetime of degraded entries
    #[serde(default = "default_fallback_ttl_ms")]
    pub fallback_ttl_ms: u64,

    #[serde(default = "default_success_ttl_secs")]
    pub success_ttl_secs: u64,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_backoff_step_ms")]
    pub backoff_step_ms: u64,

    /// Upper bound on cached entries
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            user_agent: default_user_agent(),
            default_lang: Lang::default(),
            fallback_proxy: None,
            fallback_ttl_ms: default_fallback_ttl_ms(),
            success_ttl_secs: default_success_ttl_secs(),
            request_timeout_ms: default_request_timeout_ms(),
            max_attempts: default_max_attempts(),
            backoff_step_ms: default_backoff_step_ms(),
            max_entries: default_max_entries(),
        }
    }
}

fn default_listen() -> String {
    DEFAULT_LISTEN.to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_fallback_ttl_ms() -> u64 {
    DEFAULT_FALLBACK_TTL_MS
}

fn default_success_ttl_secs() -> u64 {
    DEFAULT_SUCCESS_TTL_SECS
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_backoff_step_ms() -> u64 {
    DEFAULT_BACKOFF_STEP_MS
}

fn default_max_entries() -> usize {
    DEFAULT_MAX_ENTRIES
}

impl Config {
    fn validate(&mut self) {
        if self.max_attempts == 0 {
            self.max_attempts = 1
        }
        if self.max_entries == 0 {
            self.max_entries = 1
        }
        if self.user_agent.trim().is_empty() {
            self.user_agent = default_user_agent();
        }
        if self
            .fallback_proxy
            .as_deref()
            .is_some_and(|proxy| proxy.trim().is_empty())
        {
            self.fallback_proxy = None;
        }
    }

    /// Loads the optional YAML file, then applies `OGP_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok());
        config.validate();
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let config_str = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        serde_yml::from_str(&config_str).map_err(|source| ConfigError::Malformed {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Empty values are ignored, as are fallback TTLs that are zero or not a number.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        let lookup = |name: &str| var(name).filter(|value| !value.trim().is_empty());

        if let Some(user_agent) = lookup(ENV_USER_AGENT) {
            self.user_agent = user_agent;
        }
        if let Some(proxy) = lookup(ENV_FALLBACK_PROXY) {
            self.fallback_proxy = Some(proxy);
        }
        if let Some(ttl) = lookup(ENV_FALLBACK_TTL_MS) {
            match ttl.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => self.fallback_ttl_ms = ms,
                _ => log::warn!("ignoring {ENV_FALLBACK_TTL_MS}={ttl:?}"),
            }
        }
        if let Some(listen) = lookup(ENV_LISTEN) {
            self.listen = listen;
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            timeout: Duration::from_millis(self.request_timeout_ms),
            backoff_step: Duration::from_millis(self.backoff_step_ms),
        }
    }
}

//! Client configuration.

use std::time::Duration;

use recruit_models::TokenLifetimes;
use url::Url;

use crate::error::{ClientError, ClientResult};

const DEFAULT_API_URL: &str = "http://localhost:8000/";

/// API client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL every API path is resolved against
    pub base_url: Url,
    /// Per-request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Upper bound on a single token refresh call
    pub refresh_timeout: Duration,
    /// Lifetimes used to stamp expiries on received tokens
    pub lifetimes: TokenLifetimes,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_API_URL).expect("default API URL is valid"),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            refresh_timeout: Duration::from_secs(10),
            lifetimes: TokenLifetimes::default(),
        }
    }
}

impl ClientConfig {
    /// Config pointing at `base_url` with default timeouts.
    pub fn new(base_url: &str) -> ClientResult<Self> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            ..Default::default()
        })
    }

    /// Create config from environment variables.
    pub fn from_env() -> ClientResult<Self> {
        let defaults = Self::default();
        let base_url = match std::env::var("RECRUIT_API_URL") {
            Ok(url) => parse_base_url(&url)?,
            Err(_) => defaults.base_url,
        };

        Ok(Self {
            base_url,
            timeout: env_secs("RECRUIT_TIMEOUT_SECS", defaults.timeout),
            connect_timeout: defaults.connect_timeout,
            refresh_timeout: env_secs("RECRUIT_REFRESH_TIMEOUT_SECS", defaults.refresh_timeout),
            lifetimes: TokenLifetimes {
                access: env_secs("RECRUIT_ACCESS_TTL_SECS", defaults.lifetimes.access),
                refresh: env_secs("RECRUIT_REFRESH_TTL_SECS", defaults.lifetimes.refresh),
            },
        })
    }

    /// Resolve an API path such as `/auth/login/` against the base URL.
    ///
    /// Leading slashes are ignored so a base URL with a path prefix
    /// (`https://host/api/`) keeps it.
    pub fn endpoint(&self, path: &str) -> ClientResult<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ClientError::config(format!("Invalid API path {:?}: {}", path, e)))
    }
}

/// Parse a base URL, making sure it ends with `/` so joins append.
fn parse_base_url(raw: &str) -> ClientResult<Url> {
    let mut url = Url::parse(raw)
        .map_err(|e| ClientError::config(format!("Invalid API URL {:?}: {}", raw, e)))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn env_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

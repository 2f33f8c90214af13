//! API configuration.

use std::time::Duration;

use recruit_models::TokenLifetimes;

use crate::error::{ApiError, ApiResult};

/// Secret used when `JWT_SECRET` is unset outside production.
const DEV_JWT_SECRET: &str = "recruit-dev-secret-change-me";

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Rate limit requests per second (per client IP, auth routes)
    pub rate_limit_rps: u32,
    /// Take the client IP from `X-Forwarded-For`/`X-Real-IP`. Only safe
    /// behind a reverse proxy that overwrites those headers.
    pub trust_proxy_headers: bool,
    /// Max request body size
    pub max_body_size: usize,
    /// Environment (development/production)
    pub environment: String,
    /// Expose Prometheus metrics at /metrics
    pub metrics_enabled: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            rate_limit_rps: 10,
            trust_proxy_headers: false,
            max_body_size: 1024 * 1024, // 1MB
            environment: "development".to_string(),
            metrics_enabled: true,
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_parse("API_PORT", 8000),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(|_| vec!["*".to_string()]),
            rate_limit_rps: env_parse("RATE_LIMIT_RPS", 10),
            trust_proxy_headers: std::env::var("TRUST_PROXY_HEADERS")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            max_body_size: env_parse("MAX_BODY_SIZE", 1024 * 1024),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            metrics_enabled: std::env::var("METRICS_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}

/// Token signing and lifetime configuration.
#[derive(Clone)]
pub struct JwtConfig {
    /// HMAC secret for HS256 signing
    pub secret: String,
    /// Access token lifetime
    pub access_ttl: Duration,
    /// Refresh token lifetime
    pub refresh_ttl: Duration,
    /// Interval between blacklist purges
    pub purge_interval: Duration,
}

impl Default for JwtConfig {
    fn default() -> Self {
        let lifetimes = TokenLifetimes::default();
        Self {
            secret: DEV_JWT_SECRET.to_string(),
            access_ttl: lifetimes.access,
            refresh_ttl: lifetimes.refresh,
            purge_interval: Duration::from_secs(3600),
        }
    }
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("purge_interval", &self.purge_interval)
            .finish()
    }
}

impl JwtConfig {
    /// Create config from environment variables.
    ///
    /// `JWT_SECRET` is mandatory in production; elsewhere a development
    /// secret is used.
    pub fn from_env(production: bool) -> ApiResult<Self> {
        let secret = match std::env::var("JWT_SECRET") {
            Ok(s) if !s.is_empty() => s,
            _ if production => {
                return Err(ApiError::internal("JWT_SECRET must be set in production"));
            }
            _ => DEV_JWT_SECRET.to_string(),
        };

        let defaults = JwtConfig::default();
        Ok(Self {
            secret,
            access_ttl: Duration::from_secs(env_parse(
                "JWT_ACCESS_TTL_SECS",
                defaults.access_ttl.as_secs(),
            )),
            refresh_ttl: Duration::from_secs(env_parse(
                "JWT_REFRESH_TTL_SECS",
                defaults.refresh_ttl.as_secs(),
            )),
            purge_interval: Duration::from_secs(env_parse(
                "BLACKLIST_PURGE_INTERVAL_SECS",
                defaults.purge_interval.as_secs(),
            )),
        })
    }

    pub fn lifetimes(&self) -> TokenLifetimes {
        TokenLifetimes {
            access: self.access_ttl,
            refresh: self.refresh_ttl,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_api_config_from_env() {
        std::env::set_var("API_PORT", "9100");
        std::env::set_var("CORS_ORIGINS", "https://a.example, https://b.example");
        std::env::set_var("RATE_LIMIT_RPS", "not-a-number");
        let config = ApiConfig::from_env();
        assert_eq!(config.port, 9100);
        assert_eq!(
            config.cors_origins,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
        assert_eq!(config.rate_limit_rps, 10);
        assert!(!config.trust_proxy_headers);

        std::env::set_var("TRUST_PROXY_HEADERS", "true");
        assert!(ApiConfig::from_env().trust_proxy_headers);
        std::env::remove_var("TRUST_PROXY_HEADERS");
        std::env::remove_var("API_PORT");
        std::env::remove_var("CORS_ORIGINS");
        std::env::remove_var("RATE_LIMIT_RPS");
    }

    #[test]
    #[serial]
    fn test_jwt_secret_required_in_production() {
        std::env::remove_var("JWT_SECRET");
        assert!(JwtConfig::from_env(true).is_err());
        let config = JwtConfig::from_env(false).unwrap();
        assert_eq!(config.secret, DEV_JWT_SECRET);
    }

    #[test]
    #[serial]
    fn test_jwt_lifetimes_from_env() {
        std::env::set_var("JWT_SECRET", "s3cret");
        std::env::set_var("JWT_ACCESS_TTL_SECS", "60");
        std::env::set_var("JWT_REFRESH_TTL_SECS", "600");
        let config = JwtConfig::from_env(true).unwrap();
        assert_eq!(config.access_ttl, Duration::from_secs(60));
        assert_eq!(config.lifetimes().refresh, Duration::from_secs(600));
        std::env::remove_var("JWT_SECRET");
        std::env::remove_var("JWT_ACCESS_TTL_SECS");
        std::env::remove_var("JWT_REFRESH_TTL_SECS");
    }

    #[test]
    fn test_jwt_debug_redacts_secret() {
        let config = JwtConfig::default();
        assert!(!format!("{:?}", config).contains(DEV_JWT_SECRET));
    }

    #[test]
    fn test_production_flag() {
        let config = ApiConfig {
            environment: "Production".to_string(),
            ..Default::default()
        };
        assert!(config.is_production());
        assert!(!ApiConfig::default().is_production());
    }
}

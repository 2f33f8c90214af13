//! Access/refresh token models.

use std::time::Duration;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default access token lifetime (5 minutes).
pub const DEFAULT_ACCESS_TTL: Duration = Duration::from_secs(5 * 60);

/// Default refresh token lifetime (1 day).
pub const DEFAULT_REFRESH_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Kind of JWT carried in the `token_type` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifetimes of the two token kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLifetimes {
    pub access: Duration,
    pub refresh: Duration,
}

impl Default for TokenLifetimes {
    fn default() -> Self {
        Self {
            access: DEFAULT_ACCESS_TTL,
            refresh: DEFAULT_REFRESH_TTL,
        }
    }
}

impl TokenLifetimes {
    /// Expiry of an access token issued at `issued_at`.
    pub fn access_expiry(&self, issued_at: DateTime<Utc>) -> DateTime<Utc> {
        issued_at + to_chrono(self.access)
    }

    /// Expiry of a refresh token issued at `issued_at`.
    pub fn refresh_expiry(&self, issued_at: DateTime<Utc>) -> DateTime<Utc> {
        issued_at + to_chrono(self.refresh)
    }
}

fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX)
}

/// An access/refresh token pair held by a client session.
///
/// The pair is always replaced as a whole: a refresh rotates both tokens.
/// Token contents are opaque to the holder; expiries are computed from the
/// configured lifetimes at the moment the pair was received.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expiry: DateTime<Utc>,
    pub refresh_expiry: DateTime<Utc>,
}

impl TokenPair {
    /// Build a pair received at `received_at`.
    pub fn received_at(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        received_at: DateTime<Utc>,
        lifetimes: &TokenLifetimes,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            access_expiry: lifetimes.access_expiry(received_at),
            refresh_expiry: lifetimes.refresh_expiry(received_at),
        }
    }

    /// Build a pair received now.
    pub fn received_now(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        lifetimes: &TokenLifetimes,
    ) -> Self {
        Self::received_at(access_token, refresh_token, Utc::now(), lifetimes)
    }

    /// True if a refresh token is present.
    pub fn has_refresh_token(&self) -> bool {
        !self.refresh_token.is_empty()
    }

    pub fn is_access_expired(&self) -> bool {
        Utc::now() >= self.access_expiry
    }

    pub fn is_refresh_expired(&self) -> bool {
        Utc::now() >= self.refresh_expiry
    }
}

// Tokens are bearer credentials; keep them out of debug output.
impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("access_expiry", &self.access_expiry)
            .field("refresh_expiry", &self.refresh_expiry)
            .finish()
    }
}

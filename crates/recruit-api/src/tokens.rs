//! JWT issuing, verification and refresh-token rotation.
//!
//! Tokens are HS256 JWTs carrying a `token_type` claim. Every refresh
//! rotates both tokens and blacklists the presented refresh token, so a
//! refresh token can be exchanged at most once.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use recruit_models::{TokenLifetimes, TokenType};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::blacklist::TokenBlacklist;
use crate::config::JwtConfig;
use crate::error::{ApiError, ApiResult};
use crate::metrics;

/// Detail returned for malformed, expired or wrongly-signed tokens.
pub const INVALID_OR_EXPIRED: &str = "Token is invalid or expired";

/// Detail returned for a reused refresh token.
pub const BLACKLISTED: &str = "Token is blacklisted";

/// JWT claims shared by access and refresh tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub token_type: TokenType,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
    pub user_id: i64,
}

impl Claims {
    fn new(token_type: TokenType, user_id: i64, issued_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token_type,
            exp: expires_at.timestamp(),
            iat: issued_at.timestamp(),
            jti: Uuid::new_v4().simple().to_string(),
            user_id,
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or_else(Utc::now)
    }
}

/// A freshly minted access/refresh pair.
#[derive(Clone)]
pub struct IssuedTokens {
    pub access: String,
    pub refresh: String,
}

impl std::fmt::Debug for IssuedTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("IssuedTokens { .. }")
    }
}

/// Mints, verifies and rotates tokens.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    lifetimes: TokenLifetimes,
    blacklist: Arc<TokenBlacklist>,
}

impl TokenService {
    pub fn new(config: &JwtConfig, blacklist: Arc<TokenBlacklist>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is exact: the client reacts to 401s, not to clock skew.
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            lifetimes: config.lifetimes(),
            blacklist,
        }
    }

    pub fn lifetimes(&self) -> TokenLifetimes {
        self.lifetimes
    }

    pub fn blacklist(&self) -> &Arc<TokenBlacklist> {
        &self.blacklist
    }

    /// Mint a new pair for `user_id`.
    pub fn issue(&self, user_id: i64) -> ApiResult<IssuedTokens> {
        let now = Utc::now();
        let access = Claims::new(TokenType::Access, user_id, now, self.lifetimes.access_expiry(now));
        let refresh = Claims::new(TokenType::Refresh, user_id, now, self.lifetimes.refresh_expiry(now));

        Ok(IssuedTokens {
            access: self.sign(&access)?,
            refresh: self.sign(&refresh)?,
        })
    }

    /// Verify an access token presented as a bearer credential.
    pub fn verify_access(&self, token: &str) -> ApiResult<Claims> {
        let claims = self.decode(token).map_err(|_| {
            ApiError::token_not_valid("Given token not valid for any token type")
        })?;
        if claims.token_type != TokenType::Access {
            return Err(ApiError::token_not_valid("Given token not valid for any token type"));
        }
        Ok(claims)
    }

    /// Exchange a refresh token for a new pair.
    ///
    /// The presented token is blacklisted before the new pair is minted; a
    /// token that was already blacklisted (rotated away, logged out, or lost
    /// a concurrent race) is rejected.
    pub async fn rotate(&self, refresh_token: &str) -> ApiResult<IssuedTokens> {
        let claims = self.verify_refresh(refresh_token).await?;

        if !self
            .blacklist
            .insert(&claims.jti, claims.user_id, claims.expires_at())
            .await
        {
            warn!(user_id = claims.user_id, "Refresh token reuse rejected");
            metrics::record_refresh("reused");
            return Err(ApiError::token_not_valid(BLACKLISTED));
        }

        let tokens = self.issue(claims.user_id)?;
        metrics::record_refresh("rotated");
        debug!(user_id = claims.user_id, "Rotated refresh token");
        Ok(tokens)
    }

    /// Blacklist a refresh token on logout.
    pub async fn revoke(&self, refresh_token: &str) -> ApiResult<()> {
        let claims = self.verify_refresh(refresh_token).await?;
        self.blacklist
            .insert(&claims.jti, claims.user_id, claims.expires_at())
            .await;
        debug!(user_id = claims.user_id, "Revoked refresh token");
        Ok(())
    }

    async fn verify_refresh(&self, token: &str) -> ApiResult<Claims> {
        let claims = match self.decode(token) {
            Ok(claims) => claims,
            Err(kind) => {
                let reason = if matches!(kind, ErrorKind::ExpiredSignature) {
                    "expired"
                } else {
                    "invalid"
                };
                metrics::record_refresh(reason);
                return Err(ApiError::token_not_valid(INVALID_OR_EXPIRED));
            }
        };

        if claims.token_type != TokenType::Refresh {
            metrics::record_refresh("wrong_type");
            return Err(ApiError::token_not_valid("Token has wrong type"));
        }

        if self.blacklist.contains(&claims.jti).await {
            metrics::record_refresh("reused");
            return Err(ApiError::token_not_valid(BLACKLISTED));
        }

        Ok(claims)
    }

    fn decode(&self, token: &str) -> Result<Claims, ErrorKind> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| e.into_kind())
    }

    fn sign(&self, claims: &Claims) -> ApiResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| ApiError::internal(format!("Failed to sign token: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn service_with(access: Duration, refresh: Duration) -> TokenService {
        let config = JwtConfig {
            secret: "test-secret".to_string(),
            access_ttl: access,
            refresh_ttl: refresh,
            ..Default::default()
        };
        TokenService::new(&config, Arc::new(TokenBlacklist::new()))
    }

    fn service() -> TokenService {
        service_with(Duration::from_secs(300), Duration::from_secs(3600))
    }

    fn assert_token_not_valid(err: ApiError, detail: &str) {
        match err {
            ApiError::TokenNotValid(msg) => assert_eq!(msg, detail),
            other => panic!("expected TokenNotValid, got {:?}", other),
        }
    }

    #[test]
    fn test_issue_and_verify_access() {
        let svc = service();
        let tokens = svc.issue(42).unwrap();
        let claims = svc.verify_access(&tokens.access).unwrap();
        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(claims.exp - claims.iat, 300);
    }

    #[test]
    fn test_refresh_token_is_not_an_access_token() {
        let svc = service();
        let tokens = svc.issue(1).unwrap();
        assert!(svc.verify_access(&tokens.refresh).is_err());
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let svc = service();
        let other = TokenService::new(
            &JwtConfig {
                secret: "other-secret".to_string(),
                ..Default::default()
            },
            Arc::new(TokenBlacklist::new()),
        );
        let tokens = other.issue(1).unwrap();
        assert!(svc.verify_access(&tokens.access).is_err());
    }

    #[tokio::test]
    async fn test_rotation_replaces_both_tokens() {
        let svc = service();
        let first = svc.issue(5).unwrap();
        let second = svc.rotate(&first.refresh).await.unwrap();
        assert_ne!(first.access, second.access);
        assert_ne!(first.refresh, second.refresh);
        assert_eq!(svc.verify_access(&second.access).unwrap().user_id, 5);
    }

    #[tokio::test]
    async fn test_rotated_refresh_token_cannot_be_reused() {
        let svc = service();
        let first = svc.issue(5).unwrap();
        let second = svc.rotate(&first.refresh).await.unwrap();

        let err = svc.rotate(&first.refresh).await.unwrap_err();
        assert_token_not_valid(err, BLACKLISTED);

        // The replacement still works exactly once
        svc.rotate(&second.refresh).await.unwrap();
        assert!(svc.rotate(&second.refresh).await.is_err());
    }

    #[tokio::test]
    async fn test_concurrent_rotation_has_single_winner() {
        let svc = Arc::new(service());
        let tokens = svc.issue(9).unwrap();

        let a = {
            let svc = Arc::clone(&svc);
            let refresh = tokens.refresh.clone();
            tokio::spawn(async move { svc.rotate(&refresh).await.is_ok() })
        };
        let b = {
            let svc = Arc::clone(&svc);
            let refresh = tokens.refresh.clone();
            tokio::spawn(async move { svc.rotate(&refresh).await.is_ok() })
        };

        let results = [a.await.unwrap(), b.await.unwrap()];
        assert_eq!(results.iter().filter(|ok| **ok).count(), 1);
    }

    #[tokio::test]
    async fn test_garbage_refresh_token() {
        let svc = service();
        let err = svc.rotate("not-a-jwt").await.unwrap_err();
        assert_token_not_valid(err, INVALID_OR_EXPIRED);
    }

    #[tokio::test]
    async fn test_access_token_cannot_refresh() {
        let svc = service();
        let tokens = svc.issue(3).unwrap();
        assert!(matches!(
            svc.rotate(&tokens.access).await,
            Err(ApiError::TokenNotValid(_))
        ));
    }

    #[tokio::test]
    async fn test_expired_refresh_token() {
        let svc = service_with(Duration::from_secs(0), Duration::from_secs(0));
        let tokens = svc.issue(3).unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;
        let err = svc.rotate(&tokens.refresh).await.unwrap_err();
        assert_token_not_valid(err, INVALID_OR_EXPIRED);
        assert!(svc.verify_access(&tokens.access).is_err());
    }

    #[tokio::test]
    async fn test_revoke_blacklists() {
        let svc = service();
        let tokens = svc.issue(3).unwrap();
        svc.revoke(&tokens.refresh).await.unwrap();
        assert!(svc.rotate(&tokens.refresh).await.is_err());
        assert_eq!(svc.blacklist().len().await, 1);
    }
}

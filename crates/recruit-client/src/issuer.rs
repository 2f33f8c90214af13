//! Client side of the token issuer.

use std::sync::Arc;

use async_trait::async_trait;
use recruit_models::{
    AuthResponse, LoginRequest, LogoutRequest, RefreshRequest, RefreshResponse, RegisterRequest,
};

use crate::error::ClientResult;
use crate::transport::{ApiRequest, Transport};

pub const LOGIN_PATH: &str = "/auth/login/";
pub const REGISTER_PATH: &str = "/auth/register/";
pub const REFRESH_PATH: &str = "/auth/token/refresh/";
pub const LOGOUT_PATH: &str = "/auth/logout/";

/// Exchanges credentials or a refresh token for a token pair.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> ClientResult<AuthResponse>;

    async fn register(&self, request: &RegisterRequest) -> ClientResult<AuthResponse>;

    /// Rotate `refresh_token`. A 401 comes back as `Unauthenticated`.
    async fn refresh(&self, refresh_token: &str) -> ClientResult<RefreshResponse>;

    /// Ask the server to blacklist `refresh_token`.
    async fn logout(&self, access_token: &str, refresh_token: &str) -> ClientResult<()>;
}

/// Issuer that talks to the auth endpoints directly.
///
/// It must sit on a bare transport: routing refresh calls through the
/// refresh-on-401 pipeline would recurse.
pub struct HttpTokenIssuer {
    transport: Arc<dyn Transport>,
}

impl HttpTokenIssuer {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl TokenIssuer for HttpTokenIssuer {
    async fn login(&self, request: &LoginRequest) -> ClientResult<AuthResponse> {
        let request = ApiRequest::post(LOGIN_PATH).json(request)?;
        self.transport.send(request).await?.into_result()
    }

    async fn register(&self, request: &RegisterRequest) -> ClientResult<AuthResponse> {
        let request = ApiRequest::post(REGISTER_PATH).json(request)?;
        self.transport.send(request).await?.into_result()
    }

    async fn refresh(&self, refresh_token: &str) -> ClientResult<RefreshResponse> {
        let request = ApiRequest::post(REFRESH_PATH).json(&RefreshRequest {
            refresh: refresh_token.to_string(),
        })?;
        self.transport.send(request).await?.into_result()
    }

    async fn logout(&self, access_token: &str, refresh_token: &str) -> ClientResult<()> {
        let request = ApiRequest::post(LOGOUT_PATH)
            .json(&LogoutRequest {
                refresh_token: Some(refresh_token.to_string()),
            })?
            .bearer(access_token);
        self.transport.send(request).await?.ensure_success()
    }
}

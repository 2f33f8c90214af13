//! Bearer token authentication.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;
use crate::store::UserRecord;

/// Detail returned when no usable `Authorization` header is present.
pub const NOT_AUTHENTICATED: &str = "Authentication credentials were not provided.";

/// Authenticated user extracted from request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: UserRecord,
    /// `jti` of the access token used for this request
    pub token_id: String,
}

impl AuthUser {
    pub fn id(&self) -> i64 {
        self.user.id
    }
}

/// Pull the raw token out of an `Authorization: Bearer <token>` header.
///
/// A missing header or a different scheme means "no credentials"; a
/// malformed bearer header is an error in its own right.
fn bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized(NOT_AUTHENTICATED))?;

    let mut segments = header.split_whitespace();
    match (segments.next(), segments.next(), segments.next()) {
        (Some(scheme), Some(token), None) if scheme == "Bearer" => Ok(token),
        (Some(scheme), _, _) if scheme == "Bearer" => Err(ApiError::unauthorized(
            "Authorization header must contain two space-delimited values",
        )),
        _ => Err(ApiError::unauthorized(NOT_AUTHENTICATED)),
    }
}

/// Axum extractor for authenticated user.
#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = state.tokens.verify_access(token)?;

        let user = state
            .users
            .find_by_id(claims.user_id)
            .await?
            .ok_or(ApiError::UserNotFound)?;

        if !user.is_active {
            debug!(user_id = user.id, "Rejected token for inactive user");
            return Err(ApiError::UserInactive);
        }

        Ok(AuthUser {
            user,
            token_id: claims.jti,
        })
    }
}

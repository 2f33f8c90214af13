//! API error types.

use axum::extract::rejection::JsonRejection;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use recruit_models::{ErrorBody, FieldErrors};
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

/// `code` attached to rejected JWTs.
pub const TOKEN_NOT_VALID: &str = "token_not_valid";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Token not valid: {0}")]
    TokenNotValid(String),

    #[error("User not found")]
    UserNotFound,

    #[error("User is inactive")]
    UserInactive,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(FieldErrors),

    #[error("Rate limited")]
    RateLimited,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn token_not_valid(msg: impl Into<String>) -> Self {
        Self::TokenNotValid(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Single field validation failure.
    pub fn field(field: &str, msg: impl Into<String>) -> Self {
        Self::Validation(FieldErrors::single(field, msg))
    }

    /// Object-level validation failure.
    pub fn non_field(msg: impl Into<String>) -> Self {
        Self::Validation(FieldErrors::non_field(msg))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_)
            | ApiError::TokenNotValid(_)
            | ApiError::UserNotFound
            | ApiError::UserInactive => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable code for authentication failures.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            ApiError::TokenNotValid(_) => Some(TOKEN_NOT_VALID),
            ApiError::UserNotFound => Some("user_not_found"),
            ApiError::UserInactive => Some("user_inactive"),
            _ => None,
        }
    }

    /// Human-readable detail without the variant prefix.
    fn detail(&self) -> String {
        match self {
            ApiError::Unauthorized(msg)
            | ApiError::TokenNotValid(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::BadRequest(msg) => msg.clone(),
            ApiError::UserNotFound => "User not found".to_string(),
            ApiError::UserInactive => "User is inactive".to_string(),
            ApiError::RateLimited => "Request was throttled.".to_string(),
            ApiError::Validation(errors) => errors.to_string(),
            ApiError::Internal(msg) => {
                // Don't expose internal error details in production
                if std::env::var("ENVIRONMENT").unwrap_or_default() == "production" {
                    "An internal error occurred".to_string()
                } else {
                    msg.clone()
                }
            }
        }
    }
}

impl From<FieldErrors> for ApiError {
    fn from(errors: FieldErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("JSON parse error - {}", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let mut response = match self {
            ApiError::Validation(errors) => (status, Json(errors)).into_response(),
            other => {
                let body = ErrorBody {
                    detail: other.detail(),
                    code: other.code().map(str::to_string),
                };
                (status, Json(body)).into_response()
            }
        };

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Bearer realm=\"api\""),
            );
        }

        response
    }
}

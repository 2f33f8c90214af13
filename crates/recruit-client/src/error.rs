//! Client error types.

use recruit_models::{ErrorBody, FieldErrors};
use reqwest::StatusCode;
use thiserror::Error;

use crate::transport::ApiResponse;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced to callers of the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// 400 with field-keyed messages. Never ends the session.
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    /// The session is gone; the caller has to log in again.
    #[error("Unauthenticated: {detail}")]
    Unauthenticated {
        detail: String,
        code: Option<String>,
    },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Server error ({status}): {detail}")]
    Server { status: u16, detail: String },

    #[error("Unexpected status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    pub fn unauthenticated(detail: impl Into<String>) -> Self {
        Self::Unauthenticated {
            detail: detail.into(),
            code: None,
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, ClientError::Unauthenticated { .. })
    }

    /// Machine-readable code of an authentication failure, if the server sent one.
    pub fn code(&self) -> Option<&str> {
        match self {
            ClientError::Unauthenticated { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Map a non-success response onto the error taxonomy.
    pub fn from_response(response: &ApiResponse) -> Self {
        let status = response.status();
        let error_body = || -> ErrorBody {
            serde_json::from_str(response.body()).unwrap_or_else(|_| ErrorBody {
                detail: response.body().to_string(),
                code: None,
            })
        };

        match status {
            StatusCode::BAD_REQUEST => match serde_json::from_str::<FieldErrors>(response.body()) {
                Ok(errors) if !errors.is_empty() && !errors.contains("detail") => {
                    ClientError::Validation(errors)
                }
                _ => ClientError::Validation(FieldErrors::non_field(error_body().detail)),
            },
            StatusCode::UNAUTHORIZED => {
                let body = error_body();
                ClientError::Unauthenticated {
                    detail: body.detail,
                    code: body.code,
                }
            }
            StatusCode::FORBIDDEN => ClientError::Forbidden(error_body().detail),
            StatusCode::NOT_FOUND => ClientError::NotFound(error_body().detail),
            StatusCode::TOO_MANY_REQUESTS => ClientError::RateLimited,
            s if s.is_server_error() => ClientError::Server {
                status: s.as_u16(),
                detail: error_body().detail,
            },
            s => ClientError::UnexpectedStatus {
                status: s.as_u16(),
                body: response.body().to_string(),
            },
        }
    }
}

//! Request handlers.

pub mod auth;
pub mod health;
pub mod profile;

pub use auth::*;
pub use health::*;
pub use profile::*;

use axum::extract::FromRequest;

use crate::error::ApiError;

/// JSON body extractor whose rejections render as [`ApiError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

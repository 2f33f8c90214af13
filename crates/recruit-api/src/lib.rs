//! Axum HTTP API server.
//!
//! This crate provides:
//! - HS256 JWT issuing with refresh-token rotation and a blacklist
//! - Registration, login and profile endpoints
//! - Rate limiting and security headers
//! - Prometheus metrics

pub mod auth;
pub mod blacklist;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod password;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
pub mod tokens;

pub use config::{ApiConfig, JwtConfig};
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::{AccountService, BlacklistJanitor};
pub use state::AppState;
pub use store::{InMemoryUserRepository, UserRepository};
pub use tokens::TokenService;

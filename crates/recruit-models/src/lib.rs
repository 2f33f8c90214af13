//! Shared wire models for the recruitment platform.
//!
//! This crate provides Serde-serializable types for:
//! - Access/refresh token pairs and their lifetimes
//! - Registration, login, refresh and logout payloads
//! - The user profile resource
//! - Field-keyed validation errors

pub mod auth;
pub mod profile;
pub mod token;
pub mod validation;

// Re-export common types
pub use auth::{
    AuthResponse, ErrorBody, LoginRequest, LogoutRequest, MessageResponse, RefreshRequest,
    RefreshResponse, RegisterRequest, UserSummary,
};
pub use profile::{split_skills, ProfileResponse, ProfileUpdate};
pub use token::{TokenLifetimes, TokenPair, TokenType};
pub use validation::{FieldErrors, NON_FIELD_ERRORS};

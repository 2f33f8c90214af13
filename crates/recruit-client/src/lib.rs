//! Client for the recruitment platform API.
//!
//! This crate provides:
//! - A session-scoped [`CredentialStore`] for the access/refresh pair
//! - A request pipeline that attaches the bearer token and refreshes once on 401
//! - An HTTP token issuer and a typed [`RecruitClient`]

pub mod client;
pub mod config;
pub mod error;
pub mod issuer;
pub mod pipeline;
pub mod store;
pub mod transport;

pub use client::RecruitClient;
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use issuer::{HttpTokenIssuer, TokenIssuer};
pub use pipeline::{AttachBearer, Pipeline, RefreshAttempt, RefreshOnUnauthorized, SessionEvent};
pub use store::{CredentialStore, Snapshot};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Transport};

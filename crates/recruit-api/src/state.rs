//! Application state.

use std::sync::Arc;

use crate::blacklist::TokenBlacklist;
use crate::config::{ApiConfig, JwtConfig};
use crate::services::AccountService;
use crate::store::{InMemoryUserRepository, UserRepository};
use crate::tokens::TokenService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub users: Arc<dyn UserRepository>,
    pub tokens: Arc<TokenService>,
    pub blacklist: Arc<TokenBlacklist>,
    pub accounts: AccountService,
}

impl AppState {
    /// Build state around an existing repository.
    pub fn new(config: ApiConfig, jwt: &JwtConfig, users: Arc<dyn UserRepository>) -> Self {
        let blacklist = Arc::new(TokenBlacklist::new());
        let tokens = Arc::new(TokenService::new(jwt, Arc::clone(&blacklist)));
        let accounts = AccountService::new(Arc::clone(&users), Arc::clone(&tokens));

        Self {
            config,
            users,
            tokens,
            blacklist,
            accounts,
        }
    }

    /// State with a fresh process-local repository.
    pub fn in_memory(config: ApiConfig, jwt: &JwtConfig) -> Self {
        Self::new(config, jwt, Arc::new(InMemoryUserRepository::new()))
    }
}

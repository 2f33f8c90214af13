//! Account lifecycle: registration, login, refresh, logout and profiles.

use std::sync::Arc;

use recruit_models::{
    FieldErrors, LoginRequest, LogoutRequest, ProfileResponse, ProfileUpdate, RefreshRequest,
    RegisterRequest, NON_FIELD_ERRORS,
};
use tracing::{debug, info, warn};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::password::{hash_password, verify_password};
use crate::store::{NewUser, UserRecord, UserRepository, EMAIL_TAKEN, USERNAME_TAKEN};
use crate::tokens::{IssuedTokens, TokenService};

pub const INVALID_CREDENTIALS: &str = "Invalid credentials";
pub const ACCOUNT_DISABLED: &str = "User account is disabled";

/// Account service backed by a [`UserRepository`] and the [`TokenService`].
#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    tokens: Arc<TokenService>,
}

impl AccountService {
    pub fn new(users: Arc<dyn UserRepository>, tokens: Arc<TokenService>) -> Self {
        Self { users, tokens }
    }

    /// Validate, create the user and its profile, and issue a token pair.
    pub async fn register(&self, req: RegisterRequest) -> ApiResult<(UserRecord, IssuedTokens)> {
        let mut errors = req.check().err().unwrap_or_default();

        let mut taken = FieldErrors::new();
        if !req.username.is_empty() && self.users.username_exists(&req.username).await? {
            taken.add("username", USERNAME_TAKEN);
        }
        if !req.email.is_empty() && self.users.email_exists(&req.email).await? {
            taken.add("email", EMAIL_TAKEN);
        }
        if !taken.is_empty() {
            // Passwords are only compared once every field is valid
            errors.remove(NON_FIELD_ERRORS);
            errors.merge(taken);
        }
        errors.into_result()?;

        let password_hash = hash_password(&req.password).await?;
        let user = self
            .users
            .create_user(NewUser {
                username: req.username,
                email: req.email,
                first_name: req.first_name,
                last_name: req.last_name,
                password_hash,
            })
            .await?;

        let tokens = self.tokens.issue(user.id)?;
        metrics::record_registration();
        Ok((user, tokens))
    }

    /// Check credentials without issuing tokens.
    pub async fn authenticate(&self, req: &LoginRequest) -> ApiResult<UserRecord> {
        req.check()?;

        let Some(user) = self.users.find_by_username(&req.username).await? else {
            metrics::record_login("invalid");
            return Err(ApiError::non_field(INVALID_CREDENTIALS));
        };

        if !verify_password(&req.password, &user.password_hash).await? {
            warn!(user_id = user.id, "Login failed: wrong password");
            metrics::record_login("invalid");
            return Err(ApiError::non_field(INVALID_CREDENTIALS));
        }

        if !user.is_active {
            metrics::record_login("inactive");
            return Err(ApiError::non_field(ACCOUNT_DISABLED));
        }

        Ok(user)
    }

    /// Authenticate and issue a token pair.
    pub async fn login(&self, req: LoginRequest) -> ApiResult<(UserRecord, IssuedTokens)> {
        let user = self.authenticate(&req).await?;
        let tokens = self.tokens.issue(user.id)?;
        metrics::record_login("success");
        info!(user_id = user.id, "User logged in");
        Ok((user, tokens))
    }

    /// Rotate a refresh token.
    pub async fn refresh(&self, req: RefreshRequest) -> ApiResult<IssuedTokens> {
        if req.refresh.trim().is_empty() {
            return Err(ApiError::field("refresh", "This field may not be blank."));
        }
        self.tokens.rotate(&req.refresh).await
    }

    /// Blacklist the supplied refresh token.
    ///
    /// Logout always succeeds; a token that can't be blacklisted is just
    /// logged since the client discards it anyway.
    pub async fn logout(&self, user: &UserRecord, req: LogoutRequest) {
        match req.refresh_token.as_deref() {
            Some(token) if !token.is_empty() => {
                if let Err(e) = self.tokens.revoke(token).await {
                    debug!(user_id = user.id, error = %e, "Logout token not blacklisted");
                }
            }
            _ => {}
        }
        info!(user_id = user.id, "User logged out");
    }

    /// Current profile, created on first access.
    pub async fn get_profile(&self, user: &UserRecord) -> ApiResult<ProfileResponse> {
        let profile = self.users.get_or_create_profile(user.id).await?;
        Ok(profile.to_response(user))
    }

    pub async fn update_profile(
        &self,
        user: &UserRecord,
        update: ProfileUpdate,
    ) -> ApiResult<ProfileResponse> {
        update.check()?;
        let (user, profile) = self.users.update_profile(user.id, &update).await?;
        debug!(user_id = user.id, "Updated profile");
        Ok(profile.to_response(&user))
    }

    /// Same representation as [`AccountService::get_profile`].
    pub async fn user_info(&self, user: &UserRecord) -> ApiResult<ProfileResponse> {
        self.get_profile(user).await
    }
}

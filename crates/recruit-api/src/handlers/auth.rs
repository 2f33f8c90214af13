//! Authentication handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use recruit_models::{
    AuthResponse, LoginRequest, LogoutRequest, MessageResponse, RefreshRequest, RefreshResponse,
    RegisterRequest,
};
use tracing::debug;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::handlers::JsonBody;
use crate::state::AppState;
use crate::store::UserRecord;
use crate::tokens::IssuedTokens;

fn auth_response(message: &str, user: &UserRecord, tokens: IssuedTokens) -> AuthResponse {
    AuthResponse {
        message: message.to_string(),
        user: user.summary(),
        access: tokens.access,
        refresh: tokens.refresh,
    }
}

/// `POST /auth/register/`
pub async fn register(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let (user, tokens) = state.accounts.register(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(auth_response("User registered successfully", &user, tokens)),
    ))
}

/// `POST /auth/login/`
pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let (user, tokens) = state.accounts.login(req).await?;
    Ok(Json(auth_response("Login successful", &user, tokens)))
}

/// `POST /auth/token/refresh/`
pub async fn refresh_token(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let tokens = state.accounts.refresh(req).await?;
    Ok(Json(RefreshResponse {
        access: tokens.access,
        refresh: tokens.refresh,
    }))
}

/// `POST /auth/logout/`
///
/// Always 205; the body may omit the refresh token entirely.
pub async fn logout(
    State(state): State<AppState>,
    user: AuthUser,
    body: Option<Json<LogoutRequest>>,
) -> (StatusCode, Json<MessageResponse>) {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    debug!(user_id = user.id(), access_jti = %user.token_id, "Logout requested");
    state.accounts.logout(&user.user, req).await;
    (
        StatusCode::RESET_CONTENT,
        Json(MessageResponse::new("Logout successful")),
    )
}

//! Profile handlers.

use axum::extract::State;
use axum::Json;
use recruit_models::{ProfileResponse, ProfileUpdate};

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::handlers::JsonBody;
use crate::state::AppState;

/// `GET /profile/`
pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<ProfileResponse>> {
    Ok(Json(state.accounts.get_profile(&user.user).await?))
}

/// `PATCH /profile/` and `PUT /profile/`. Both are partial updates.
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(update): JsonBody<ProfileUpdate>,
) -> ApiResult<Json<ProfileResponse>> {
    Ok(Json(state.accounts.update_profile(&user.user, update).await?))
}

/// `GET /user-info/`
pub async fn user_info(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<ProfileResponse>> {
    Ok(Json(state.accounts.user_info(&user.user).await?))
}

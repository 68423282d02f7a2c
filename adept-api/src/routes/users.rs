/// Profile management endpoints
///
/// # Endpoints
///
/// - `PUT /v1/users/profile` - Update the authenticated user's display name

use crate::{
    app::AppState,
    error::{validation_details, ApiError, ApiResult},
    routes::auth::UserResponse,
};
use adept_shared::{auth::middleware::AuthContext, models::user::User};
use axum::{extract::State, Extension, Json};
use serde::Deserialize;
use validator::Validate;

/// Profile update request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    /// New display name; null clears it
    #[validate(length(max = 50, message = "Username must be at most 50 characters"))]
    pub username: Option<String>,
}

/// Updates the authenticated user's profile
///
/// Only the display name is mutable; email and credentials are fixed at
/// registration.
///
/// # Errors
///
/// - `401 Unauthorized`: Missing or invalid token
/// - `422 Unprocessable Entity`: Validation failed
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<UserResponse>> {
    req.validate().map_err(validation_details)?;

    let user = User::update_username(&state.db, auth.user_id, req.username)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Account no longer exists".to_string()))?;

    Ok(Json(user.into()))
}

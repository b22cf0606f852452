use axum::{extract::State, response::IntoResponse, Extension, Json};
use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    middleware_layer::auth::AuthUser,
    models::user::User,
    response::MessageResponse,
    services::profile as profile_service,
    state::AppState,
    validation::{auth::*, json::ValidatedJson},
};

/// The request payload for a profile update.
#[derive(Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[garde(length(min = 3, max = 32), custom(validate_username))]
    pub username: String,
    #[garde(email)]
    pub email: String,
    #[garde(length(min = 8, max = 128), custom(validate_password))]
    pub password: String,
}

#[derive(Serialize)]
pub struct ProfileResponse {
    pub user: User,
}

#[derive(Serialize)]
pub struct ProfileUpdatedResponse {
    pub message: String,
    pub user: User,
}

/// Returns the caller's profile.
pub async fn info(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    let user = profile_service::info(&state, auth.user_id).await?;
    Ok(Json(ProfileResponse { user }))
}

/// Updates the caller's profile.
pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ValidatedJson(payload): ValidatedJson<UpdateProfileRequest>,
) -> Result<impl IntoResponse> {
    let user = profile_service::update(
        &state,
        auth.user_id,
        payload.username,
        payload.email,
        payload.password,
    )
    .await?;

    Ok(Json(ProfileUpdatedResponse {
        message: "profile updated".to_string(),
        user,
    }))
}

/// Deletes the caller's account and revokes its peers.
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    profile_service::delete(&state, auth.user_id).await?;
    Ok(Json(MessageResponse::new("account deleted")))
}

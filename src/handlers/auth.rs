use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    middleware_layer::auth::AuthUser,
    models::user::User,
    response::{DataResponse, MessageResponse},
    services::auth as auth_service,
    state::AppState,
    validation::{auth::*, json::ValidatedJson},
};

/// The request payload for user registration.
#[derive(Deserialize, Validate)]
pub struct RegisterRequest {
    #[garde(length(min = 3, max = 32), custom(validate_username))]
    pub username: String,
    #[garde(email)]
    pub email: String,
    #[garde(length(min = 8, max = 128), custom(validate_password))]
    pub password: String,
}

/// The request payload for user login.
#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[garde(email)]
    pub email: String,
    #[garde(length(min = 1, max = 128))]
    pub password: String,
}

/// The response payload for register and login.
#[derive(Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

/// Handles user registration.
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse> {
    tracing::info!("📝 Register attempt for: {}", payload.username);

    let (user, token) =
        auth_service::register(&state, payload.username, payload.email, payload.password).await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: AuthResponse { user, token },
        }),
    ))
}

/// Handles user login.
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse> {
    tracing::info!("🔑 Login attempt for: {}", payload.email);

    let (user, token) = auth_service::login(&state, payload.email, payload.password).await?;

    Ok(Json(DataResponse {
        data: AuthResponse { user, token },
    }))
}

/// Handles user logout by revoking every token of the caller.
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    auth_service::logout(&state, auth.user_id).await?;

    Ok(Json(DataResponse {
        data: MessageResponse::new("logged out"),
    }))
}

use crate::error::{AppError, Result};
use crate::models::user::User;
use crate::services::auth::hash_password_blocking;
use crate::state::AppState;

/// Returns the caller's user record.
pub async fn info(state: &AppState, user_id: i64) -> Result<User> {
    state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("user not found".to_string()))
}

/// Replaces the caller's username, email and password.
///
/// The session secret is left alone, so the caller's token stays valid.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `user_id` - The authenticated user.
/// * `username` - The new username.
/// * `email` - The new email address.
/// * `password` - The new password, hashed before storage.
///
/// # Returns
///
/// A `Result` containing the updated `User`.
pub async fn update(
    state: &AppState,
    user_id: i64,
    username: String,
    email: String,
    password: String,
) -> Result<User> {
    tracing::debug!("✏️ Updating profile of user {}", user_id);

    if let Some(other) = state.users.find_by_email(&email).await? {
        if other.id != user_id {
            return Err(AppError::Conflict("email already registered".to_string()));
        }
    }
    if let Some(other) = state.users.find_by_username(&username).await? {
        if other.id != user_id {
            return Err(AppError::Conflict("username already taken".to_string()));
        }
    }

    let password_hash = hash_password_blocking(password).await?;

    let user = state
        .users
        .update_profile(user_id, &username, &email, &password_hash)
        .await?
        .ok_or_else(|| AppError::NotFound("user not found".to_string()))?;

    tracing::info!("✅ Profile updated for user {}", user_id);
    Ok(user)
}

/// Revokes the caller's peers, then soft-deletes the account.
pub async fn delete(state: &AppState, user_id: i64) -> Result<()> {
    tracing::info!("🗑️ Deleting user {}", user_id);

    state.provisioner.revoke_all(user_id).await?;
    state.users.soft_delete(user_id).await?;

    tracing::info!("✅ User {} deleted", user_id);
    Ok(())
}

use crate::crypto::session::generate_session_secret;
use crate::error::{AppError, Result};
use crate::models::user::{NewUser, User};
use crate::state::AppState;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder,
};
use rand::{rngs::OsRng, RngCore};
use zeroize::Zeroize;

/// The memory cost for Argon2 in MB.
const ARGON2_MEMORY_MB: u32 = 19;
/// The number of iterations for Argon2.
const ARGON2_ITERATIONS: u32 = 3;
/// The parallelism factor for Argon2.
const ARGON2_PARALLELISM: u32 = 6;

/// Shared by unknown email and wrong password.
const INVALID_CREDENTIALS: &str = "invalid credentials";

/// Hashes a password using Argon2id.
///
/// # Arguments
///
/// * `password` - The password to hash.
///
/// # Returns
///
/// A `Result` containing the PHC-encoded hash.
pub fn hash_password(password: &str) -> Result<String> {
    let mut password_bytes = password.as_bytes().to_vec();

    let mut salt_bytes = [0u8; 16];
    OsRng.try_fill_bytes(&mut salt_bytes)
        .map_err(|e| AppError::Internal(format!("Failed to generate salt: {}", e)))?;

    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| AppError::Internal(format!("Salt encoding error: {}", e)))?;

    let argon2 = Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        ParamsBuilder::new()
            .m_cost(ARGON2_MEMORY_MB * 1024)
            .t_cost(ARGON2_ITERATIONS)
            .p_cost(ARGON2_PARALLELISM)
            .build()
            .map_err(|e| AppError::Internal(format!("Argon2 params: {}", e)))?,
    );

    let password_hash = argon2
        .hash_password(&password_bytes, &salt)
        .map_err(|e| AppError::Internal(format!("Argon2 hash error: {}", e)))?
        .to_string();

    password_bytes.zeroize();
    tracing::debug!("Password hashed successfully with Argon2");
    Ok(password_hash)
}

/// Verifies a password against a hash.
///
/// # Arguments
///
/// * `password` - The password to verify.
/// * `hash` - The hash to verify against.
///
/// # Returns
///
/// A `Result` containing `true` if the password is valid, `false` otherwise.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let mut password_bytes = password.as_bytes().to_vec();
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("Hash parse error: {}", e)))?;
    let argon2 = Argon2::default();
    let result = argon2
        .verify_password(&password_bytes, &parsed_hash)
        .is_ok();

    password_bytes.zeroize();
    tracing::debug!("Password verification completed");
    Ok(result)
}

/// Runs the Argon2 hash off the async worker threads.
pub async fn hash_password_blocking(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || {
        let mut password = password;
        let hashed = hash_password(&password);
        password.zeroize();
        hashed
    })
    .await
    .map_err(|e| AppError::Internal(format!("Hashing task failed: {}", e)))?
}

async fn verify_password_blocking(password: String, hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || {
        let mut password = password;
        let verified = verify_password(&password, &hash);
        password.zeroize();
        verified
    })
    .await
    .map_err(|e| AppError::Internal(format!("Verification task failed: {}", e)))?
}

/// Creates a new user and issues its first token.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `username` - The user's username.
/// * `email` - The user's email address.
/// * `password` - The user's password.
///
/// # Returns
///
/// A `Result` containing the created `User` and a bearer token.
pub async fn register(
    state: &AppState,
    username: String,
    email: String,
    password: String,
) -> Result<(User, String)> {
    tracing::debug!("🔐 Registering user: {}", username);

    if state.users.find_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("email already registered".to_string()));
    }
    if state.users.find_by_username(&username).await?.is_some() {
        return Err(AppError::Conflict("username already taken".to_string()));
    }

    let password_hash = hash_password_blocking(password).await?;
    let session_secret = generate_session_secret()?;

    let user = state
        .users
        .create(NewUser {
            username,
            email,
            password_hash,
            session_secret,
        })
        .await?;

    let token = state.authenticator.issue(&user)?;

    tracing::info!("✅ User created with ID: {}", user.id);
    Ok((user, token))
}

/// Authenticates a user by email and password.
///
/// A successful login rotates the session secret, so tokens issued before it
/// stop working.
///
/// # Returns
///
/// A `Result` containing the `User` and a fresh bearer token.
pub async fn login(state: &AppState, email: String, password: String) -> Result<(User, String)> {
    tracing::debug!("🔐 Authenticating user: {}", email);

    let mut user = state
        .users
        .find_by_email(&email)
        .await?
        .ok_or_else(|| AppError::Authentication(INVALID_CREDENTIALS.to_string()))?;

    if !verify_password_blocking(password, user.password_hash.clone()).await? {
        return Err(AppError::Authentication(INVALID_CREDENTIALS.to_string()));
    }

    user.session_secret = state.authenticator.rotate(user.id).await?;
    let token = state.authenticator.issue(&user)?;

    tracing::info!("✅ User authenticated: {}", user.id);
    Ok((user, token))
}

/// Revokes every outstanding token of `user_id`.
pub async fn logout(state: &AppState, user_id: i64) -> Result<()> {
    state.authenticator.rotate(user_id).await?;
    tracing::info!("👋 User logged out: {}", user_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_verify_only_the_original_password() {
        let hash = hash_password("correct horse battery").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse battery", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn identical_passwords_get_distinct_salts() {
        assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
    }

    #[test]
    fn malformed_hashes_are_errors() {
        assert!(verify_password("x", "not-a-phc-string").is_err());
    }
}

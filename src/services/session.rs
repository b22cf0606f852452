use std::sync::Arc;

use zeroize::Zeroizing;

use crate::auth::token::{self, TokenError};
use crate::crypto::session::generate_session_secret;
use crate::error::{AppError, Result};
use crate::models::user::User;
use crate::repositories::user::UserRepository;

/// Message for every rejected bearer token.
const UNAUTHENTICATED: &str = "invalid or expired token";

/// Issues and verifies bearer tokens bound to each user's session secret.
#[derive(Clone)]
pub struct SessionAuthenticator {
    global_secret: Zeroizing<String>,
    users: Arc<dyn UserRepository>,
}

impl SessionAuthenticator {
    pub fn new(global_secret: Zeroizing<String>, users: Arc<dyn UserRepository>) -> Self {
        Self { global_secret, users }
    }

    /// Issues a token for `user` under its current session secret.
    pub fn issue(&self, user: &User) -> Result<String> {
        token::issue(user.id, &user.session_secret, &self.global_secret).map_err(|e| match e {
            TokenError::EmptySecret => AppError::Misconfiguration(e.to_string()),
            other => AppError::Internal(format!("Failed to sign token: {}", other)),
        })
    }

    /// Resolves an `Authorization` header value to a user id.
    ///
    /// # Arguments
    ///
    /// * `header` - The raw header value, if the request carried one.
    ///
    /// # Returns
    ///
    /// The authenticated user's id. Every client-side failure yields the same
    /// `Authentication` error.
    pub async fn authenticate(&self, header: Option<&str>) -> Result<i64> {
        if self.global_secret.is_empty() {
            return Err(AppError::Misconfiguration("JWT secret is empty".to_string()));
        }

        let token = header
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                tracing::debug!("❌ Missing or malformed Authorization header");
                AppError::Authentication(UNAUTHENTICATED.to_string())
            })?;

        let claimed = token::extract_claimed_subject(token).map_err(|e| {
            tracing::debug!("❌ Unreadable token: {}", e);
            AppError::Authentication(UNAUTHENTICATED.to_string())
        })?;

        let user = self.users.find_by_id(claimed).await?.ok_or_else(|| {
            tracing::debug!("❌ Token names unknown user {}", claimed);
            AppError::Authentication(UNAUTHENTICATED.to_string())
        })?;

        let claims = token::verify(token, &user.session_secret, &self.global_secret, claimed)
            .map_err(|e| match e {
                TokenError::EmptySecret => AppError::Misconfiguration(e.to_string()),
                other => {
                    tracing::debug!("❌ Token rejected for user {}: {}", claimed, other);
                    AppError::Authentication(UNAUTHENTICATED.to_string())
                }
            })?;

        Ok(claims.user_id)
    }

    /// Replaces the user's session secret, revoking all outstanding tokens.
    ///
    /// # Returns
    ///
    /// The new secret.
    pub async fn rotate(&self, user_id: i64) -> Result<String> {
        let secret = generate_session_secret()?;
        self.users.update_session_secret(user_id, &secret).await?;
        tracing::debug!("🔄 Session secret rotated for user {}", user_id);
        Ok(secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::NewUser;
    use crate::repositories::memory::MemoryStore;

    async fn setup(global: &str) -> (SessionAuthenticator, MemoryStore, User) {
        let store = MemoryStore::new();
        let user = store
            .create(NewUser {
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                password_hash: "unused".to_string(),
                session_secret: generate_session_secret().unwrap(),
            })
            .await
            .unwrap();
        let authenticator =
            SessionAuthenticator::new(Zeroizing::new(global.to_string()), Arc::new(store.clone()));
        (authenticator, store, user)
    }

    #[tokio::test]
    async fn issued_tokens_authenticate() {
        let (auth, _, user) = setup("global").await;
        let header = format!("Bearer {}", auth.issue(&user).unwrap());

        assert_eq!(auth.authenticate(Some(&header)).await.unwrap(), user.id);
    }

    #[tokio::test]
    async fn missing_or_malformed_headers_are_unauthenticated() {
        let (auth, _, user) = setup("global").await;
        let token = auth.issue(&user).unwrap();

        for header in [None, Some(""), Some("Bearer "), Some(token.as_str()), Some("Basic abc")] {
            assert!(matches!(
                auth.authenticate(header).await,
                Err(AppError::Authentication(_))
            ));
        }
    }

    #[tokio::test]
    async fn rotation_revokes_outstanding_tokens() {
        let (auth, store, user) = setup("global").await;
        let header = format!("Bearer {}", auth.issue(&user).unwrap());

        auth.rotate(user.id).await.unwrap();

        assert!(matches!(
            auth.authenticate(Some(&header)).await,
            Err(AppError::Authentication(_))
        ));

        let refreshed = UserRepository::find_by_id(&store, user.id).await.unwrap().unwrap();
        let header = format!("Bearer {}", auth.issue(&refreshed).unwrap());
        assert!(auth.authenticate(Some(&header)).await.is_ok());
    }

    #[tokio::test]
    async fn deleted_users_are_unauthenticated() {
        let (auth, store, user) = setup("global").await;
        let header = format!("Bearer {}", auth.issue(&user).unwrap());

        store.soft_delete(user.id).await.unwrap();

        assert!(matches!(
            auth.authenticate(Some(&header)).await,
            Err(AppError::Authentication(_))
        ));
    }

    #[tokio::test]
    async fn empty_global_secret_is_a_misconfiguration() {
        let (auth, _, user) = setup("").await;

        assert!(matches!(auth.issue(&user), Err(AppError::Misconfiguration(_))));
        assert!(matches!(
            auth.authenticate(Some("Bearer anything")).await,
            Err(AppError::Misconfiguration(_))
        ));
        assert!(matches!(auth.authenticate(None).await, Err(AppError::Misconfiguration(_))));
    }
}

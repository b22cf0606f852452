use async_trait::async_trait;

use crate::{
    db::{map_unique_violation, PgStore},
    error::Result,
    models::user::{NewUser, User},
};

/// Storage operations on users. Soft-deleted users are invisible to every lookup.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Inserts a user; a duplicate live email or username is a `Conflict`.
    async fn create(&self, user: NewUser) -> Result<User>;

    async fn find_by_id(&self, id: i64) -> Result<Option<User>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Replaces the session secret, revoking every token signed with the old one.
    async fn update_session_secret(&self, id: i64, session_secret: &str) -> Result<()>;

    async fn update_profile(
        &self,
        id: i64,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<Option<User>>;

    async fn soft_delete(&self, id: i64) -> Result<()>;
}

const USER_COLUMNS: &str =
    "id, username, email, password_hash, session_secret, created_at, updated_at";

#[async_trait]
impl UserRepository for PgStore {
    async fn create(&self, user: NewUser) -> Result<User> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                &format!(
                    r#"
                    INSERT INTO users (username, email, password_hash, session_secret)
                    VALUES ($1, $2, $3, $4)
                    RETURNING {USER_COLUMNS}
                    "#
                ),
                &[&user.username, &user.email, &user.password_hash, &user.session_secret],
            )
            .await
            .map_err(|e| map_unique_violation(e, "user"))?;
        User::try_from(&row)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                &format!(
                    r#"
                    SELECT {USER_COLUMNS}
                    FROM users
                    WHERE id = $1 AND deleted_at IS NULL
                    "#
                ),
                &[&id],
            )
            .await?;
        row.as_ref().map(User::try_from).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                &format!(
                    r#"
                    SELECT {USER_COLUMNS}
                    FROM users
                    WHERE email = $1 AND deleted_at IS NULL
                    "#
                ),
                &[&email],
            )
            .await?;
        row.as_ref().map(User::try_from).transpose()
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                &format!(
                    r#"
                    SELECT {USER_COLUMNS}
                    FROM users
                    WHERE username = $1 AND deleted_at IS NULL
                    "#
                ),
                &[&username],
            )
            .await?;
        row.as_ref().map(User::try_from).transpose()
    }

    async fn update_session_secret(&self, id: i64, session_secret: &str) -> Result<()> {
        let client = self.pool.get().await?;
        client
            .execute(
                r#"
                UPDATE users
                SET session_secret = $1, updated_at = NOW()
                WHERE id = $2 AND deleted_at IS NULL
                "#,
                &[&session_secret, &id],
            )
            .await?;
        Ok(())
    }

    async fn update_profile(
        &self,
        id: i64,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<Option<User>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                &format!(
                    r#"
                    UPDATE users
                    SET username = $1, email = $2, password_hash = $3, updated_at = NOW()
                    WHERE id = $4 AND deleted_at IS NULL
                    RETURNING {USER_COLUMNS}
                    "#
                ),
                &[&username, &email, &password_hash, &id],
            )
            .await
            .map_err(|e| map_unique_violation(e, "user"))?;
        row.as_ref().map(User::try_from).transpose()
    }

    async fn soft_delete(&self, id: i64) -> Result<()> {
        let client = self.pool.get().await?;
        client
            .execute(
                r#"
                UPDATE users
                SET deleted_at = NOW(), updated_at = NOW()
                WHERE id = $1 AND deleted_at IS NULL
                "#,
                &[&id],
            )
            .await?;
        Ok(())
    }
}

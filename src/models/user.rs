use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_postgres::Row;

use crate::db::column;
use crate::error::{AppError, Result};

/// Represents a user in the system.
#[derive(Clone, Debug, Serialize)]
pub struct User {
    /// The unique identifier for the user.
    pub id: i64,
    /// The user's username.
    pub username: String,
    /// The user's email address.
    pub email: String,
    /// The user's Argon2id password hash.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Per-user half of the token signing key, re-rolled on every login.
    #[serde(skip_serializing)]
    pub session_secret: String,
    /// The timestamp when the user was created.
    pub created_at: DateTime<Utc>,
    /// The timestamp when the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<&Row> for User {
    type Error = AppError;

    fn try_from(row: &Row) -> Result<Self> {
        Ok(Self {
            id: column(row, "id")?,
            username: column(row, "username")?,
            email: column(row, "email")?,
            password_hash: column(row, "password_hash")?,
            session_secret: column(row, "session_secret")?,
            created_at: column(row, "created_at")?,
            updated_at: column(row, "updated_at")?,
        })
    }
}

/// The fields needed to insert a user.
#[derive(Debug)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub session_secret: String,
}

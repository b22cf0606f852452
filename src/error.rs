use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// The application's error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// A database error.
    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    /// A connection pool error.
    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    /// A row lacked an expected column or held the wrong type.
    #[error("Missing data: {0}")]
    MissingData(String),

    /// An authentication error.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// A resource not found error.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A conflicting resource already exists.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A remote host rejected or failed a provisioning command.
    #[error("Remote provisioning error: {0}")]
    RemoteProvisioning(String),

    /// A durable write failed after remote state was changed.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The server is configured in a way that makes the request unsafe to serve.
    #[error("Misconfiguration: {0}")]
    Misconfiguration(String),

    /// A key generation or sealing error.
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// An internal server error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Errors raised by the local cryptographic primitives.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// The OS random source failed.
    #[error("random source failure: {0}")]
    Random(String),

    /// Key material had the wrong shape.
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    /// The AEAD cipher failed.
    #[error("cipher failure: {0}")]
    Cipher(String),
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }

            AppError::Pool(ref e) => {
                tracing::error!("Pool error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }

            AppError::MissingData(ref msg) => {
                tracing::error!("Missing data: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }

            AppError::Authentication(ref msg) => {
                tracing::warn!("Authentication failed: {}", msg);
                (StatusCode::UNAUTHORIZED, msg.clone())
            }

            AppError::NotFound(ref msg) => {
                tracing::debug!("Not found: {}", msg);
                (StatusCode::NOT_FOUND, msg.clone())
            }

            AppError::Conflict(ref msg) => {
                tracing::debug!("Conflict: {}", msg);
                (StatusCode::CONFLICT, msg.clone())
            }

            AppError::Validation(ref msg) => {
                tracing::debug!("Validation error: {}", msg);
                (StatusCode::BAD_REQUEST, msg.clone())
            }

            AppError::RemoteProvisioning(ref msg) => {
                tracing::error!("Remote provisioning error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "failed to add peer on VPN host".to_string(),
                )
            }

            AppError::Persistence(ref msg) => {
                tracing::error!("Persistence error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "failed to save peer".to_string())
            }

            AppError::Misconfiguration(ref msg) => {
                tracing::error!("Misconfiguration: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "server misconfiguration".to_string())
            }

            AppError::Crypto(ref e) => {
                tracing::error!("Crypto error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "failed to generate keys".to_string())
            }

            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = sonic_rs::to_string(&sonic_rs::json!({
            "error": message
        }))
        .unwrap_or_else(|_| r#"{"error":"Internal server error"}"#.to_string());

        (
            status,
            [(http::header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response()
    }
}

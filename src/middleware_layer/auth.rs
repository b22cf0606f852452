use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::Response,
};

use crate::{error::AppError, state::AppState};

/// The authenticated caller, inserted into the request extensions.
#[derive(Clone, Copy, Debug)]
pub struct AuthUser {
    pub user_id: i64,
}

/// Extracts the raw `Authorization` header value.
///
/// # Arguments
///
/// * `request` - The incoming request.
///
/// # Returns
///
/// An `Option` containing the header value if present and valid ASCII.
fn extract_authorization(request: &Request<Body>) -> Option<String> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

/// A middleware that requires a valid bearer token.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `request` - The incoming request.
/// * `next` - The next middleware in the chain.
///
/// # Returns
///
/// A `Response`, or the `AppError` that rejected the token.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    tracing::debug!("🔐 Checking authentication...");

    let authorization = extract_authorization(&request);
    let user_id = state
        .authenticator
        .authenticate(authorization.as_deref())
        .await?;

    tracing::debug!("✅ User authenticated: {}", user_id);

    request.extensions_mut().insert(AuthUser { user_id });

    Ok(next.run(request).await)
}

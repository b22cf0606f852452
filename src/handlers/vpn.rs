use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use garde::Validate;
use serde::Deserialize;

use crate::{
    error::{AppError, Result},
    middleware_layer::auth::AuthUser,
    response::{DataResponse, MessageResponse},
    state::AppState,
    validation::json::ValidatedJson,
};

/// The request payload for connect and disconnect.
#[derive(Deserialize, Validate)]
pub struct ServerRequest {
    #[garde(range(min = 1))]
    pub server_id: i64,
}

/// Lists the active VPN servers.
pub async fn servers(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let servers = state.servers.list_active().await?;
    Ok(Json(DataResponse { data: servers }))
}

/// Provisions a peer on the requested server.
///
/// The work runs on its own task so that a client hanging up mid-request
/// cannot abort it between the remote change and the database write.
pub async fn connect(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ValidatedJson(payload): ValidatedJson<ServerRequest>,
) -> Result<impl IntoResponse> {
    tracing::info!("🔌 Connect: user {} to server {}", auth.user_id, payload.server_id);

    let provisioner = state.provisioner.clone();
    let outcome = tokio::spawn(async move { provisioner.connect(auth.user_id, payload.server_id).await })
        .await
        .map_err(|e| AppError::Internal(format!("Connect task failed: {}", e)))??;

    Ok((StatusCode::CREATED, Json(DataResponse { data: outcome })))
}

/// Removes the caller's peer from the requested server.
pub async fn disconnect(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ValidatedJson(payload): ValidatedJson<ServerRequest>,
) -> Result<impl IntoResponse> {
    tracing::info!("🔌 Disconnect: user {} from server {}", auth.user_id, payload.server_id);

    let provisioner = state.provisioner.clone();
    tokio::spawn(async move { provisioner.disconnect(auth.user_id, payload.server_id).await })
        .await
        .map_err(|e| AppError::Internal(format!("Disconnect task failed: {}", e)))??;

    Ok(Json(DataResponse {
        data: MessageResponse::new("disconnected"),
    }))
}

/// Lists the caller's active connections.
pub async fn status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    let peers = state.provisioner.status(auth.user_id).await;
    Ok(Json(DataResponse { data: peers }))
}

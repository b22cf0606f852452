use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};

use crate::{handlers, middleware_layer, state::AppState};

/// Builds the API router: public auth routes plus bearer-protected routes.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/profile/info", get(handlers::profile::info))
        .route("/profile/update", put(handlers::profile::update))
        .route("/profile/delete", delete(handlers::profile::delete))
        .route("/vpn/servers", get(handlers::vpn::servers))
        .route("/vpn/connect", post(handlers::vpn::connect))
        .route("/vpn/disconnect", post(handlers::vpn::disconnect))
        .route("/vpn/status", get(handlers::vpn::status))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::auth::require_auth,
        ))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}

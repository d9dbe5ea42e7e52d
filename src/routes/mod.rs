// Route modules
pub mod auth;
pub mod purchases;
pub mod subscriptions;

use crate::{
    app_state::AppState,
    middleware::{jwt_auth_middleware, logging_middleware},
};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_v1_routes(state.clone()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// API v1 routes
fn api_v1_routes(state: AppState) -> Router<AppState> {
    // Entitlement routes require a session token
    let protected_routes = Router::new()
        .route("/purchases", post(purchases::create_purchase))
        .route(
            "/subscriptions",
            post(subscriptions::create_subscription).get(subscriptions::list_subscriptions),
        )
        .route(
            "/subscriptions/current",
            get(subscriptions::current_subscription),
        )
        .route("/restore", post(subscriptions::restore_transactions))
        .route("/auth/refresh", post(auth::refresh_token))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_middleware,
        ));

    // Public routes (no authentication required)
    let public_routes = Router::new().route("/auth/anonymous", post(auth::anonymous_sign_in));

    // Combine all routes with request/response body logging
    Router::new()
        .merge(protected_routes)
        .merge(public_routes)
        .layer(middleware::from_fn(logging_middleware))
}

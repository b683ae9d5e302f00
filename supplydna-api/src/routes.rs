//! API route configuration.

use std::sync::Arc;

use axum::{
    http::StatusCode,
    routing::{get, post, MethodRouter},
    Router,
};

use supplydna_core::constants::{LOCAL_UPLOAD_PATH, UPLOAD_PATH};

use crate::handlers;
use crate::state::AppState;

fn upload_route() -> MethodRouter<Arc<AppState>> {
    post(handlers::upload)
        .options(|| async { StatusCode::OK })
        .fallback(handlers::method_not_allowed)
}

/// Creates the API router with all routes configured.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))

        // Upload proxy (deployed and local development paths)
        .route(UPLOAD_PATH, upload_route())
        .route(LOCAL_UPLOAD_PATH, upload_route())

        .with_state(state)
}

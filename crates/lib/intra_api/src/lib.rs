//! # intra_api
//!
//! HTTP API library for Intra.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use intra_core::auth::service::AuthService;
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};

use crate::handlers::auth;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool.
    pub pool: PgPool,
    /// Auth orchestrator, wired at process start.
    pub auth: Arc<AuthService>,
}

/// Run embedded database migrations.
///
/// Delegates to `intra_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    intra_core::migrate::migrate(pool).await
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required)
    let public = Router::new()
        .route("/api/v1/auth/login", post(auth::login_handler))
        .route("/api/v1/auth/refresh", post(auth::refresh_handler));

    // Protected routes (require a Bearer access token)
    let protected = Router::new()
        .route("/api/v1/auth/me", get(auth::me_handler))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(cors)
        .with_state(state)
}

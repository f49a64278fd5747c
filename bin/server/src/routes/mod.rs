//! HTTP routes.

pub mod account;
pub mod billing;
pub mod media;
pub mod public;
pub mod webhook;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::auth;
use crate::error::ApiError;
use crate::state::AppState;

/// Builds the application router with the role gate in front of every
/// route, fallback included.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(public::healthz))
        .route("/auth/logout", post(auth::logout))
        .route("/api/me", get(account::me))
        .route(
            "/api/public/professores/{slug}",
            get(public::professor_profile),
        )
        .route("/api/media/signed-urls", post(media::signed_urls))
        .route("/api/checkout", post(billing::start_checkout))
        .route("/api/aluno/subscription", get(billing::current_subscription))
        .route("/api/webhooks/stripe", post(webhook::payment_webhook))
        .fallback(not_found)
        .layer(from_fn_with_state(state.clone(), auth::role_gate))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found() -> ApiError {
    ApiError::NotFound { resource: "Page" }
}

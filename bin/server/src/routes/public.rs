//! Unauthenticated read endpoints.

use axum::{
    Json,
    extract::{Path, State},
};
use coachdesk_access::PublicProfile;
use std::sync::Arc;

use crate::error::ApiError;
use crate::state::AppState;

/// Returns the public profile of the professor published under `slug`.
pub async fn professor_profile(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<PublicProfile>, ApiError> {
    state
        .profiles()
        .find_public_by_slug(&slug)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound {
            resource: "Profile",
        })
}

/// Liveness probe.
pub async fn healthz() -> &'static str {
    "ok"
}

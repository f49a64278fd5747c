//! Signed media endpoint.

use axum::{Json, extract::State};
use coachdesk_media::SignedUrls;
use std::sync::Arc;

use crate::auth::RequireUser;
use crate::state::AppState;

/// Signs a batch of private media paths for the calling user.
///
/// Answers with one entry per distinct path; paths that could not be signed
/// map to `null`.
pub async fn signed_urls(
    State(state): State<Arc<AppState>>,
    RequireUser(user): RequireUser,
    Json(paths): Json<Vec<String>>,
) -> Json<SignedUrls> {
    tracing::debug!(subject_id = %user.subject_id, count = paths.len(), "Signing media batch");
    Json(state.media.sign_batch(&paths).await)
}

//! The caller's own account.

use axum::Json;
use coachdesk_access::AuthenticatedUser;

use crate::auth::RequireUser;

/// Returns who the caller is and which role they hold.
pub async fn me(RequireUser(user): RequireUser) -> Json<AuthenticatedUser> {
    Json(user)
}

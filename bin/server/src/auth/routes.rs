//! Session routes.

use axum::{
    extract::State,
    response::{IntoResponse, Redirect},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;
use time::Duration as TimeDuration;

use crate::state::AppState;

/// Logs out by expiring the session cookie.
///
/// The provider-side session is left to expire on its own.
pub async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> impl IntoResponse {
    let remove_session = Cookie::build((state.settings.session_cookie.clone(), ""))
        .path("/")
        .http_only(true)
        .secure(state.settings.secure_cookies)
        .same_site(SameSite::Lax)
        .max_age(TimeDuration::ZERO);

    tracing::debug!("Session cookie cleared");
    (jar.add(remove_session), Redirect::to("/"))
}

//! Role gate middleware and authentication extractors for Axum.

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use coachdesk_access::{AuthenticatedUser, GateDecision, SessionToken};
use std::sync::Arc;

use crate::error::ApiError;
use crate::state::AppState;

/// Reads the session token from the session cookie, falling back to an
/// `Authorization: Bearer` header.
pub fn session_token(
    jar: &CookieJar,
    headers: &HeaderMap,
    cookie_name: &str,
) -> Option<SessionToken> {
    jar.get(cookie_name)
        .and_then(|cookie| SessionToken::new(cookie.value()))
        .or_else(|| {
            headers
                .get(AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.strip_prefix("Bearer "))
                .and_then(|token| SessionToken::new(token))
        })
}

/// Runs the role gate in front of every route.
///
/// Redirects leave before the handler runs. When the gate resolved a user,
/// it is stored in the request extensions for the extractors below.
pub async fn role_gate(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let token = session_token(&jar, request.headers(), &state.settings.session_cookie);
    let path = request.uri().path().to_string();
    let query = request.uri().query().map(str::to_string);
    let decision = state
        .gate
        .evaluate(&path, query.as_deref(), token.as_ref())
        .await;

    if let Some(location) = decision.location() {
        return Redirect::to(&location).into_response();
    }
    if let GateDecision::Proceed { user: Some(user) } = decision {
        request.extensions_mut().insert(user);
    }
    next.run(request).await
}

/// Extractor for requiring an authenticated user.
///
/// Uses the user the gate resolved when there is one, otherwise
/// authenticates the request itself. Rejects with 401.
pub struct RequireUser(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for RequireUser
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>() {
            return Ok(RequireUser(user.clone()));
        }

        let app_state = Arc::<AppState>::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);
        let token = session_token(&jar, &parts.headers, &app_state.settings.session_cookie);

        let user = app_state
            .authenticator
            .authenticate(token.as_ref())
            .await
            .map_err(|_| ApiError::Unauthorized)?;

        parts.extensions.insert(user.clone());
        Ok(RequireUser(user))
    }
}

/// Extractor for requiring an authenticated aluno. Professors get 403.
pub struct RequireAluno(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for RequireAluno
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequireUser(user) = RequireUser::from_request_parts(parts, state).await?;

        if !user.is_aluno() {
            return Err(ApiError::Forbidden {
                reason: "Aluno access required",
            });
        }

        Ok(RequireAluno(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use axum::http::header::COOKIE;

    #[test]
    fn cookie_wins_over_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("sb-access-token=from-cookie"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        let jar = CookieJar::from_headers(&headers);

        let token = session_token(&jar, &headers, "sb-access-token").expect("token");
        assert_eq!(token.expose(), "from-cookie");
    }

    #[test]
    fn bearer_header_is_the_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        let jar = CookieJar::from_headers(&headers);

        let token = session_token(&jar, &headers, "sb-access-token").expect("token");
        assert_eq!(token.expose(), "from-header");
    }

    #[test]
    fn blank_or_foreign_credentials_are_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("sb-access-token="));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        let jar = CookieJar::from_headers(&headers);

        assert!(session_token(&jar, &headers, "sb-access-token").is_none());
    }
}

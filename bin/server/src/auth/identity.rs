//! Identity-provider client.

use async_trait::async_trait;
use coachdesk_access::{AuthenticationError, Identity, Role, SessionResolver, SessionToken};
use coachdesk_core::{Result, SubjectId};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::instrument;

use crate::config::IdentityConfig;

/// The provider's `GET /user` response, reduced to what we use.
#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    app_metadata: HashMap<String, serde_json::Value>,
}

impl UserResponse {
    fn into_identity(self) -> std::result::Result<Identity, AuthenticationError> {
        let subject_id: SubjectId =
            self.id
                .parse()
                .map_err(|_| AuthenticationError::MalformedResponse {
                    reason: "user has no id".to_string(),
                })?;

        let identity = Identity::new(subject_id, self.email);
        let embedded = self
            .app_metadata
            .get("role")
            .and_then(serde_json::Value::as_str)
            .map(str::parse::<Role>);

        Ok(match embedded {
            Some(Ok(role)) => identity.with_embedded_role(role),
            Some(Err(e)) => {
                tracing::debug!(error = %e, "Ignoring embedded role");
                identity
            }
            None => identity,
        })
    }
}

/// Resolves access tokens by asking the identity provider who they belong
/// to.
#[derive(Clone)]
pub struct HttpSessionResolver {
    http: reqwest::Client,
    user_endpoint: String,
    anon_key: String,
}

impl HttpSessionResolver {
    /// Creates a resolver for the provider described by `config`.
    #[must_use]
    pub fn new(http: reqwest::Client, config: &IdentityConfig) -> Self {
        Self {
            http,
            user_endpoint: format!("{}/user", config.auth_url.trim_end_matches('/')),
            anon_key: config.anon_key.clone(),
        }
    }
}

#[async_trait]
impl SessionResolver for HttpSessionResolver {
    #[instrument(skip_all)]
    async fn resolve(&self, token: &SessionToken) -> Result<Identity, AuthenticationError> {
        let response = self
            .http
            .get(&self.user_endpoint)
            .header("apikey", &self.anon_key)
            .bearer_auth(token.expose())
            .send()
            .await
            .map_err(|e| AuthenticationError::ProviderError {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(AuthenticationError::InvalidToken {
                reason: format!("provider answered {status}"),
            }
            .into());
        }
        if !status.is_success() {
            return Err(AuthenticationError::ProviderError {
                reason: format!("provider answered {status}"),
            }
            .into());
        }

        let user: UserResponse =
            response
                .json()
                .await
                .map_err(|e| AuthenticationError::MalformedResponse {
                    reason: e.to_string(),
                })?;
        Ok(user.into_identity()?)
    }
}

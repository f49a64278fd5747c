//! Checkout sessions at the payment processor.

use async_trait::async_trait;
use coachdesk_core::{Result, SubjectId};
use serde::Deserialize;
use tracing::instrument;

use crate::error::CheckoutError;
use crate::event::{ALUNO_METADATA_KEY, PROFESSOR_METADATA_KEY};

/// What to charge and where to send the aluno afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub aluno_id: SubjectId,
    pub professor_id: SubjectId,
    pub price_id: String,
    pub customer_email: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
}

/// A checkout session the aluno can be redirected to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
    pub amount_cents: Option<i64>,
}

/// Creates checkout sessions.
#[async_trait]
pub trait CheckoutClient: Send + Sync {
    /// Starts a subscription-mode checkout for `request`.
    async fn create_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, CheckoutError>;
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
    #[serde(default)]
    amount_total: Option<i64>,
}

/// Checkout client speaking the processor's form-encoded REST API.
#[derive(Clone)]
pub struct StripeCheckoutClient {
    http: reqwest::Client,
    api_base: String,
    secret_key: String,
}

impl StripeCheckoutClient {
    /// Creates a client against `api_base` (e.g. `https://api.stripe.com/v1`).
    #[must_use]
    pub fn new(
        http: reqwest::Client,
        api_base: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
        }
    }

    fn form(request: &CheckoutRequest) -> Vec<(String, String)> {
        let aluno = request.aluno_id.to_string();
        let professor = request.professor_id.to_string();
        let mut form = vec![
            ("mode".to_string(), "subscription".to_string()),
            ("line_items[0][price]".to_string(), request.price_id.clone()),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("success_url".to_string(), request.success_url.clone()),
            ("cancel_url".to_string(), request.cancel_url.clone()),
            ("client_reference_id".to_string(), aluno.clone()),
            (format!("metadata[{ALUNO_METADATA_KEY}]"), aluno.clone()),
            (format!("metadata[{PROFESSOR_METADATA_KEY}]"), professor.clone()),
            (
                format!("subscription_data[metadata][{ALUNO_METADATA_KEY}]"),
                aluno,
            ),
            (
                format!("subscription_data[metadata][{PROFESSOR_METADATA_KEY}]"),
                professor,
            ),
        ];
        if let Some(email) = &request.customer_email {
            form.push(("customer_email".to_string(), email.clone()));
        }
        form
    }
}

#[async_trait]
impl CheckoutClient for StripeCheckoutClient {
    #[instrument(skip(self, request), fields(aluno_id = %request.aluno_id))]
    async fn create_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, CheckoutError> {
        let response = self
            .http
            .post(format!("{}/checkout/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&Self::form(request))
            .send()
            .await
            .map_err(|e| CheckoutError::Request {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CheckoutError::Rejected {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let session: SessionResponse =
            response
                .json()
                .await
                .map_err(|e| CheckoutError::MalformedResponse {
                    reason: e.to_string(),
                })?;
        let url = session.url.ok_or_else(|| CheckoutError::MalformedResponse {
            reason: "session has no url".to_string(),
        })?;

        tracing::debug!(checkout_session_id = %session.id, "Checkout session created");
        Ok(CheckoutSession {
            id: session.id,
            url,
            amount_cents: session.amount_total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CheckoutRequest {
        CheckoutRequest {
            aluno_id: SubjectId::new("a1"),
            professor_id: SubjectId::new("p1"),
            price_id: "price_123".to_string(),
            customer_email: Some("a1@example.com".to_string()),
            success_url: "https://app.example.com/aluno/assinatura?ok=1".to_string(),
            cancel_url: "https://app.example.com/aluno/assinatura".to_string(),
        }
    }

    fn value<'a>(form: &'a [(String, String)], key: &str) -> Option<&'a str> {
        form.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn form_links_session_and_subscription_to_aluno() {
        let form = StripeCheckoutClient::form(&request());
        assert_eq!(value(&form, "mode"), Some("subscription"));
        assert_eq!(value(&form, "client_reference_id"), Some("a1"));
        assert_eq!(value(&form, "metadata[aluno_id]"), Some("a1"));
        assert_eq!(value(&form, "metadata[professor_id]"), Some("p1"));
        assert_eq!(
            value(&form, "subscription_data[metadata][aluno_id]"),
            Some("a1")
        );
        assert_eq!(value(&form, "customer_email"), Some("a1@example.com"));
    }

    #[test]
    fn api_base_trailing_slash_is_trimmed() {
        let client =
            StripeCheckoutClient::new(reqwest::Client::new(), "https://api.test/v1/", "sk");
        assert_eq!(client.api_base, "https://api.test/v1");
    }
}

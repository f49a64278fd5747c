//! Webhook event parsing.
//!
//! Only the fields the router acts on are decoded. Unknown event kinds are
//! kept as [`WebhookEvent::Other`] so they can be acknowledged.

use chrono::{DateTime, Utc};
use coachdesk_core::SubjectId;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;

use crate::error::EventError;

/// Metadata key linking processor objects back to the aluno.
pub const ALUNO_METADATA_KEY: &str = "aluno_id";
/// Metadata key linking processor objects back to the professor.
pub const PROFESSOR_METADATA_KEY: &str = "professor_id";

#[derive(Debug, Deserialize)]
struct RawEvent {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    created: Option<i64>,
    data: RawData,
}

#[derive(Debug, Deserialize)]
struct RawData {
    object: serde_json::Value,
}

/// A completed checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckoutCompleted {
    /// Checkout-session id.
    pub id: String,
    /// Recurring-subscription id created by the checkout.
    #[serde(default)]
    pub subscription: Option<String>,
    #[serde(default)]
    pub client_reference_id: Option<String>,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutCompleted {
    /// The aluno this checkout was for: metadata first, then the client
    /// reference id.
    #[must_use]
    pub fn aluno_id(&self) -> Option<SubjectId> {
        metadata_subject(&self.metadata, ALUNO_METADATA_KEY).or_else(|| {
            self.client_reference_id
                .as_deref()
                .filter(|id| !id.trim().is_empty())
                .map(SubjectId::new)
        })
    }

    /// The professor linked in metadata, if any.
    #[must_use]
    pub fn professor_id(&self) -> Option<SubjectId> {
        metadata_subject(&self.metadata, PROFESSOR_METADATA_KEY)
    }
}

/// A subscription created, updated or deleted at the processor.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SubscriptionChanged {
    /// Recurring-subscription id.
    pub id: String,
    /// Processor status (`active`, `past_due`, `canceled`, ...).
    pub status: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl SubscriptionChanged {
    /// The aluno linked in metadata, if any.
    #[must_use]
    pub fn aluno_id(&self) -> Option<SubjectId> {
        metadata_subject(&self.metadata, ALUNO_METADATA_KEY)
    }
}

/// An invoice payment attempt.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InvoicePayment {
    /// Invoice id.
    pub id: String,
    #[serde(default)]
    pub subscription: Option<String>,
    #[serde(default)]
    pub amount_paid: Option<i64>,
}

/// The event kinds the router understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    CheckoutCompleted(CheckoutCompleted),
    SubscriptionUpdated(SubscriptionChanged),
    SubscriptionDeleted(SubscriptionChanged),
    InvoicePaymentSucceeded(InvoicePayment),
    InvoicePaymentFailed(InvoicePayment),
    /// Any other kind; acknowledged without effect.
    Other { kind: String },
}

impl WebhookEvent {
    /// Returns the short name used in logs.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::CheckoutCompleted(_) => "checkout_completed",
            Self::SubscriptionUpdated(_) => "subscription_updated",
            Self::SubscriptionDeleted(_) => "subscription_deleted",
            Self::InvoicePaymentSucceeded(_) => "invoice_payment_succeeded",
            Self::InvoicePaymentFailed(_) => "invoice_payment_failed",
            Self::Other { kind } => kind,
        }
    }
}

/// A parsed webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventEnvelope {
    /// Processor event id.
    pub id: String,
    /// When the processor created the event, if reported.
    pub created: Option<DateTime<Utc>>,
    pub event: WebhookEvent,
}

impl EventEnvelope {
    /// Parses a raw webhook body.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not an event, or if an event of a
    /// known kind lacks the fields that kind requires.
    pub fn parse(body: &[u8]) -> Result<Self, EventError> {
        let raw: RawEvent = serde_json::from_slice(body).map_err(invalid)?;
        let object = raw.data.object;

        let event = match raw.kind.as_str() {
            "checkout.session.completed" => WebhookEvent::CheckoutCompleted(decode(object)?),
            "customer.subscription.updated" => WebhookEvent::SubscriptionUpdated(decode(object)?),
            "customer.subscription.deleted" => WebhookEvent::SubscriptionDeleted(decode(object)?),
            "invoice.payment_succeeded" => WebhookEvent::InvoicePaymentSucceeded(decode(object)?),
            "invoice.payment_failed" => WebhookEvent::InvoicePaymentFailed(decode(object)?),
            _ => WebhookEvent::Other { kind: raw.kind },
        };

        Ok(Self {
            id: raw.id,
            created: raw
                .created
                .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)),
            event,
        })
    }
}

fn decode<T: DeserializeOwned>(object: serde_json::Value) -> Result<T, EventError> {
    serde_json::from_value(object).map_err(invalid)
}

fn invalid(e: serde_json::Error) -> EventError {
    EventError::InvalidPayload {
        reason: e.to_string(),
    }
}

fn metadata_subject(metadata: &HashMap<String, String>, key: &str) -> Option<SubjectId> {
    metadata
        .get(key)
        .filter(|id| !id.trim().is_empty())
        .map(|id| SubjectId::new(id.as_str()))
}

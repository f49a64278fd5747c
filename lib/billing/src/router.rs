//! Maps verified webhook events onto subscription transitions.

use chrono::{DateTime, Utc};
use coachdesk_core::{Result, SubscriptionId};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::error::{StoreError, WebhookError};
use crate::event::{EventEnvelope, WebhookEvent};
use crate::signature::SignatureVerifier;
use crate::subscription::{CheckoutActivation, SubscriptionStatus, SubscriptionStore};

/// What applying an event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// A checkout's subscription row is now active.
    Activated { subscription_id: SubscriptionId },
    /// Rows matching a processor subscription changed status.
    StatusChanged {
        status: SubscriptionStatus,
        rows: u64,
    },
    /// A successful payment was stamped on matching rows.
    PaymentRecorded { rows: u64 },
    /// The event was acknowledged without any write.
    Ignored { reason: &'static str },
}

/// Routes events to subscription-store writes.
#[derive(Clone)]
pub struct WebhookRouter {
    store: Arc<dyn SubscriptionStore>,
}

impl WebhookRouter {
    /// Creates a router writing to `store`.
    #[must_use]
    pub fn new(store: Arc<dyn SubscriptionStore>) -> Self {
        Self { store }
    }

    /// Applies one event. `now` stands in for events without a timestamp.
    #[instrument(skip(self, envelope, now), fields(event_id = %envelope.id, kind = envelope.event.name()))]
    pub async fn route(
        &self,
        envelope: &EventEnvelope,
        now: DateTime<Utc>,
    ) -> Result<WebhookOutcome, StoreError> {
        let at = envelope.created.unwrap_or(now);

        match &envelope.event {
            WebhookEvent::CheckoutCompleted(checkout) => {
                let Some(aluno_id) = checkout.aluno_id() else {
                    warn!(checkout_session_id = %checkout.id, "Checkout has no aluno reference");
                    return Ok(WebhookOutcome::Ignored {
                        reason: "checkout without aluno reference",
                    });
                };

                let subscription = self
                    .store
                    .activate_checkout(&CheckoutActivation {
                        aluno_id,
                        professor_id: checkout.professor_id(),
                        checkout_session_id: checkout.id.clone(),
                        provider_subscription_id: checkout.subscription.clone(),
                        amount_cents: checkout.amount_total,
                        paid_at: at,
                    })
                    .await?;

                info!(
                    subscription_id = %subscription.id,
                    aluno_id = %subscription.aluno_id,
                    "Subscription activated"
                );
                Ok(WebhookOutcome::Activated {
                    subscription_id: subscription.id,
                })
            }
            WebhookEvent::SubscriptionUpdated(changed) => {
                let Some(aluno_id) = changed.aluno_id() else {
                    info!(provider_subscription_id = %changed.id, "Update without aluno metadata");
                    return Ok(WebhookOutcome::Ignored {
                        reason: "subscription without aluno metadata",
                    });
                };

                let status = SubscriptionStatus::from_processor(&changed.status);
                let rows = self
                    .store
                    .set_status(&changed.id, Some(&aluno_id), status)
                    .await?;
                info!(%status, rows, "Subscription status updated");
                Ok(WebhookOutcome::StatusChanged { status, rows })
            }
            WebhookEvent::SubscriptionDeleted(changed) => {
                let status = SubscriptionStatus::Cancelled;
                let rows = self
                    .store
                    .set_status(&changed.id, changed.aluno_id().as_ref(), status)
                    .await?;
                info!(rows, "Subscription cancelled");
                Ok(WebhookOutcome::StatusChanged { status, rows })
            }
            WebhookEvent::InvoicePaymentSucceeded(invoice) => {
                let Some(subscription) = &invoice.subscription else {
                    return Ok(WebhookOutcome::Ignored {
                        reason: "invoice without subscription",
                    });
                };
                let rows = self.store.record_payment(subscription, at).await?;
                info!(invoice_id = %invoice.id, rows, "Payment recorded");
                Ok(WebhookOutcome::PaymentRecorded { rows })
            }
            WebhookEvent::InvoicePaymentFailed(invoice) => {
                warn!(
                    invoice_id = %invoice.id,
                    provider_subscription_id = invoice.subscription.as_deref().unwrap_or("-"),
                    "Invoice payment failed"
                );
                Ok(WebhookOutcome::Ignored {
                    reason: "payment failure is logged only",
                })
            }
            WebhookEvent::Other { kind } => {
                info!(kind = %kind, "Ignoring webhook event");
                Ok(WebhookOutcome::Ignored {
                    reason: "unhandled event kind",
                })
            }
        }
    }
}

/// Verifies, parses and routes one webhook delivery.
#[derive(Clone)]
pub struct WebhookProcessor {
    verifier: SignatureVerifier,
    router: WebhookRouter,
}

impl WebhookProcessor {
    /// Creates a processor.
    #[must_use]
    pub fn new(verifier: SignatureVerifier, router: WebhookRouter) -> Self {
        Self { verifier, router }
    }

    /// Handles a raw delivery.
    ///
    /// Nothing is parsed or written unless the signature verifies.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError::Rejected`] for a bad signature,
    /// [`WebhookError::InvalidPayload`] for an unusable body, and
    /// [`WebhookError::Persistence`] when the write fails.
    pub async fn handle(
        &self,
        body: &[u8],
        signature: Option<&str>,
        now: DateTime<Utc>,
    ) -> std::result::Result<WebhookOutcome, WebhookError> {
        self.verifier.verify(body, signature, now).map_err(|e| {
            warn!(error = %e, "Webhook signature rejected");
            WebhookError::Rejected(e)
        })?;

        let envelope = EventEnvelope::parse(body).map_err(|e| {
            warn!(error = %e, "Webhook payload rejected");
            WebhookError::InvalidPayload(e)
        })?;

        self.router.route(&envelope, now).await.map_err(|e| {
            tracing::error!(error = %e, event_id = %envelope.id, "Webhook write failed");
            WebhookError::Persistence {
                details: e.to_string(),
            }
        })
    }
}

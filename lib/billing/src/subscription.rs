//! Subscription model and storage seam.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use coachdesk_core::{Result, SubjectId, SubscriptionId};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::StoreError;

/// Paid-access state of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    /// Checkout started, payment not yet confirmed.
    Pending,
    /// Payment confirmed; the aluno has access.
    Active,
    /// The processor reports the subscription as not in good standing.
    Inactive,
    /// The processor reports the subscription as ended.
    Cancelled,
}

impl SubscriptionStatus {
    /// Returns the stored text form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Cancelled => "cancelled",
        }
    }

    /// Maps a processor subscription status onto ours.
    ///
    /// Only `active` and `trialing` grant access; everything else
    /// (`past_due`, `unpaid`, `incomplete`, ...) is inactive.
    #[must_use]
    pub fn from_processor(status: &str) -> Self {
        match status {
            "active" | "trialing" => Self::Active,
            _ => Self::Inactive,
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            // Older rows used "canceled" and "expired".
            "cancelled" | "canceled" | "expired" => Ok(Self::Cancelled),
            other => Err(StoreError::CorruptRow {
                details: format!("unknown subscription status '{other}'"),
            }),
        }
    }
}

/// A subscription row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub aluno_id: SubjectId,
    pub professor_id: Option<SubjectId>,
    pub status: SubscriptionStatus,
    /// Checkout-session id the row was created for.
    pub checkout_session_id: Option<String>,
    /// Recurring-subscription id, stamped once checkout completes.
    pub provider_subscription_id: Option<String>,
    pub amount_cents: Option<i64>,
    pub last_payment_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A checkout the aluno just started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCheckout {
    pub aluno_id: SubjectId,
    pub professor_id: Option<SubjectId>,
    pub checkout_session_id: String,
    pub amount_cents: Option<i64>,
}

/// A checkout the processor reported as paid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutActivation {
    pub aluno_id: SubjectId,
    pub professor_id: Option<SubjectId>,
    pub checkout_session_id: String,
    pub provider_subscription_id: Option<String>,
    pub amount_cents: Option<i64>,
    pub paid_at: DateTime<Utc>,
}

/// Persistence for subscriptions.
///
/// Rows are unique per `(aluno_id, checkout_session_id)`.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Inserts a `pending` row for a freshly started checkout.
    async fn insert_pending(&self, checkout: &PendingCheckout)
    -> Result<Subscription, StoreError>;

    /// Marks the row for this checkout `active`, inserting it if missing.
    ///
    /// Must be a single atomic upsert keyed by
    /// `(aluno_id, checkout_session_id)` so concurrent or repeated
    /// deliveries converge on one row.
    async fn activate_checkout(
        &self,
        activation: &CheckoutActivation,
    ) -> Result<Subscription, StoreError>;

    /// Sets the status of rows carrying `provider_subscription_id`.
    ///
    /// When `aluno_id` is given, only that aluno's rows are touched.
    /// Returns the number of rows changed.
    async fn set_status(
        &self,
        provider_subscription_id: &str,
        aluno_id: Option<&SubjectId>,
        status: SubscriptionStatus,
    ) -> Result<u64, StoreError>;

    /// Stamps the last successful payment on rows carrying
    /// `provider_subscription_id`. Returns the number of rows changed.
    async fn record_payment(
        &self,
        provider_subscription_id: &str,
        paid_at: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    /// Returns the most recently created subscription of `aluno_id`.
    async fn latest_for_aluno(
        &self,
        aluno_id: &SubjectId,
    ) -> Result<Option<Subscription>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn processor_statuses_collapse_to_active_or_inactive() {
        assert_eq!(
            SubscriptionStatus::from_processor("active"),
            SubscriptionStatus::Active
        );
        assert_eq!(
            SubscriptionStatus::from_processor("trialing"),
            SubscriptionStatus::Active
        );
        for status in ["past_due", "unpaid", "incomplete", "paused"] {
            assert_eq!(
                SubscriptionStatus::from_processor(status),
                SubscriptionStatus::Inactive
            );
        }
    }

    #[test]
    fn stored_statuses_parse() {
        assert_eq!(
            "active".parse::<SubscriptionStatus>(),
            Ok(SubscriptionStatus::Active)
        );
        assert_eq!(
            "expired".parse::<SubscriptionStatus>(),
            Ok(SubscriptionStatus::Cancelled)
        );
        assert!("gold".parse::<SubscriptionStatus>().is_err());
    }
}

//! In-memory implementations of the billing seams.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use coachdesk_core::{Result, SubjectId, SubscriptionId};
use tokio::sync::{Mutex, RwLock};

use crate::checkout::{CheckoutClient, CheckoutRequest, CheckoutSession};
use crate::error::{CheckoutError, StoreError};
use crate::subscription::{
    CheckoutActivation, PendingCheckout, Subscription, SubscriptionStatus, SubscriptionStore,
};

/// Subscription store held in memory.
///
/// Upserts run under one write lock, giving the same single-row guarantee
/// as the database's unique constraint. Optional fields of an activation
/// only overwrite stored values when present.
#[derive(Debug, Default)]
pub struct InMemorySubscriptionStore {
    rows: RwLock<Vec<Subscription>>,
    unavailable: bool,
}

impl InMemorySubscriptionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store whose every operation fails.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            rows: RwLock::default(),
            unavailable: true,
        }
    }

    /// Returns a snapshot of every row, oldest first.
    pub async fn all(&self) -> Vec<Subscription> {
        self.rows.read().await.clone()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable {
            return Err(StoreError::Database {
                details: "store unavailable".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn insert_pending(
        &self,
        checkout: &PendingCheckout,
    ) -> Result<Subscription, StoreError> {
        self.check_available()?;
        let mut rows = self.rows.write().await;
        let duplicate = rows.iter().any(|row| {
            row.aluno_id == checkout.aluno_id
                && row.checkout_session_id.as_deref() == Some(checkout.checkout_session_id.as_str())
        });
        if duplicate {
            return Err(StoreError::Database {
                details: "duplicate checkout session".to_string(),
            }
            .into());
        }

        let now = Utc::now();
        let row = Subscription {
            id: SubscriptionId::new(),
            aluno_id: checkout.aluno_id.clone(),
            professor_id: checkout.professor_id.clone(),
            status: SubscriptionStatus::Pending,
            checkout_session_id: Some(checkout.checkout_session_id.clone()),
            provider_subscription_id: None,
            amount_cents: checkout.amount_cents,
            last_payment_at: None,
            created_at: now,
            updated_at: now,
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn activate_checkout(
        &self,
        activation: &CheckoutActivation,
    ) -> Result<Subscription, StoreError> {
        self.check_available()?;
        let mut rows = self.rows.write().await;
        let now = Utc::now();

        let existing = rows.iter_mut().find(|row| {
            row.aluno_id == activation.aluno_id
                && row.checkout_session_id.as_deref()
                    == Some(activation.checkout_session_id.as_str())
        });

        if let Some(row) = existing {
            row.status = SubscriptionStatus::Active;
            if activation.provider_subscription_id.is_some() {
                row.provider_subscription_id = activation.provider_subscription_id.clone();
            }
            if activation.professor_id.is_some() {
                row.professor_id = activation.professor_id.clone();
            }
            if activation.amount_cents.is_some() {
                row.amount_cents = activation.amount_cents;
            }
            row.last_payment_at = Some(activation.paid_at);
            row.updated_at = now;
            return Ok(row.clone());
        }

        let row = Subscription {
            id: SubscriptionId::new(),
            aluno_id: activation.aluno_id.clone(),
            professor_id: activation.professor_id.clone(),
            status: SubscriptionStatus::Active,
            checkout_session_id: Some(activation.checkout_session_id.clone()),
            provider_subscription_id: activation.provider_subscription_id.clone(),
            amount_cents: activation.amount_cents,
            last_payment_at: Some(activation.paid_at),
            created_at: now,
            updated_at: now,
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn set_status(
        &self,
        provider_subscription_id: &str,
        aluno_id: Option<&SubjectId>,
        status: SubscriptionStatus,
    ) -> Result<u64, StoreError> {
        self.check_available()?;
        let mut rows = self.rows.write().await;
        let now = Utc::now();
        let mut changed = 0;
        for row in rows.iter_mut().filter(|row| {
            row.provider_subscription_id.as_deref() == Some(provider_subscription_id)
                && aluno_id.is_none_or(|id| *id == row.aluno_id)
        }) {
            row.status = status;
            row.updated_at = now;
            changed += 1;
        }
        Ok(changed)
    }

    async fn record_payment(
        &self,
        provider_subscription_id: &str,
        paid_at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        self.check_available()?;
        let mut rows = self.rows.write().await;
        let now = Utc::now();
        let mut changed = 0;
        for row in rows
            .iter_mut()
            .filter(|row| row.provider_subscription_id.as_deref() == Some(provider_subscription_id))
        {
            row.last_payment_at = Some(paid_at);
            row.updated_at = now;
            changed += 1;
        }
        Ok(changed)
    }

    async fn latest_for_aluno(
        &self,
        aluno_id: &SubjectId,
    ) -> Result<Option<Subscription>, StoreError> {
        self.check_available()?;
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .rev()
            .find(|row| row.aluno_id == *aluno_id)
            .cloned())
    }
}

/// Checkout client that records requests and hands out numbered sessions.
#[derive(Debug, Default)]
pub struct RecordingCheckoutClient {
    requests: Mutex<Vec<CheckoutRequest>>,
    failing: bool,
}

impl RecordingCheckoutClient {
    /// Creates a client that accepts every request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a client that rejects every request.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            requests: Mutex::default(),
            failing: true,
        }
    }

    /// Returns the requests received so far.
    pub async fn requests(&self) -> Vec<CheckoutRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl CheckoutClient for RecordingCheckoutClient {
    async fn create_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, CheckoutError> {
        if self.failing {
            return Err(CheckoutError::Rejected {
                status: 400,
                body: "rejected".to_string(),
            }
            .into());
        }
        let mut requests = self.requests.lock().await;
        requests.push(request.clone());
        let id = format!("cs_test_{}", requests.len());
        Ok(CheckoutSession {
            url: format!("https://checkout.example.com/pay/{id}"),
            id,
            amount_cents: Some(9900),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(aluno: &str, session: &str) -> PendingCheckout {
        PendingCheckout {
            aluno_id: SubjectId::new(aluno),
            professor_id: None,
            checkout_session_id: session.to_string(),
            amount_cents: None,
        }
    }

    #[tokio::test]
    async fn duplicate_pending_checkout_is_rejected() {
        let store = InMemorySubscriptionStore::new();
        store.insert_pending(&pending("a1", "cs_1")).await.expect("first");
        assert!(store.insert_pending(&pending("a1", "cs_1")).await.is_err());
        assert!(store.insert_pending(&pending("a1", "cs_2")).await.is_ok());
    }

    #[tokio::test]
    async fn set_status_filters_by_aluno() {
        let store = InMemorySubscriptionStore::new();
        for aluno in ["a1", "a2"] {
            store
                .activate_checkout(&CheckoutActivation {
                    aluno_id: SubjectId::new(aluno),
                    professor_id: None,
                    checkout_session_id: format!("cs_{aluno}"),
                    provider_subscription_id: Some("sub_shared".to_string()),
                    amount_cents: None,
                    paid_at: Utc::now(),
                })
                .await
                .expect("activate");
        }

        let changed = store
            .set_status(
                "sub_shared",
                Some(&SubjectId::new("a1")),
                SubscriptionStatus::Inactive,
            )
            .await
            .expect("update");
        assert_eq!(changed, 1);
    }

    #[tokio::test]
    async fn latest_for_aluno_returns_newest() {
        let store = InMemorySubscriptionStore::new();
        store.insert_pending(&pending("a1", "cs_1")).await.expect("insert");
        let newer = store.insert_pending(&pending("a1", "cs_2")).await.expect("insert");
        let latest = store
            .latest_for_aluno(&SubjectId::new("a1"))
            .await
            .expect("lookup");
        assert_eq!(latest.map(|s| s.id), Some(newer.id));
    }
}

//! Subscription repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use coachdesk_billing::{
    CheckoutActivation, PendingCheckout, StoreError, Subscription, SubscriptionStatus,
    SubscriptionStore,
};
use coachdesk_core::{Result, SubjectId, SubscriptionId};
use sqlx::{FromRow, PgPool};

const COLUMNS: &str = "id, aluno_id, professor_id, status, checkout_session_id, \
    provider_subscription_id, amount_cents, last_payment_at, created_at, updated_at";

/// Row type for subscription queries.
#[derive(FromRow)]
struct SubscriptionRow {
    id: String,
    aluno_id: String,
    professor_id: Option<String>,
    status: String,
    checkout_session_id: Option<String>,
    provider_subscription_id: Option<String>,
    amount_cents: Option<i64>,
    last_payment_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SubscriptionRow {
    fn try_into_subscription(self) -> std::result::Result<Subscription, StoreError> {
        let id: SubscriptionId = self.id.parse().map_err(|e| StoreError::CorruptRow {
            details: format!("invalid subscription id '{}': {}", self.id, e),
        })?;
        Ok(Subscription {
            id,
            aluno_id: SubjectId::new(self.aluno_id),
            professor_id: self.professor_id.map(SubjectId::new),
            status: self.status.parse::<SubscriptionStatus>()?,
            checkout_session_id: self.checkout_session_id,
            provider_subscription_id: self.provider_subscription_id,
            amount_cents: self.amount_cents,
            last_payment_at: self.last_payment_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn database(e: sqlx::Error) -> StoreError {
    StoreError::Database {
        details: e.to_string(),
    }
}

/// Repository for subscription operations.
#[derive(Clone)]
pub struct PgSubscriptionRepository {
    pool: PgPool,
}

impl PgSubscriptionRepository {
    /// Creates a new subscription repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionStore for PgSubscriptionRepository {
    async fn insert_pending(
        &self,
        checkout: &PendingCheckout,
    ) -> Result<Subscription, StoreError> {
        let row: SubscriptionRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO subscriptions (id, aluno_id, professor_id, status, checkout_session_id, amount_cents)
            VALUES ($1, $2, $3, 'pending', $4, $5)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(SubscriptionId::new().to_string())
        .bind(checkout.aluno_id.as_str())
        .bind(checkout.professor_id.as_ref().map(SubjectId::as_str))
        .bind(&checkout.checkout_session_id)
        .bind(checkout.amount_cents)
        .fetch_one(&self.pool)
        .await
        .map_err(database)?;

        Ok(row.try_into_subscription()?)
    }

    async fn activate_checkout(
        &self,
        activation: &CheckoutActivation,
    ) -> Result<Subscription, StoreError> {
        // One statement, so concurrent deliveries converge on the unique key.
        let row: SubscriptionRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO subscriptions (
                id, aluno_id, professor_id, status, checkout_session_id,
                provider_subscription_id, amount_cents, last_payment_at
            )
            VALUES ($1, $2, $3, 'active', $4, $5, $6, $7)
            ON CONFLICT (aluno_id, checkout_session_id) DO UPDATE SET
                status = 'active',
                professor_id = COALESCE(EXCLUDED.professor_id, subscriptions.professor_id),
                provider_subscription_id = COALESCE(
                    EXCLUDED.provider_subscription_id,
                    subscriptions.provider_subscription_id
                ),
                amount_cents = COALESCE(EXCLUDED.amount_cents, subscriptions.amount_cents),
                last_payment_at = EXCLUDED.last_payment_at,
                updated_at = now()
            RETURNING {COLUMNS}
            "#
        ))
        .bind(SubscriptionId::new().to_string())
        .bind(activation.aluno_id.as_str())
        .bind(activation.professor_id.as_ref().map(SubjectId::as_str))
        .bind(&activation.checkout_session_id)
        .bind(activation.provider_subscription_id.as_deref())
        .bind(activation.amount_cents)
        .bind(activation.paid_at)
        .fetch_one(&self.pool)
        .await
        .map_err(database)?;

        Ok(row.try_into_subscription()?)
    }

    async fn set_status(
        &self,
        provider_subscription_id: &str,
        aluno_id: Option<&SubjectId>,
        status: SubscriptionStatus,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = $1, updated_at = now()
            WHERE provider_subscription_id = $2
              AND ($3::TEXT IS NULL OR aluno_id = $3)
            "#,
        )
        .bind(status.as_str())
        .bind(provider_subscription_id)
        .bind(aluno_id.map(SubjectId::as_str))
        .execute(&self.pool)
        .await
        .map_err(database)?;

        Ok(result.rows_affected())
    }

    async fn record_payment(
        &self,
        provider_subscription_id: &str,
        paid_at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET last_payment_at = $1, updated_at = now()
            WHERE provider_subscription_id = $2
            "#,
        )
        .bind(paid_at)
        .bind(provider_subscription_id)
        .execute(&self.pool)
        .await
        .map_err(database)?;

        Ok(result.rows_affected())
    }

    async fn latest_for_aluno(
        &self,
        aluno_id: &SubjectId,
    ) -> Result<Option<Subscription>, StoreError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            r#"
            SELECT {COLUMNS}
            FROM subscriptions
            WHERE aluno_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#
        ))
        .bind(aluno_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(database)?;

        match row {
            Some(r) => Ok(Some(r.try_into_subscription()?)),
            None => Ok(None),
        }
    }
}

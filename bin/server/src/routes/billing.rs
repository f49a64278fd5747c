//! Aluno subscription endpoints.

use axum::{Json, extract::State};
use coachdesk_access::ProfileLookup;
use coachdesk_billing::{CheckoutRequest, PendingCheckout, Subscription};
use coachdesk_core::SubjectId;
use serde::Serialize;
use std::sync::Arc;

use crate::auth::RequireAluno;
use crate::error::ApiError;
use crate::state::AppState;

/// Where the aluno lands after checkout, relative to the public base URL.
const RETURN_PATH: &str = "/aluno/assinatura";

/// Response for a started checkout.
#[derive(Debug, Serialize)]
pub struct CheckoutStarted {
    pub checkout_url: String,
    pub session_id: String,
}

/// Starts a subscription checkout for the calling aluno.
///
/// The aluno must be linked to a professor. A `pending` row is recorded
/// for the new checkout session; the payment webhook activates it later.
pub async fn start_checkout(
    State(state): State<Arc<AppState>>,
    RequireAluno(user): RequireAluno,
) -> Result<Json<CheckoutStarted>, ApiError> {
    let professor_id = match user.professor_id.clone() {
        Some(id) => Some(id),
        None => linked_professor(&state, &user.subject_id).await?,
    }
    .ok_or_else(|| ApiError::BadRequest {
        reason: "Aluno is not linked to a professor".to_string(),
    })?;

    let base = &state.settings.public_base_url;
    let request = CheckoutRequest {
        aluno_id: user.subject_id.clone(),
        professor_id: professor_id.clone(),
        price_id: state.settings.price_id.clone(),
        customer_email: user.email.clone(),
        success_url: format!("{base}{RETURN_PATH}?status=success"),
        cancel_url: format!("{base}{RETURN_PATH}?status=cancelled"),
    };
    let session = state.checkout.create_session(&request).await?;

    state
        .subscriptions
        .insert_pending(&PendingCheckout {
            aluno_id: user.subject_id.clone(),
            professor_id: Some(professor_id),
            checkout_session_id: session.id.clone(),
            amount_cents: session.amount_cents,
        })
        .await?;

    tracing::info!(
        aluno_id = %user.subject_id,
        checkout_session_id = %session.id,
        "Checkout started"
    );
    Ok(Json(CheckoutStarted {
        checkout_url: session.url,
        session_id: session.id,
    }))
}

/// Returns the calling aluno's most recent subscription.
pub async fn current_subscription(
    State(state): State<Arc<AppState>>,
    RequireAluno(user): RequireAluno,
) -> Result<Json<Subscription>, ApiError> {
    state
        .subscriptions
        .latest_for_aluno(&user.subject_id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound {
            resource: "Subscription",
        })
}

/// Reads the professor link from the profile row. Needed when the role came
/// from the token, which carries no link.
async fn linked_professor(
    state: &AppState,
    aluno_id: &SubjectId,
) -> Result<Option<SubjectId>, ApiError> {
    Ok(match state.profiles().lookup_role(aluno_id).await? {
        ProfileLookup::Found(profile) => profile.professor_id,
        _ => None,
    })
}

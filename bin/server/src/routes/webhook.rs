//! Payment-processor webhook endpoint.

use axum::{Json, body::Bytes, extract::State, http::HeaderMap};
use chrono::Utc;
use coachdesk_billing::signature::SIGNATURE_HEADER;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::error::ApiError;
use crate::state::AppState;

/// Receives one webhook delivery.
///
/// The raw body is verified before anything is parsed. Bad signatures and
/// unusable payloads answer 400; a failed write answers 500 so the processor
/// retries.
pub async fn payment_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let outcome = state.webhooks.handle(&body, signature, Utc::now()).await?;
    tracing::debug!(?outcome, "Webhook handled");

    Ok(Json(json!({ "received": true })))
}

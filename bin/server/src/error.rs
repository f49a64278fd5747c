//! HTTP-facing error type.
//!
//! Handlers return [`ApiError`]; it renders as a JSON body
//! `{"error": "..."}` with a user-safe message. Internal details are logged
//! when the response is built and never sent to the client.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use coachdesk_access::ProfileError;
use coachdesk_billing::{CheckoutError, StoreError, WebhookError};
use rootcause::Report;
use std::fmt;

/// Errors returned by API handlers.
#[derive(Debug)]
pub enum ApiError {
    /// No usable session.
    Unauthorized,
    /// The caller's role may not use this endpoint.
    Forbidden { reason: &'static str },
    /// The requested resource does not exist.
    NotFound { resource: &'static str },
    /// The request cannot be served as sent.
    BadRequest { reason: String },
    /// A third-party service failed.
    Upstream { details: String },
    /// Anything else, including database failures.
    Internal { details: String },
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Upstream { .. } => StatusCode::BAD_GATEWAY,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message sent to the client.
    fn public_message(&self) -> String {
        match self {
            Self::Unauthorized => "Not authenticated".to_string(),
            Self::Forbidden { reason } => (*reason).to_string(),
            Self::NotFound { resource } => format!("{resource} not found"),
            Self::BadRequest { reason } => reason.clone(),
            Self::Upstream { .. } => "Upstream service unavailable".to_string(),
            Self::Internal { .. } => "Internal server error".to_string(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized => write!(f, "not authenticated"),
            Self::Forbidden { reason } => write!(f, "forbidden: {reason}"),
            Self::NotFound { resource } => write!(f, "{resource} not found"),
            Self::BadRequest { reason } => write!(f, "bad request: {reason}"),
            Self::Upstream { details } => write!(f, "upstream error: {details}"),
            Self::Internal { details } => write!(f, "internal error: {details}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::Upstream { details } => tracing::error!("Upstream failure: {}", details),
            Self::Internal { details } => tracing::error!("Internal failure: {}", details),
            _ => {}
        }

        let body = Json(serde_json::json!({ "error": self.public_message() }));
        (self.status(), body).into_response()
    }
}

impl From<Report<ProfileError>> for ApiError {
    fn from(report: Report<ProfileError>) -> Self {
        Self::Internal {
            details: report.to_string(),
        }
    }
}

impl From<Report<StoreError>> for ApiError {
    fn from(report: Report<StoreError>) -> Self {
        Self::Internal {
            details: report.to_string(),
        }
    }
}

impl From<Report<CheckoutError>> for ApiError {
    fn from(report: Report<CheckoutError>) -> Self {
        Self::Upstream {
            details: report.to_string(),
        }
    }
}

impl From<WebhookError> for ApiError {
    fn from(e: WebhookError) -> Self {
        match e {
            WebhookError::Rejected(_) => Self::BadRequest {
                reason: "Invalid signature".to_string(),
            },
            WebhookError::InvalidPayload(_) => Self::BadRequest {
                reason: "Invalid payload".to_string(),
            },
            WebhookError::Persistence { details } => Self::Internal { details },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn internal_details_stay_on_the_server() {
        let response = ApiError::Internal {
            details: "connection refused at 10.0.0.3".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let body: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(body["error"], "Internal server error");
    }

    #[test]
    fn statuses() {
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::Forbidden { reason: "x" }.status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::NotFound {
                resource: "Profile"
            }
            .status(),
            StatusCode::NOT_FOUND
        );
    }
}

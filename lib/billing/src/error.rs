//! Error types for the billing crate.
//!
//! - `SignatureError`: webhook signature verification failures
//! - `EventError`: webhook payloads that cannot be parsed
//! - `StoreError`: subscription persistence failures
//! - `CheckoutError`: payment-processor checkout failures
//! - `WebhookError`: the combined outcome of processing one delivery

use std::fmt;

/// Errors from verifying a webhook signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    /// No signature header on the request.
    MissingHeader,
    /// The header could not be parsed.
    MalformedHeader { reason: String },
    /// The signed timestamp is outside the tolerance window.
    StaleTimestamp { age_seconds: i64 },
    /// No signature in the header matches the payload.
    Mismatch,
    /// The configured secret cannot key an HMAC.
    InvalidSecret,
}

impl fmt::Display for SignatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingHeader => write!(f, "missing signature header"),
            Self::MalformedHeader { reason } => write!(f, "malformed signature header: {reason}"),
            Self::StaleTimestamp { age_seconds } => {
                write!(f, "signature timestamp outside tolerance ({age_seconds}s)")
            }
            Self::Mismatch => write!(f, "no matching signature"),
            Self::InvalidSecret => write!(f, "webhook secret is not usable"),
        }
    }
}

impl std::error::Error for SignatureError {}

/// Errors from parsing a webhook payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    /// The payload is not a well-formed event.
    InvalidPayload { reason: String },
}

impl fmt::Display for EventError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPayload { reason } => write!(f, "invalid event payload: {reason}"),
        }
    }
}

impl std::error::Error for EventError {}

/// Errors from subscription storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing database failed.
    Database { details: String },
    /// A stored row could not be decoded.
    CorruptRow { details: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Database { details } => write!(f, "subscription database error: {details}"),
            Self::CorruptRow { details } => write!(f, "corrupt subscription row: {details}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Errors from creating a checkout session with the payment processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    /// The request never got an answer.
    Request { reason: String },
    /// The processor answered with a non-success status.
    Rejected { status: u16, body: String },
    /// The processor's answer could not be understood.
    MalformedResponse { reason: String },
}

impl fmt::Display for CheckoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request { reason } => write!(f, "checkout request failed: {reason}"),
            Self::Rejected { status, body } => {
                write!(f, "checkout rejected with status {status}: {body}")
            }
            Self::MalformedResponse { reason } => {
                write!(f, "malformed checkout response: {reason}")
            }
        }
    }
}

impl std::error::Error for CheckoutError {}

/// Why a webhook delivery was not applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookError {
    /// The signature did not verify. Nothing was parsed or written.
    Rejected(SignatureError),
    /// The signature verified but the payload is not a usable event.
    InvalidPayload(EventError),
    /// The event was valid but persisting its effect failed.
    Persistence { details: String },
}

impl fmt::Display for WebhookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected(e) => write!(f, "webhook rejected: {e}"),
            Self::InvalidPayload(e) => write!(f, "webhook payload unusable: {e}"),
            Self::Persistence { details } => write!(f, "webhook not persisted: {details}"),
        }
    }
}

impl std::error::Error for WebhookError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webhook_error_includes_cause() {
        let err = WebhookError::Rejected(SignatureError::Mismatch);
        assert!(err.to_string().contains("no matching signature"));
    }

    #[test]
    fn checkout_error_display() {
        let err = CheckoutError::Rejected {
            status: 402,
            body: "card_declined".to_string(),
        };
        assert!(err.to_string().contains("402"));
        assert!(err.to_string().contains("card_declined"));
    }
}

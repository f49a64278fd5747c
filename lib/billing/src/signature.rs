//! Webhook signature verification.
//!
//! The processor signs each delivery with HMAC-SHA256 over
//! `"{timestamp}.{raw body}"` using the endpoint's shared secret, and sends
//! `t=<unix seconds>,v1=<hex digest>` in the signature header. Several `v1`
//! entries may be present while secrets are being rolled.

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::SignatureError;

type HmacSha256 = Hmac<Sha256>;

/// Header the processor puts the signature in.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Verifies webhook signatures against a shared secret.
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: String,
    tolerance: Duration,
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("tolerance", &self.tolerance)
            .finish_non_exhaustive()
    }
}

impl SignatureVerifier {
    /// Creates a verifier accepting timestamps within `tolerance` of now.
    #[must_use]
    pub fn new(secret: impl Into<String>, tolerance: Duration) -> Self {
        Self {
            secret: secret.into(),
            tolerance,
        }
    }

    fn mac(&self, timestamp: i64, payload: &[u8]) -> Result<HmacSha256, SignatureError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|_| SignatureError::InvalidSecret)?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(mac)
    }

    /// Verifies `header` against `payload` at time `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the header is missing or malformed, the timestamp
    /// is outside the tolerance window, or no signature matches.
    pub fn verify(
        &self,
        payload: &[u8],
        header: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), SignatureError> {
        let header = header.ok_or(SignatureError::MissingHeader)?;

        let mut timestamp = None;
        let mut signatures = Vec::new();
        for part in header.split(',') {
            let Some((key, value)) = part.trim().split_once('=') else {
                continue;
            };
            match key {
                "t" => {
                    timestamp = Some(value.parse::<i64>().map_err(|e| {
                        SignatureError::MalformedHeader {
                            reason: format!("bad timestamp: {e}"),
                        }
                    })?);
                }
                "v1" => signatures.push(value),
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or_else(|| SignatureError::MalformedHeader {
            reason: "no timestamp".to_string(),
        })?;
        if signatures.is_empty() {
            return Err(SignatureError::MalformedHeader {
                reason: "no v1 signature".to_string(),
            });
        }

        let age_seconds = now.timestamp().saturating_sub(timestamp);
        if age_seconds.unsigned_abs() > self.tolerance.num_seconds().unsigned_abs() {
            return Err(SignatureError::StaleTimestamp { age_seconds });
        }

        let mac = self.mac(timestamp, payload)?;
        let matched = signatures
            .iter()
            .filter_map(|sig| hex::decode(sig).ok())
            .any(|expected| mac.clone().verify_slice(&expected).is_ok());

        if matched {
            Ok(())
        } else {
            Err(SignatureError::Mismatch)
        }
    }

    /// Produces the header value the processor would send for `payload`
    /// signed at `timestamp`.
    ///
    /// # Errors
    ///
    /// Returns an error if the secret cannot key an HMAC.
    pub fn header_for(&self, payload: &[u8], timestamp: i64) -> Result<String, SignatureError> {
        let digest = self.mac(timestamp, payload)?.finalize().into_bytes();
        Ok(format!("t={timestamp},v1={}", hex::encode(digest)))
    }
}

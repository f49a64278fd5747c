//! Error types for the access crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `AuthenticationError`: failures resolving a session token
//! - `ProfileError`: failures reading profile rows

use std::fmt;

/// Errors from resolving a session token against the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticationError {
    /// The provider rejected the token (expired, revoked, malformed).
    InvalidToken { reason: String },
    /// The provider could not be reached or answered with a server error.
    ProviderError { reason: String },
    /// The provider answered but the payload could not be understood.
    MalformedResponse { reason: String },
}

impl fmt::Display for AuthenticationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidToken { reason } => write!(f, "invalid session token: {reason}"),
            Self::ProviderError { reason } => write!(f, "identity provider error: {reason}"),
            Self::MalformedResponse { reason } => {
                write!(f, "malformed identity provider response: {reason}")
            }
        }
    }
}

impl std::error::Error for AuthenticationError {}

/// Errors from profile storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileError {
    /// The profile store failed.
    Database { details: String },
}

impl fmt::Display for ProfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Database { details } => write!(f, "profile database error: {details}"),
        }
    }
}

impl std::error::Error for ProfileError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_error_display() {
        let err = AuthenticationError::ProviderError {
            reason: "connection refused".to_string(),
        };
        assert!(err.to_string().contains("identity provider"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn profile_error_display() {
        let err = ProfileError::Database {
            details: "pool timed out".to_string(),
        };
        assert_eq!(err.to_string(), "profile database error: pool timed out");
    }
}

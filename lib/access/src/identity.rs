//! Identities resolved from session tokens.
//!
//! The identity provider owns sessions. This service only carries the opaque
//! token it set in a cookie and asks the provider who it belongs to.

use async_trait::async_trait;
use coachdesk_core::{Result, SubjectId};
use serde::Serialize;
use std::fmt;

use crate::error::AuthenticationError;
use crate::role::Role;

/// Opaque session token set by the identity provider's client.
///
/// The internal format is never parsed here. `Debug` output is redacted so
/// tokens do not end up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    /// Wraps a raw token value. Returns `None` for blank values.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self(raw))
        }
    }

    /// Returns the raw token for forwarding to the provider.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(..)")
    }
}

/// The identity behind a valid session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Subject id assigned by the identity provider.
    pub subject_id: SubjectId,
    /// Email on file with the provider, if any.
    pub email: Option<String>,
    /// Role carried by the token itself, when the provider embeds one.
    pub embedded_role: Option<Role>,
}

impl Identity {
    /// Creates an identity without an embedded role.
    #[must_use]
    pub fn new(subject_id: SubjectId, email: Option<String>) -> Self {
        Self {
            subject_id,
            email,
            embedded_role: None,
        }
    }

    /// Sets the role carried by the token.
    #[must_use]
    pub fn with_embedded_role(mut self, role: Role) -> Self {
        self.embedded_role = Some(role);
        self
    }
}

/// Resolves session tokens to identities.
#[async_trait]
pub trait SessionResolver: Send + Sync {
    /// Asks the identity provider who owns `token`.
    async fn resolve(&self, token: &SessionToken) -> Result<Identity, AuthenticationError>;
}

/// A caller whose identity and durable role have both been resolved.
///
/// Inserted into request extensions by the gate so handlers downstream do
/// not resolve the session a second time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedUser {
    /// Subject id of the caller.
    pub subject_id: SubjectId,
    /// Email of the caller, if known.
    pub email: Option<String>,
    /// Durable role of the caller.
    pub role: Role,
    /// Linked professor, for alunos whose profile was read.
    pub professor_id: Option<SubjectId>,
}

impl AuthenticatedUser {
    /// Returns true if the caller is a professor.
    #[must_use]
    pub fn is_professor(&self) -> bool {
        self.role == Role::Professor
    }

    /// Returns true if the caller is an aluno.
    #[must_use]
    pub fn is_aluno(&self) -> bool {
        self.role == Role::Aluno
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_tokens_are_rejected() {
        assert!(SessionToken::new("").is_none());
        assert!(SessionToken::new("   ").is_none());
        assert!(SessionToken::new("eyJhbGciOi").is_some());
    }

    #[test]
    fn token_debug_is_redacted() {
        let token = SessionToken::new("super-secret").expect("token");
        let rendered = format!("{token:?}");
        assert!(!rendered.contains("super-secret"));
        assert_eq!(token.expose(), "super-secret");
    }

    #[test]
    fn identity_with_embedded_role() {
        let identity = Identity::new(SubjectId::new("u1"), None).with_embedded_role(Role::Aluno);
        assert_eq!(identity.embedded_role, Some(Role::Aluno));
    }
}

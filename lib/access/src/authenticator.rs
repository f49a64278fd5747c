//! Turns a session token into an authenticated user with a durable role.

use std::fmt;
use std::sync::Arc;

use crate::identity::{AuthenticatedUser, SessionResolver, SessionToken};
use crate::profile::{ProfileLookup, ProfileStore};

/// Why a caller could not be authenticated.
///
/// Callers of [`Authenticator::authenticate`] treat both variants the same
/// way; the split only exists for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// No token, or the provider did not accept it.
    NoSession,
    /// The token is valid but no usable role could be found.
    Unresolved,
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSession => write!(f, "no valid session"),
            Self::Unresolved => write!(f, "session role could not be resolved"),
        }
    }
}

impl std::error::Error for AuthFailure {}

/// Resolves identities and roles.
///
/// The role embedded in the token wins when present. Otherwise the profile
/// row is read once; there are no retries.
#[derive(Clone)]
pub struct Authenticator {
    resolver: Arc<dyn SessionResolver>,
    profiles: Arc<dyn ProfileStore>,
}

impl Authenticator {
    /// Creates an authenticator over the given seams.
    #[must_use]
    pub fn new(resolver: Arc<dyn SessionResolver>, profiles: Arc<dyn ProfileStore>) -> Self {
        Self { resolver, profiles }
    }

    /// Returns the profile store this authenticator reads roles from.
    #[must_use]
    pub fn profiles(&self) -> &Arc<dyn ProfileStore> {
        &self.profiles
    }

    /// Authenticates the holder of `token`.
    ///
    /// Every failure, including provider or database outages, is reported as
    /// an [`AuthFailure`] rather than an error so callers fail closed.
    pub async fn authenticate(
        &self,
        token: Option<&SessionToken>,
    ) -> Result<AuthenticatedUser, AuthFailure> {
        let token = token.ok_or(AuthFailure::NoSession)?;

        let identity = self.resolver.resolve(token).await.map_err(|e| {
            tracing::debug!(error = %e, "Session token did not resolve");
            AuthFailure::NoSession
        })?;

        if let Some(role) = identity.embedded_role {
            return Ok(AuthenticatedUser {
                subject_id: identity.subject_id,
                email: identity.email,
                role,
                professor_id: None,
            });
        }

        let lookup = self
            .profiles
            .lookup_role(&identity.subject_id)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    subject_id = %identity.subject_id,
                    "Profile lookup failed"
                );
                AuthFailure::Unresolved
            })?;

        match lookup {
            ProfileLookup::Found(found) => Ok(AuthenticatedUser {
                subject_id: identity.subject_id,
                email: identity.email,
                role: found.role,
                professor_id: found.professor_id,
            }),
            ProfileLookup::NotFound => {
                tracing::warn!(subject_id = %identity.subject_id, "No profile for subject");
                Err(AuthFailure::Unresolved)
            }
            ProfileLookup::MissingRole => {
                tracing::warn!(subject_id = %identity.subject_id, "Profile has no role");
                Err(AuthFailure::Unresolved)
            }
            ProfileLookup::InvalidRole(raw) => {
                tracing::warn!(
                    subject_id = %identity.subject_id,
                    role = %raw,
                    "Profile carries an unknown role"
                );
                Err(AuthFailure::Unresolved)
            }
        }
    }
}

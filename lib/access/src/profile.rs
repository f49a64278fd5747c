//! Profile role lookup and public profile projection.
//!
//! Profiles are keyed by subject id. The role column is free text in the
//! backing store, so [`ProfileLookup::from_stored`] validates it on every
//! read instead of trusting it.

use async_trait::async_trait;
use coachdesk_core::{Result, SubjectId};
use serde::Serialize;

use crate::error::ProfileError;
use crate::role::Role;

/// Role assignment read from a profile row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRole {
    /// The durable role.
    pub role: Role,
    /// The linked professor. Only meaningful when `role` is aluno.
    pub professor_id: Option<SubjectId>,
}

/// Outcome of a single-row profile lookup.
///
/// Every outcome other than `Found` means the gate cannot resolve a role and
/// treats the caller as unauthenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileLookup {
    /// The profile exists and carries a valid role.
    Found(ProfileRole),
    /// No profile row for this subject.
    NotFound,
    /// The profile row exists but its role is null.
    MissingRole,
    /// The profile row carries a role outside the closed set.
    InvalidRole(String),
}

impl ProfileLookup {
    /// Builds a lookup outcome from the raw stored columns.
    #[must_use]
    pub fn from_stored(role: Option<&str>, professor_id: Option<&str>) -> Self {
        let Some(raw) = role else {
            return Self::MissingRole;
        };

        match raw.parse::<Role>() {
            Ok(role) => {
                let professor_id = match role {
                    Role::Aluno => professor_id
                        .filter(|id| !id.trim().is_empty())
                        .map(SubjectId::new),
                    Role::Professor => None,
                };
                Self::Found(ProfileRole { role, professor_id })
            }
            Err(_) => Self::InvalidRole(raw.to_string()),
        }
    }
}

/// Reduced public projection of a professor's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicProfile {
    pub slug: String,
    pub full_name: String,
    pub bio: Option<String>,
    pub avatar_path: Option<String>,
    pub specialties: Vec<String>,
    pub instagram: Option<String>,
}

/// Read access to profile rows.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Looks up the durable role of `subject`. No retries.
    async fn lookup_role(&self, subject: &SubjectId) -> Result<ProfileLookup, ProfileError>;

    /// Finds the public profile of the professor published under `slug`.
    ///
    /// Returns `None` when no professor uses the slug, including when the
    /// slug belongs to an aluno.
    async fn find_public_by_slug(&self, slug: &str)
    -> Result<Option<PublicProfile>, ProfileError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_role_is_distinct_from_not_found() {
        assert_eq!(
            ProfileLookup::from_stored(None, None),
            ProfileLookup::MissingRole
        );
        assert_ne!(ProfileLookup::MissingRole, ProfileLookup::NotFound);
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert_eq!(
            ProfileLookup::from_stored(Some("admin"), None),
            ProfileLookup::InvalidRole("admin".to_string())
        );
    }

    #[test]
    fn aluno_keeps_professor_link() {
        let lookup = ProfileLookup::from_stored(Some("aluno"), Some("prof-1"));
        assert_eq!(
            lookup,
            ProfileLookup::Found(ProfileRole {
                role: Role::Aluno,
                professor_id: Some(SubjectId::new("prof-1")),
            })
        );
    }

    #[test]
    fn professor_drops_stray_professor_link() {
        let lookup = ProfileLookup::from_stored(Some("professor"), Some("other"));
        assert_eq!(
            lookup,
            ProfileLookup::Found(ProfileRole {
                role: Role::Professor,
                professor_id: None,
            })
        );
    }

    #[test]
    fn blank_professor_link_is_absent() {
        let lookup = ProfileLookup::from_stored(Some("aluno"), Some(""));
        assert_eq!(
            lookup,
            ProfileLookup::Found(ProfileRole {
                role: Role::Aluno,
                professor_id: None,
            })
        );
    }
}

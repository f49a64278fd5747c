//! In-memory implementations of the access seams.
//!
//! Used by tests and local development where neither the identity provider
//! nor the database is available.

use async_trait::async_trait;
use coachdesk_core::{Result, SubjectId};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::{AuthenticationError, ProfileError};
use crate::identity::{Identity, SessionResolver, SessionToken};
use crate::profile::{ProfileLookup, ProfileStore, PublicProfile};

/// A profile row as the backing store would hold it.
#[derive(Debug, Clone, Default)]
pub struct StoredProfile {
    /// Raw role text; validated on read.
    pub role: Option<String>,
    pub professor_id: Option<String>,
    pub full_name: String,
    pub slug: Option<String>,
    pub bio: Option<String>,
    pub avatar_path: Option<String>,
    pub specialties: Vec<String>,
    pub instagram: Option<String>,
}

impl StoredProfile {
    /// A professor profile published under `slug`.
    #[must_use]
    pub fn professor(full_name: &str, slug: &str) -> Self {
        Self {
            role: Some("professor".to_string()),
            full_name: full_name.to_string(),
            slug: Some(slug.to_string()),
            ..Self::default()
        }
    }

    /// An aluno profile linked to `professor_id`.
    #[must_use]
    pub fn aluno(full_name: &str, professor_id: &str) -> Self {
        Self {
            role: Some("aluno".to_string()),
            professor_id: Some(professor_id.to_string()),
            full_name: full_name.to_string(),
            ..Self::default()
        }
    }

    /// A profile whose role column holds arbitrary text.
    #[must_use]
    pub fn with_raw_role(role: Option<&str>) -> Self {
        Self {
            role: role.map(str::to_string),
            ..Self::default()
        }
    }
}

/// In-memory profile store.
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    profiles: RwLock<HashMap<SubjectId, StoredProfile>>,
    unavailable: bool,
}

impl InMemoryProfileStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store whose every read fails, as if the database were down.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            profiles: RwLock::default(),
            unavailable: true,
        }
    }

    /// Inserts or replaces the profile of `subject`.
    pub async fn insert(&self, subject: SubjectId, profile: StoredProfile) {
        self.profiles.write().await.insert(subject, profile);
    }

    fn check_available(&self) -> Result<(), ProfileError> {
        if self.unavailable {
            return Err(ProfileError::Database {
                details: "store unavailable".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn lookup_role(&self, subject: &SubjectId) -> Result<ProfileLookup, ProfileError> {
        self.check_available()?;
        let profiles = self.profiles.read().await;
        Ok(match profiles.get(subject) {
            Some(profile) => {
                ProfileLookup::from_stored(profile.role.as_deref(), profile.professor_id.as_deref())
            }
            None => ProfileLookup::NotFound,
        })
    }

    async fn find_public_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<PublicProfile>, ProfileError> {
        self.check_available()?;
        let profiles = self.profiles.read().await;
        Ok(profiles
            .values()
            .filter(|p| p.role.as_deref() == Some("professor"))
            .find(|p| p.slug.as_deref() == Some(slug))
            .map(|p| PublicProfile {
                slug: slug.to_string(),
                full_name: p.full_name.clone(),
                bio: p.bio.clone(),
                avatar_path: p.avatar_path.clone(),
                specialties: p.specialties.clone(),
                instagram: p.instagram.clone(),
            }))
    }
}

/// Session resolver backed by a fixed token table.
#[derive(Debug, Default)]
pub struct InMemorySessionResolver {
    sessions: RwLock<HashMap<String, Identity>>,
    unavailable: bool,
}

impl InMemorySessionResolver {
    /// Creates a resolver with no known tokens.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a resolver that always fails as if the provider were down.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            sessions: RwLock::default(),
            unavailable: true,
        }
    }

    /// Registers `token` as belonging to `identity`.
    pub async fn insert(&self, token: &str, identity: Identity) {
        self.sessions
            .write()
            .await
            .insert(token.to_string(), identity);
    }
}

#[async_trait]
impl SessionResolver for InMemorySessionResolver {
    async fn resolve(&self, token: &SessionToken) -> Result<Identity, AuthenticationError> {
        if self.unavailable {
            return Err(AuthenticationError::ProviderError {
                reason: "provider unavailable".to_string(),
            }
            .into());
        }
        let sessions = self.sessions.read().await;
        match sessions.get(token.expose()) {
            Some(identity) => Ok(identity.clone()),
            None => Err(AuthenticationError::InvalidToken {
                reason: "unknown token".to_string(),
            }
            .into()),
        }
    }
}

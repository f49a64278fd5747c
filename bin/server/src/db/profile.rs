//! Profile repository.

use async_trait::async_trait;
use coachdesk_access::{ProfileError, ProfileLookup, ProfileStore, PublicProfile};
use coachdesk_core::{Result, SubjectId};
use sqlx::{FromRow, PgPool};

/// Row type for role lookups.
#[derive(FromRow)]
struct RoleRow {
    role: Option<String>,
    professor_id: Option<String>,
}

/// Row type for public profile queries.
#[derive(FromRow)]
struct PublicProfileRow {
    slug: String,
    full_name: String,
    bio: Option<String>,
    avatar_path: Option<String>,
    specialties: Vec<String>,
    instagram: Option<String>,
}

impl From<PublicProfileRow> for PublicProfile {
    fn from(row: PublicProfileRow) -> Self {
        Self {
            slug: row.slug,
            full_name: row.full_name,
            bio: row.bio,
            avatar_path: row.avatar_path,
            specialties: row.specialties,
            instagram: row.instagram,
        }
    }
}

fn database(e: sqlx::Error) -> ProfileError {
    ProfileError::Database {
        details: e.to_string(),
    }
}

/// Repository for profile reads.
#[derive(Clone)]
pub struct PgProfileRepository {
    pool: PgPool,
}

impl PgProfileRepository {
    /// Creates a new profile repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PgProfileRepository {
    async fn lookup_role(&self, subject: &SubjectId) -> Result<ProfileLookup, ProfileError> {
        let row: Option<RoleRow> = sqlx::query_as(
            r#"
            SELECT role, professor_id
            FROM profiles
            WHERE id = $1
            "#,
        )
        .bind(subject.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(database)?;

        Ok(match row {
            Some(r) => ProfileLookup::from_stored(r.role.as_deref(), r.professor_id.as_deref()),
            None => ProfileLookup::NotFound,
        })
    }

    async fn find_public_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<PublicProfile>, ProfileError> {
        let row: Option<PublicProfileRow> = sqlx::query_as(
            r#"
            SELECT slug, full_name, bio, avatar_path, specialties, instagram
            FROM profiles
            WHERE slug = $1 AND role = 'professor'
            "#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(database)?;

        Ok(row.map(PublicProfile::from))
    }
}

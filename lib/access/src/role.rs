//! Role types for request-time access control.
//!
//! Every subject has exactly one durable role, assigned at sign-up. Roles are
//! stored as text by the backing database, so every read goes through
//! [`Role::from_str`], which rejects anything outside the closed set.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The durable role of a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A trainer who manages alunos, workout plans and a public profile.
    Professor,
    /// A student linked to exactly one professor.
    Aluno,
}

impl Role {
    /// Returns the stored text form of the role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Professor => "professor",
            Self::Aluno => "aluno",
        }
    }

    /// Returns the landing page for a subject holding this role.
    ///
    /// Used as the redirect target when a subject wanders into the other
    /// role's area.
    #[must_use]
    pub const fn home_path(&self) -> &'static str {
        match self {
            Self::Professor => "/professor/dashboard",
            Self::Aluno => "/dashboard",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for a role string outside the closed set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role '{}'", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "professor" => Ok(Self::Professor),
            "aluno" => Ok(Self::Aluno),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_roles() {
        assert_eq!("professor".parse::<Role>(), Ok(Role::Professor));
        assert_eq!("aluno".parse::<Role>(), Ok(Role::Aluno));
    }

    #[test]
    fn rejects_unknown_and_differently_cased_roles() {
        assert_eq!(
            "admin".parse::<Role>(),
            Err(UnknownRole("admin".to_string()))
        );
        assert!("Professor".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }

    #[test]
    fn home_paths_are_distinct() {
        assert_eq!(Role::Aluno.home_path(), "/dashboard");
        assert_eq!(Role::Professor.home_path(), "/professor/dashboard");
    }

    #[test]
    fn role_serialization_format() {
        let json = serde_json::to_string(&Role::Professor).expect("serialize");
        assert_eq!(json, "\"professor\"");

        let parsed: Role = serde_json::from_str("\"aluno\"").expect("deserialize");
        assert_eq!(parsed, Role::Aluno);
    }
}

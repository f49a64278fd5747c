//! Access control for coachdesk.
//!
//! This crate provides:
//! - The closed [`Role`] type (`professor` / `aluno`)
//! - Identity and session-token types resolved from the identity provider
//! - Profile role lookup outcomes and the [`ProfileStore`] seam
//! - The [`Authenticator`], which turns a session token into an
//!   [`AuthenticatedUser`] with a durable role
//! - The [`RoleGate`], which decides per request whether to proceed or
//!   redirect
//!
//! # Example
//!
//! ```
//! use coachdesk_access::{Access, GateRules, Role, UnlistedPaths};
//!
//! let rules = GateRules::standard(UnlistedPaths::Allow);
//! assert_eq!(rules.classify("/login"), Access::Public);
//! assert_eq!(rules.classify("/aluno/treinos"), Access::Role(Role::Aluno));
//! assert_eq!(rules.classify("/professor/alunos"), Access::Role(Role::Professor));
//! ```

pub mod authenticator;
pub mod error;
pub mod gate;
pub mod identity;
pub mod memory;
pub mod profile;
pub mod role;

pub use authenticator::{AuthFailure, Authenticator};
pub use error::{AuthenticationError, ProfileError};
pub use gate::{Access, GateDecision, GateRules, PathPattern, RoleGate, Rule, UnlistedPaths};
pub use identity::{AuthenticatedUser, Identity, SessionResolver, SessionToken};
pub use memory::{InMemoryProfileStore, InMemorySessionResolver, StoredProfile};
pub use profile::{ProfileLookup, ProfileRole, ProfileStore, PublicProfile};
pub use role::{Role, UnknownRole};

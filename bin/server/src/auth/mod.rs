//! Authentication for the coachdesk server.
//!
//! The identity provider owns sessions; this module only:
//! - Resolves the access token carried in the session cookie (or a bearer
//!   header) through the provider's `GET /user` endpoint
//! - Runs the role gate in front of every route
//! - Provides extractors for API handlers that need a caller
//!
//! Roles are durable: the one embedded in the token wins, otherwise the
//! `profiles` row decides. A caller whose role cannot be determined is
//! treated as unauthenticated.

pub mod identity;
pub mod middleware;
pub mod routes;

pub use identity::HttpSessionResolver;
pub use middleware::{RequireAluno, RequireUser, role_gate, session_token};
pub use routes::logout;

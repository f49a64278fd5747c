//! Core types shared by every coachdesk crate.
//!
//! Identifiers for subjects (issued by the identity provider) and for rows
//! this service owns, plus the `Result` alias used at I/O seams.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ParseIdError, SubjectId, SubscriptionId};

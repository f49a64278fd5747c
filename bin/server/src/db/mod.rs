//! Postgres repositories.
//!
//! This module provides data access for:
//! - Profile roles and public professor profiles
//! - Subscriptions driven by checkout and payment webhooks

pub mod profile;
pub mod subscription;

pub use profile::PgProfileRepository;
pub use subscription::PgSubscriptionRepository;

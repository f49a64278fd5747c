//! coachdesk HTTP server.
//!
//! Fronts the role-gated web application and owns its boundary endpoints:
//! the payment-processor webhook, signed media URLs, public professor
//! profiles, and aluno checkout.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod state;

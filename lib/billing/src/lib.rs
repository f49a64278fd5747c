//! Subscription billing for coachdesk.
//!
//! This crate provides:
//! - The [`Subscription`] model and its status enum
//! - Verification of payment-processor webhook signatures
//! - Parsing of webhook events into a closed set of kinds
//! - The [`WebhookRouter`], which maps events onto subscription transitions
//! - The [`CheckoutClient`] seam used to start a paid subscription
//!
//! # Flow
//!
//! An aluno starts checkout, which inserts a `pending` row keyed by the
//! checkout-session id. The processor later reports the outcome through the
//! webhook; the router turns `checkout.session.completed` into a single
//! upsert so lost or reordered inserts heal forward instead of failing.

pub mod checkout;
pub mod error;
pub mod event;
pub mod memory;
pub mod router;
pub mod signature;
pub mod subscription;

pub use checkout::{CheckoutClient, CheckoutRequest, CheckoutSession, StripeCheckoutClient};
pub use error::{CheckoutError, EventError, SignatureError, StoreError, WebhookError};
pub use event::{
    CheckoutCompleted, EventEnvelope, InvoicePayment, SubscriptionChanged, WebhookEvent,
};
pub use memory::{InMemorySubscriptionStore, RecordingCheckoutClient};
pub use router::{WebhookOutcome, WebhookProcessor, WebhookRouter};
pub use signature::SignatureVerifier;
pub use subscription::{
    CheckoutActivation, PendingCheckout, Subscription, SubscriptionStatus, SubscriptionStore,
};

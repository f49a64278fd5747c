//! Shared application state.

use coachdesk_access::{
    Authenticator, GateRules, ProfileStore, RoleGate, SessionResolver, UnlistedPaths,
};
use coachdesk_billing::{
    CheckoutClient, SignatureVerifier, SubscriptionStore, WebhookProcessor, WebhookRouter,
};
use coachdesk_media::{ObjectSigner, SignedMediaGateway};
use std::sync::Arc;
use std::time::Duration;

use crate::config::ServerConfig;

/// The external collaborators the service talks to.
pub struct Backends {
    pub sessions: Arc<dyn SessionResolver>,
    pub profiles: Arc<dyn ProfileStore>,
    pub subscriptions: Arc<dyn SubscriptionStore>,
    pub signer: Arc<dyn ObjectSigner>,
    pub checkout: Arc<dyn CheckoutClient>,
}

/// Plain settings the handlers need at request time.
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub unlisted_paths: UnlistedPaths,
    pub session_cookie: String,
    pub secure_cookies: bool,
    pub public_base_url: String,
    pub price_id: String,
    pub webhook_secret: String,
    pub signature_tolerance: chrono::Duration,
    pub signed_url_ttl: Duration,
}

impl AppSettings {
    /// Extracts request-time settings from the loaded configuration.
    #[must_use]
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            unlisted_paths: config.gate.unlisted_paths,
            session_cookie: config.identity.session_cookie.clone(),
            secure_cookies: config.session.secure_cookies,
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
            price_id: config.payments.price_id.clone(),
            webhook_secret: config.payments.webhook_secret.clone(),
            signature_tolerance: chrono::Duration::seconds(
                config.payments.signature_tolerance_seconds,
            ),
            signed_url_ttl: Duration::from_secs(config.storage.signed_url_ttl_seconds),
        }
    }
}

/// Shared application state.
pub struct AppState {
    /// Request-time role gate.
    pub gate: RoleGate,
    /// Resolves callers of API endpoints the gate lets through unchecked.
    pub authenticator: Authenticator,
    pub subscriptions: Arc<dyn SubscriptionStore>,
    /// Verifies and applies payment webhooks.
    pub webhooks: WebhookProcessor,
    pub media: SignedMediaGateway,
    pub checkout: Arc<dyn CheckoutClient>,
    pub settings: AppSettings,
}

impl AppState {
    /// Wires the gate, webhook processor and media gateway over `backends`.
    #[must_use]
    pub fn new(backends: Backends, settings: AppSettings) -> Self {
        let authenticator = Authenticator::new(backends.sessions, backends.profiles);
        let gate = RoleGate::new(
            GateRules::standard(settings.unlisted_paths),
            authenticator.clone(),
        );
        let webhooks = WebhookProcessor::new(
            SignatureVerifier::new(settings.webhook_secret.clone(), settings.signature_tolerance),
            WebhookRouter::new(backends.subscriptions.clone()),
        );
        let media = SignedMediaGateway::new(backends.signer, settings.signed_url_ttl);

        Self {
            gate,
            authenticator,
            subscriptions: backends.subscriptions,
            webhooks,
            media,
            checkout: backends.checkout,
            settings,
        }
    }

    /// Profile rows, shared with the authenticator.
    #[must_use]
    pub fn profiles(&self) -> &Arc<dyn ProfileStore> {
        self.authenticator.profiles()
    }
}

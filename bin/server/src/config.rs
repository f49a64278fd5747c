//! Centralized server configuration.
//!
//! Loaded via the `config` crate from environment variables. Nested keys use
//! `__` as the separator, e.g. `PAYMENTS__WEBHOOK_SECRET`.

use coachdesk_access::UnlistedPaths;
use serde::Deserialize;
use std::fmt;

/// Server configuration.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// PostgreSQL database connection URL.
    pub database_url: String,

    /// Address the HTTP listener binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Externally visible base URL, used for checkout return URLs.
    pub public_base_url: String,

    /// Identity provider settings.
    pub identity: IdentityConfig,

    /// Object storage settings.
    pub storage: StorageConfig,

    /// Payment processor settings.
    pub payments: PaymentsConfig,

    /// Role gate settings.
    #[serde(default)]
    pub gate: GateConfig,

    /// Session cookie settings.
    #[serde(default)]
    pub session: SessionConfig,
}

/// Identity provider configuration.
#[derive(Clone, Deserialize)]
pub struct IdentityConfig {
    /// Base URL of the auth API (e.g. `https://xyz.example.co/auth/v1`).
    pub auth_url: String,

    /// Public API key sent with every call.
    pub anon_key: String,

    /// Name of the cookie carrying the access token.
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,
}

impl fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("auth_url", &self.auth_url)
            .field("session_cookie", &self.session_cookie)
            .finish_non_exhaustive()
    }
}

/// Object storage configuration.
#[derive(Clone, Deserialize)]
pub struct StorageConfig {
    /// Base URL of the storage API (e.g. `https://xyz.example.co/storage/v1`).
    pub storage_url: String,

    /// Service key. Never sent to browsers.
    pub service_key: String,

    /// Private bucket holding user media.
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Lifetime of issued signed URLs, in seconds.
    #[serde(default = "default_signed_url_ttl_seconds")]
    pub signed_url_ttl_seconds: u64,
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("storage_url", &self.storage_url)
            .field("bucket", &self.bucket)
            .field("signed_url_ttl_seconds", &self.signed_url_ttl_seconds)
            .finish_non_exhaustive()
    }
}

/// Payment processor configuration.
#[derive(Clone, Deserialize)]
pub struct PaymentsConfig {
    /// REST API base URL.
    #[serde(default = "default_payments_api_base")]
    pub api_base: String,

    /// Secret API key.
    pub secret_key: String,

    /// Shared secret for webhook signatures.
    pub webhook_secret: String,

    /// Recurring price alunos subscribe to.
    pub price_id: String,

    /// Maximum age of a webhook signature timestamp, in seconds.
    #[serde(default = "default_signature_tolerance_seconds")]
    pub signature_tolerance_seconds: i64,
}

impl fmt::Debug for PaymentsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentsConfig")
            .field("api_base", &self.api_base)
            .field("price_id", &self.price_id)
            .field(
                "signature_tolerance_seconds",
                &self.signature_tolerance_seconds,
            )
            .finish_non_exhaustive()
    }
}

/// Role gate configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GateConfig {
    /// What happens to paths no rule names.
    #[serde(default)]
    pub unlisted_paths: UnlistedPaths,
}

/// Session cookie configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Whether to set the Secure flag on cookies (requires HTTPS).
    /// Set to false for local HTTP development.
    #[serde(default = "default_secure_cookies")]
    pub secure_cookies: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secure_cookies: default_secure_cookies(),
        }
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_session_cookie() -> String {
    "sb-access-token".to_string()
}

fn default_bucket() -> String {
    "media".to_string()
}

fn default_signed_url_ttl_seconds() -> u64 {
    3600
}

fn default_payments_api_base() -> String {
    "https://api.stripe.com/v1".to_string()
}

fn default_signature_tolerance_seconds() -> i64 {
    300
}

fn default_secure_cookies() -> bool {
    true
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn required() -> config::ConfigBuilder<config::builder::DefaultState> {
        config::Config::builder()
            .set_override("database_url", "postgres://localhost/coachdesk")
            .expect("override")
            .set_override("public_base_url", "https://app.example.com")
            .expect("override")
            .set_override("identity.auth_url", "https://id.example.com/auth/v1")
            .expect("override")
            .set_override("identity.anon_key", "anon")
            .expect("override")
            .set_override("storage.storage_url", "https://id.example.com/storage/v1")
            .expect("override")
            .set_override("storage.service_key", "service")
            .expect("override")
            .set_override("payments.secret_key", "sk_test")
            .expect("override")
            .set_override("payments.webhook_secret", "whsec_test")
            .expect("override")
            .set_override("payments.price_id", "price_1")
            .expect("override")
    }

    #[test]
    fn session_config_has_correct_defaults() {
        assert!(SessionConfig::default().secure_cookies);
    }

    #[test]
    fn optional_values_fall_back_to_defaults() {
        let config: ServerConfig = required()
            .build()
            .expect("build")
            .try_deserialize()
            .expect("deserialize");

        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.identity.session_cookie, "sb-access-token");
        assert_eq!(config.storage.bucket, "media");
        assert_eq!(config.storage.signed_url_ttl_seconds, 3600);
        assert_eq!(config.payments.api_base, "https://api.stripe.com/v1");
        assert_eq!(config.payments.signature_tolerance_seconds, 300);
        assert_eq!(config.gate.unlisted_paths, UnlistedPaths::Allow);
        assert!(config.session.secure_cookies);
    }

    #[test]
    fn deny_by_default_can_be_enabled() {
        let config: ServerConfig = required()
            .set_override("gate.unlisted_paths", "authenticated")
            .expect("override")
            .build()
            .expect("build")
            .try_deserialize()
            .expect("deserialize");
        assert_eq!(config.gate.unlisted_paths, UnlistedPaths::Authenticated);
    }

    #[test]
    fn missing_webhook_secret_is_an_error() {
        let result = config::Config::builder()
            .set_override("database_url", "postgres://localhost/coachdesk")
            .expect("override")
            .build()
            .expect("build")
            .try_deserialize::<ServerConfig>();
        assert!(result.is_err());
    }

    #[test]
    fn debug_output_hides_secrets() {
        let config: ServerConfig = required()
            .build()
            .expect("build")
            .try_deserialize()
            .expect("deserialize");
        let debug = format!("{config:?}");
        assert!(!debug.contains("whsec_test"));
        assert!(!debug.contains("sk_test"));
        assert!(!debug.contains("service_key"));
    }
}

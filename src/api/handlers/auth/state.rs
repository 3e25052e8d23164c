//! Auth configuration and shared request state.

use secrecy::SecretString;
use std::sync::Arc;

use super::error::AuthError;
use super::registry::SessionStore;
use super::token::TokenSigner;
use super::verifier::UserStore;

const DEFAULT_ACCESS_TTL_MINUTES: i64 = 15;
const DEFAULT_REFRESH_TTL_DAYS: i64 = 7;
// Non-persistent ("remember me" unchecked) sessions expire after a fixed 12h.
const EPHEMERAL_SESSION_TTL_SECONDS: i64 = 12 * 60 * 60;
const DEFAULT_TOKEN_ISSUER: &str = "oturum";
const DEFAULT_TOKEN_AUDIENCE: &str = "oturum-web";

#[derive(Clone, Debug)]
pub struct AuthConfig {
    frontend_base_url: String,
    access_token_ttl_minutes: i64,
    refresh_token_ttl_days: i64,
    token_issuer: String,
    token_audience: String,
}

impl AuthConfig {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        Self {
            frontend_base_url,
            access_token_ttl_minutes: DEFAULT_ACCESS_TTL_MINUTES,
            refresh_token_ttl_days: DEFAULT_REFRESH_TTL_DAYS,
            token_issuer: DEFAULT_TOKEN_ISSUER.to_string(),
            token_audience: DEFAULT_TOKEN_AUDIENCE.to_string(),
        }
    }

    #[must_use]
    pub fn with_access_token_ttl_minutes(mut self, minutes: i64) -> Self {
        self.access_token_ttl_minutes = minutes;
        self
    }

    #[must_use]
    pub fn with_refresh_token_ttl_days(mut self, days: i64) -> Self {
        self.refresh_token_ttl_days = days;
        self
    }

    #[must_use]
    pub fn with_token_issuer(mut self, issuer: String) -> Self {
        self.token_issuer = issuer;
        self
    }

    #[must_use]
    pub fn with_token_audience(mut self, audience: String) -> Self {
        self.token_audience = audience;
        self
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    #[must_use]
    pub fn access_token_ttl_minutes(&self) -> i64 {
        self.access_token_ttl_minutes
    }

    #[must_use]
    pub fn access_token_ttl_seconds(&self) -> i64 {
        self.access_token_ttl_minutes * 60
    }

    #[must_use]
    pub fn refresh_token_ttl_days(&self) -> i64 {
        self.refresh_token_ttl_days
    }

    /// Refresh TTL in seconds for persistent (remember-me) sessions.
    #[must_use]
    pub fn persistent_refresh_ttl_seconds(&self) -> i64 {
        self.refresh_token_ttl_days * 24 * 60 * 60
    }

    /// Refresh TTL in seconds for non-persistent sessions.
    #[must_use]
    pub fn ephemeral_refresh_ttl_seconds(&self) -> i64 {
        EPHEMERAL_SESSION_TTL_SECONDS
    }

    #[must_use]
    pub fn token_issuer(&self) -> &str {
        &self.token_issuer
    }

    #[must_use]
    pub fn token_audience(&self) -> &str {
        &self.token_audience
    }

    /// Only mark cookies secure when the frontend is served over HTTPS.
    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.frontend_base_url.starts_with("https://")
    }
}

/// Everything a request needs: config, the token signer, and the two
/// storage capabilities behind trait objects.
pub struct AuthState {
    config: AuthConfig,
    signer: TokenSigner,
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
}

impl AuthState {
    /// Build the state, constructing the token signer from the configured key.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] when the signing key is shorter
    /// than 32 bytes; boot must abort in that case.
    pub fn new(
        config: AuthConfig,
        signing_key: &SecretString,
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
    ) -> Result<Self, AuthError> {
        let signer = TokenSigner::new(
            signing_key,
            config.token_issuer().to_string(),
            config.token_audience().to_string(),
            config.access_token_ttl_seconds(),
        )
        .map_err(|err| AuthError::Configuration(err.to_string()))?;

        Ok(Self {
            config,
            signer,
            users,
            sessions,
        })
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    #[must_use]
    pub fn users(&self) -> &dyn UserStore {
        self.users.as_ref()
    }

    #[must_use]
    pub fn sessions(&self) -> &dyn SessionStore {
        self.sessions.as_ref()
    }
}

//! Identity provider abstraction.
//!
//! The bootstrap guard and the views only ever talk to an
//! `IdentityProvider`; `KeycloakClient` is the OpenID Connect implementation
//! used by the CLI host.

mod keycloak;
mod pkce;
mod token;

pub use keycloak::KeycloakClient;
pub use pkce::{CallbackState, CallbackStore};
pub use token::TokenClaims;

use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::InitConfig;

/// Errors raised by an identity provider.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    #[error("Identity provider not initialized")]
    NotInitialized,
    #[error("User not logged in")]
    NotAuthenticated,
    #[error("User not logged in or user profile was not loaded")]
    ProfileNotLoaded,
    #[error("Invalid login callback: {0}")]
    InvalidCallback(String),
    #[error("Login failed: {0}")]
    LoginFailed(String),
    #[error("Malformed token: {0}")]
    MalformedToken(String),
    #[error("Identity provider request failed: {0}")]
    Request(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ProviderError {
    pub(crate) fn request(err: impl std::fmt::Display) -> Self {
        ProviderError::Request(err.to_string())
    }
}

/// Options for `IdentityProvider::login`.
#[derive(Debug, Clone, Default)]
pub struct LoginOptions {
    /// Where the provider sends the browser after login. Defaults to the current location.
    pub redirect_uri: Option<String>,
}

/// User profile as returned by the provider's account endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_timestamp: Option<i64>,
}

/// An external identity provider session.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Establish the session for the current page.
    ///
    /// Resolves to whether the user is authenticated. A provider that
    /// redirects to its login page resolves `false`; the page is about to go away.
    async fn init(&self, options: &InitConfig) -> Result<bool, ProviderError>;

    async fn is_logged_in(&self) -> bool;

    /// Start the login transition (a full-page redirect).
    async fn login(&self, options: LoginOptions) -> Result<(), ProviderError>;

    /// Drop the session and redirect to the provider's logout page.
    async fn logout(&self, redirect_uri: Option<String>) -> Result<(), ProviderError>;

    fn username(&self) -> Result<String, ProviderError>;

    /// Realm roles followed by client roles, without duplicates.
    fn user_roles(&self) -> Vec<String>;

    async fn load_user_profile(&self) -> Result<Profile, ProviderError>;

    /// Current access token.
    async fn token(&self) -> Result<String, ProviderError>;

    /// Decoded access-token claims, if a session exists.
    fn token_parsed(&self) -> Option<TokenClaims>;
}

/// Receives full-page redirects issued by a provider.
pub trait Redirector: Send + Sync {
    fn redirect(&self, url: &Url);
}

/// Redirector that remembers the last URL instead of leaving the page.
#[derive(Debug, Default)]
pub struct PendingRedirect {
    target: Mutex<Option<Url>>,
}

impl PendingRedirect {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent redirect target, consuming it.
    pub fn take(&self) -> Option<Url> {
        self.target.lock().ok().and_then(|mut target| target.take())
    }

    pub fn is_pending(&self) -> bool {
        self.target
            .lock()
            .map(|target| target.is_some())
            .unwrap_or(false)
    }
}

impl Redirector for PendingRedirect {
    fn redirect(&self, url: &Url) {
        if let Ok(mut target) = self.target.lock() {
            *target = Some(url.clone());
        }
    }
}

//! Application and identity-provider configuration.
//!
//! Values come from CLI flags with environment-variable fallbacks (see
//! `cli::args`). The provider init options are fixed: every page load forces
//! authentication and uses PKCE with query-string responses.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Default identity provider URL (reachable from the browser)
pub const DEFAULT_ISSUER: &str = "http://localhost:8081";

/// Default realm
pub const DEFAULT_REALM: &str = "master";

/// Default OIDC client ID
pub const DEFAULT_CLIENT_ID: &str = "bds-application";

/// Default application origin
pub const DEFAULT_ORIGIN: &str = "http://localhost:4200";

/// Default backend API base (relative to the origin)
pub const DEFAULT_API_URL: &str = "/api";

/// Request paths that never get an `Authorization` header
pub const BEARER_EXCLUDED_URLS: &[&str] = &["/assets"];

/// Identity provider location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    pub url: String,
    pub realm: String,
    pub client_id: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_ISSUER.to_string(),
            realm: DEFAULT_REALM.to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
        }
    }
}

impl ProviderConfig {
    /// Base URL of the realm, e.g. `http://localhost:8081/realms/master/`.
    pub fn realm_url(&self) -> Result<Url> {
        let base = Url::parse(&self.url)
            .with_context(|| format!("Invalid identity provider URL: {}", self.url))?;
        let path = format!(
            "{}/realms/{}/",
            base.path().trim_end_matches('/'),
            self.realm
        );
        let mut url = base;
        url.set_path(&path);
        Ok(url)
    }

    /// OpenID Connect endpoint under the realm, e.g. `protocol/openid-connect/token`.
    pub fn endpoint(&self, relative: &str) -> Result<Url> {
        self.realm_url()?
            .join(relative)
            .with_context(|| format!("Failed to build provider endpoint: {}", relative))
    }
}

/// What the provider does when a page loads without a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OnLoad {
    /// Redirect to the login page straight away.
    LoginRequired,
    /// Only pick up an existing session, never redirect.
    CheckSso,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PkceMethod {
    S256,
}

/// Where the provider puts the authorization response on the redirect URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    Query,
    Fragment,
}

impl ResponseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseMode::Query => "query",
            ResponseMode::Fragment => "fragment",
        }
    }
}

/// Options handed to `IdentityProvider::init`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitConfig {
    pub config: ProviderConfig,
    pub on_load: OnLoad,
    pub pkce_method: Option<PkceMethod>,
    pub response_mode: ResponseMode,
    pub check_login_iframe: bool,
    pub use_nonce: bool,
    pub load_user_profile_at_startup: bool,
    pub bearer_excluded_urls: Vec<String>,
}

impl InitConfig {
    /// The fixed init options used by the bootstrap guard.
    ///
    /// Nonce checking is off; PKCE covers code interception for a public client.
    pub fn forced_login(config: ProviderConfig) -> Self {
        Self {
            config,
            on_load: OnLoad::LoginRequired,
            pkce_method: Some(PkceMethod::S256),
            response_mode: ResponseMode::Query,
            check_login_iframe: false,
            use_nonce: false,
            load_user_profile_at_startup: true,
            bearer_excluded_urls: BEARER_EXCLUDED_URLS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Effective application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub origin: String,
    pub api_url: String,
    pub cache_dir: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routes_file: Option<PathBuf>,
}

impl AppConfig {
    pub fn init_config(&self) -> InitConfig {
        InitConfig::forced_login(self.provider.clone())
    }

    /// Parsed application origin.
    pub fn origin_url(&self) -> Result<Url> {
        Url::parse(&self.origin).with_context(|| format!("Invalid origin: {}", self.origin))
    }

    /// Backend API base URL; a relative `api_url` is resolved against the origin.
    pub fn api_base_url(&self) -> Result<Url> {
        if let Ok(mut url) = Url::parse(&self.api_url) {
            if !url.path().ends_with('/') {
                let path = format!("{}/", url.path());
                url.set_path(&path);
            }
            return Ok(url);
        }
        let mut joined = self.origin_url()?;
        joined.set_path(&format!("{}/", self.api_url.trim_end_matches('/')));
        Ok(joined)
    }
}

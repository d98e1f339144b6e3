//! Per-navigation route authorization.
//!
//! Rules, first match wins:
//! 1. public route: allow, whatever the session looks like
//! 2. no session: send the user to the provider's login, return to the requested path
//! 3. no required roles: allow
//! 4. every required role held (exact, case-sensitive): allow, otherwise
//!    navigate to the access-denied page

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::provider::{IdentityProvider, LoginOptions, ProviderError};

/// Path of the page shown when a role check fails
pub const ACCESS_DENIED_PATH: &str = "/access-denied";

/// Access requirements declared by a route.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawRouteMetadata")]
pub struct RouteMetadata {
    /// Reachable without a session.
    pub public: bool,
    /// Roles a session must hold, all of them.
    pub roles: Vec<String>,
    /// Non-string entries of the declared role list. No session holds
    /// these, so a route that has any is never granted by role.
    #[serde(skip)]
    pub unmatchable_roles: Vec<String>,
}

impl RouteMetadata {
    pub fn public() -> Self {
        Self {
            public: true,
            ..Self::default()
        }
    }

    pub fn protected() -> Self {
        Self::default()
    }

    pub fn with_roles<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Whether the route declares any role requirement at all.
    pub fn requires_roles(&self) -> bool {
        !self.roles.is_empty() || !self.unmatchable_roles.is_empty()
    }

    /// Whether `held` satisfies every declared role.
    pub fn roles_satisfied_by(&self, held: &BTreeSet<String>) -> bool {
        self.unmatchable_roles.is_empty() && self.roles.iter().all(|role| held.contains(role))
    }
}

/// A route's `data` bag as written, before interpretation.
#[derive(Deserialize)]
struct RawRouteMetadata {
    #[serde(default)]
    public: Value,
    #[serde(default)]
    roles: Value,
}

/// JavaScript truthiness: `false`, `0`, `""` and `null` are false.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|n| n != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

impl From<RawRouteMetadata> for RouteMetadata {
    fn from(raw: RawRouteMetadata) -> Self {
        if !matches!(raw.public, Value::Null | Value::Bool(_)) {
            warn!("Route flag public={} is not a boolean; reading it as truthy/falsy", raw.public);
        }
        let public = truthy(&raw.public);

        let (roles, unmatchable_roles) = match raw.roles {
            Value::Array(items) => {
                let mut roles = Vec::new();
                let mut unmatchable = Vec::new();
                for item in items {
                    match item {
                        Value::String(role) => roles.push(role),
                        other => unmatchable.push(other.to_string()),
                    }
                }
                if !unmatchable.is_empty() {
                    warn!(
                        "Route roles {:?} can never be held; the route denies every session",
                        unmatchable
                    );
                }
                (roles, unmatchable)
            }
            Value::Null => (Vec::new(), Vec::new()),
            // Anything other than a list means "no role requirement".
            other => {
                warn!(
                    "Ignoring malformed route roles {}; treating route as role-free",
                    other
                );
                (Vec::new(), Vec::new())
            }
        };

        Self {
            public,
            roles,
            unmatchable_roles,
        }
    }
}

/// Outcome of one navigation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationDecision {
    Allow,
    /// Leave for the provider's login page, coming back to `redirect_uri`.
    DenyRedirectToLogin { redirect_uri: String },
    DenyRedirectToAccessDenied,
}

impl AuthorizationDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AuthorizationDecision::Allow)
    }
}

/// The slice of the provider session the authorizer needs.
#[async_trait]
pub trait SessionQuery: Send + Sync {
    async fn is_authenticated(&self) -> bool;

    fn roles(&self) -> BTreeSet<String>;

    fn username(&self) -> Option<String>;

    /// Start the login transition, returning to `redirect_uri` afterwards.
    async fn login(&self, redirect_uri: &str) -> Result<(), ProviderError>;
}

/// Imperative in-app navigation.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// `SessionQuery` over an identity provider.
#[derive(Clone)]
pub struct ProviderSession {
    provider: Arc<dyn IdentityProvider>,
}

impl ProviderSession {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl SessionQuery for ProviderSession {
    async fn is_authenticated(&self) -> bool {
        self.provider.is_logged_in().await
    }

    fn roles(&self) -> BTreeSet<String> {
        self.provider.user_roles().into_iter().collect()
    }

    fn username(&self) -> Option<String> {
        self.provider.username().ok()
    }

    async fn login(&self, redirect_uri: &str) -> Result<(), ProviderError> {
        self.provider
            .login(LoginOptions {
                redirect_uri: Some(redirect_uri.to_string()),
            })
            .await
    }
}

/// Decides whether a navigation may proceed.
pub struct RouteAuthorizer {
    session: Arc<dyn SessionQuery>,
    origin: String,
}

impl RouteAuthorizer {
    /// `origin` prefixes the requested path to form the login return URL.
    pub fn new(session: Arc<dyn SessionQuery>, origin: impl Into<String>) -> Self {
        Self {
            session,
            origin: origin.into().trim_end_matches('/').to_string(),
        }
    }

    fn return_url(&self, requested_path: &str) -> String {
        if requested_path.starts_with('/') {
            format!("{}{}", self.origin, requested_path)
        } else {
            format!("{}/{}", self.origin, requested_path)
        }
    }

    /// Evaluate the rules without side effects.
    pub async fn decide(&self, route: &RouteMetadata, requested_path: &str) -> AuthorizationDecision {
        if route.public {
            return AuthorizationDecision::Allow;
        }

        if !self.session.is_authenticated().await {
            return AuthorizationDecision::DenyRedirectToLogin {
                redirect_uri: self.return_url(requested_path),
            };
        }

        if !route.requires_roles() {
            return AuthorizationDecision::Allow;
        }

        if route.roles_satisfied_by(&self.session.roles()) {
            AuthorizationDecision::Allow
        } else {
            AuthorizationDecision::DenyRedirectToAccessDenied
        }
    }

    /// Evaluate the rules and act on a denial. Returns whether navigation proceeds.
    pub async fn can_activate(
        &self,
        route: &RouteMetadata,
        requested_path: &str,
        navigator: &dyn Navigator,
    ) -> bool {
        debug!("🔶 Authorizing {} ({:?})", requested_path, route);

        match self.decide(route, requested_path).await {
            AuthorizationDecision::Allow => {
                debug!("✅ Access to {} allowed", requested_path);
                true
            }
            AuthorizationDecision::DenyRedirectToLogin { redirect_uri } => {
                info!("🔴 Not authenticated, redirecting to login...");
                if let Err(e) = self.session.login(&redirect_uri).await {
                    warn!("Failed to start login: {}", e);
                }
                false
            }
            AuthorizationDecision::DenyRedirectToAccessDenied => {
                info!(
                    "🚫 {} is missing roles {:?} for {}, redirecting to {}",
                    self.session.username().unwrap_or_else(|| "user".to_string()),
                    route.roles,
                    requested_path,
                    ACCESS_DENIED_PATH
                );
                navigator.navigate(ACCESS_DENIED_PATH);
                false
            }
        }
    }
}

//! Text renderings of the application's pages.

mod claims;

pub use claims::{claim_rows, ClaimRow};

use std::fmt::{self, Write};

use chrono::{DateTime, Utc};
use tracing::{error, warn};

use crate::backend::BackendClient;
use crate::provider::{IdentityProvider, Profile};
use crate::router::ViewKind;

pub const PROFILE_LOAD_FAILED: &str = "Failed to load user information";
pub const BACKEND_FETCH_FAILED: &str = "Failed to fetch data from backend";

/// Role that unlocks the admin link in the header.
const ADMIN_ROLE: &str = "admin";

/// What a view may read while rendering.
pub struct ViewContext<'a> {
    pub provider: &'a dyn IdentityProvider,
    pub backend: Option<&'a BackendClient>,
    /// Application origin, for links that leave the shell.
    pub origin: &'a str,
}

/// The header shown above every page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    pub authenticated: bool,
    pub username: Option<String>,
    pub is_admin: bool,
}

impl Header {
    pub async fn load(provider: &dyn IdentityProvider) -> Self {
        if !provider.is_logged_in().await {
            return Self::default();
        }
        Self {
            authenticated: true,
            username: provider.username().ok(),
            is_admin: provider.user_roles().iter().any(|role| role == ADMIN_ROLE),
        }
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "realmgate | / | /user-dashboard")?;
        if self.is_admin {
            write!(f, " | /admin")?;
        }
        write!(f, " | /user-info")?;
        match (self.authenticated, &self.username) {
            (true, Some(username)) => write!(f, "    👤 {} (realmgate logout)", username),
            (true, None) => write!(f, "    (realmgate logout)"),
            (false, _) => write!(f, "    🔑 not logged in"),
        }
    }
}

/// Username and roles, shown by both dashboards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardView {
    pub username: String,
    pub roles: Vec<String>,
}

impl DashboardView {
    pub fn load(provider: &dyn IdentityProvider) -> Self {
        Self {
            username: provider.username().unwrap_or_default(),
            roles: provider.user_roles(),
        }
    }
}

/// Everything the user-info page shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserInfoView {
    pub username: String,
    pub roles: Vec<String>,
    pub claims: Vec<ClaimRow>,
    pub expires_at: Option<DateTime<Utc>>,
    pub profile: Option<Profile>,
    pub backend_message: Option<String>,
    pub error: Option<String>,
}

impl UserInfoView {
    /// Gather session data, the profile and the backend's message.
    ///
    /// A failed profile load stops there; a failed backend call keeps what
    /// was already gathered.
    pub async fn load(provider: &dyn IdentityProvider, backend: Option<&BackendClient>) -> Self {
        let mut view = Self::default();

        view.username = match provider.username() {
            Ok(username) => username,
            Err(err) => {
                error!("Error loading user info: {}", err);
                view.error = Some(PROFILE_LOAD_FAILED.to_string());
                return view;
            }
        };
        view.roles = provider.user_roles();
        if let Some(claims) = provider.token_parsed() {
            view.claims = claim_rows(&claims);
            view.expires_at = claims.exp().and_then(|exp| DateTime::<Utc>::from_timestamp(exp, 0));
        }

        match provider.load_user_profile().await {
            Ok(profile) => view.profile = Some(profile),
            Err(err) => {
                error!("Error loading user info: {}", err);
                view.error = Some(PROFILE_LOAD_FAILED.to_string());
                return view;
            }
        }

        if let Some(backend) = backend {
            match backend.get_user_info().await {
                Ok(message) => view.backend_message = Some(message),
                Err(err) => {
                    warn!("Error fetching backend data: {:#}", err);
                    view.error = Some(BACKEND_FETCH_FAILED.to_string());
                }
            }
        }

        view
    }
}

impl fmt::Display for UserInfoView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "User information")?;
        if let Some(error) = &self.error {
            writeln!(f, "❌ {}", error)?;
        }
        if !self.username.is_empty() {
            writeln!(f, "   Username: {}", self.username)?;
        }
        if !self.roles.is_empty() {
            writeln!(f, "   Roles: {}", self.roles.join(", "))?;
        }
        if let Some(expires_at) = self.expires_at {
            writeln!(f, "   Token expires: {}", expires_at.to_rfc3339())?;
        }

        if let Some(profile) = &self.profile {
            writeln!(f, "\nProfile")?;
            let fields = [
                ("Email", profile.email.clone()),
                ("First name", profile.first_name.clone()),
                ("Last name", profile.last_name.clone()),
                ("Email verified", profile.email_verified.map(|v| v.to_string())),
                (
                    "Created",
                    profile
                        .created_timestamp
                        .and_then(DateTime::<Utc>::from_timestamp_millis)
                        .map(|at| at.to_rfc3339()),
                ),
            ];
            for (label, value) in fields {
                if let Some(value) = value {
                    writeln!(f, "   {}: {}", label, value)?;
                }
            }
        }

        if !self.claims.is_empty() {
            writeln!(f, "\nToken claims")?;
            for claim in &self.claims {
                // Pretty-printed objects keep their indentation under the key.
                let value = claim.value.replace('\n', "\n      ");
                writeln!(f, "   {}: {}", claim.key, value)?;
            }
        }

        if let Some(message) = &self.backend_message {
            writeln!(f, "\nBackend says")?;
            writeln!(f, "   {}", message)?;
        }
        Ok(())
    }
}

fn render_dashboard(title: &str, dashboard: &DashboardView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "   Welcome, {}!", dashboard.username);
    let _ = writeln!(out, "   Roles: {}", dashboard.roles.join(", "));
    out
}

/// Render a view's body as text.
pub async fn render(view: ViewKind, ctx: &ViewContext<'_>) -> String {
    match view {
        ViewKind::Home => {
            if ctx.provider.is_logged_in().await {
                "Home\n   ✅ You are logged in.\n   Go to your dashboard: realmgate open /user-dashboard\n"
                    .to_string()
            } else {
                format!(
                    "Home\n   🔑 You are not logged in.\n   Log in: realmgate open /user-dashboard (returns to {}/user-dashboard)\n",
                    ctx.origin.trim_end_matches('/')
                )
            }
        }
        ViewKind::UserDashboard => {
            render_dashboard("User dashboard", &DashboardView::load(ctx.provider))
        }
        ViewKind::AdminDashboard => {
            render_dashboard("Admin dashboard", &DashboardView::load(ctx.provider))
        }
        ViewKind::UserInfo => UserInfoView::load(ctx.provider, ctx.backend)
            .await
            .to_string(),
        ViewKind::AccessDenied => {
            "Access denied\n   ⛔ You do not have the roles required to view this page.\n   Back to home: realmgate open /\n"
                .to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BearerPolicy;
    use crate::config::InitConfig;
    use crate::http::RetryPolicy;
    use crate::provider::{LoginOptions, ProviderError, TokenClaims};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;
    use url::Url;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Clone)]
    struct FakeProvider {
        logged_in: bool,
        username: Option<&'static str>,
        roles: Vec<&'static str>,
        profile_ok: bool,
    }

    impl FakeProvider {
        fn alice() -> Self {
            Self {
                logged_in: true,
                username: Some("alice"),
                roles: vec!["user", "admin"],
                profile_ok: true,
            }
        }
    }

    #[async_trait]
    impl IdentityProvider for FakeProvider {
        async fn init(&self, _options: &InitConfig) -> Result<bool, ProviderError> {
            Ok(self.logged_in)
        }
        async fn is_logged_in(&self) -> bool {
            self.logged_in
        }
        async fn login(&self, _options: LoginOptions) -> Result<(), ProviderError> {
            Ok(())
        }
        async fn logout(&self, _redirect_uri: Option<String>) -> Result<(), ProviderError> {
            Ok(())
        }
        fn username(&self) -> Result<String, ProviderError> {
            self.username
                .map(str::to_string)
                .ok_or(ProviderError::ProfileNotLoaded)
        }
        fn user_roles(&self) -> Vec<String> {
            self.roles.iter().map(|r| r.to_string()).collect()
        }
        async fn load_user_profile(&self) -> Result<Profile, ProviderError> {
            if !self.profile_ok {
                return Err(ProviderError::Request("connection refused".to_string()));
            }
            Ok(Profile {
                username: self.username.map(str::to_string),
                email: Some("alice@example.com".to_string()),
                ..Profile::default()
            })
        }
        async fn token(&self) -> Result<String, ProviderError> {
            Ok("token-1".to_string())
        }
        fn token_parsed(&self) -> Option<TokenClaims> {
            let claims = json!({
                "exp": 1_900_000_000,
                "jti": "abc",
                "preferred_username": "alice",
                "realm_access": {"roles": ["user"]}
            });
            claims.as_object().cloned().map(TokenClaims::from_map)
        }
    }

    fn backend(server: &MockServer, provider: FakeProvider) -> BackendClient {
        BackendClient::new(
            Url::parse(&format!("{}/api/", server.uri())).unwrap(),
            BearerPolicy::default(),
            Arc::new(provider),
        )
        .unwrap()
        .with_retry_policy(RetryPolicy::none())
    }

    #[tokio::test]
    async fn test_header_admin_flag() {
        let header = Header::load(&FakeProvider::alice()).await;
        assert!(header.authenticated);
        assert!(header.is_admin);
        assert_eq!(header.username.as_deref(), Some("alice"));
        assert!(header.to_string().contains("/admin"));

        let guest = FakeProvider {
            logged_in: false,
            ..FakeProvider::alice()
        };
        let header = Header::load(&guest).await;
        assert_eq!(header, Header::default());
        assert!(!header.to_string().contains("/admin"));
    }

    #[tokio::test]
    async fn test_user_info_with_backend_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/user-info"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Hello alice"))
            .mount(&server)
            .await;

        let provider = FakeProvider::alice();
        let client = backend(&server, provider.clone());
        let view = UserInfoView::load(&provider, Some(&client)).await;

        assert_eq!(view.username, "alice");
        assert_eq!(view.backend_message.as_deref(), Some("Hello alice"));
        assert!(view.error.is_none());
        assert!(view.expires_at.is_some());
        let keys: Vec<_> = view.claims.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["preferred_username", "realm_access"]);

        let text = view.to_string();
        assert!(text.contains("alice@example.com"));
        assert!(text.contains("Hello alice"));
    }

    #[tokio::test]
    async fn test_user_info_backend_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/user-info"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let provider = FakeProvider::alice();
        let client = backend(&server, provider.clone());
        let view = UserInfoView::load(&provider, Some(&client)).await;

        assert_eq!(view.error.as_deref(), Some(BACKEND_FETCH_FAILED));
        assert!(view.profile.is_some());
        assert!(view.backend_message.is_none());
    }

    #[tokio::test]
    async fn test_user_info_profile_failure() {
        let provider = FakeProvider {
            profile_ok: false,
            ..FakeProvider::alice()
        };
        let view = UserInfoView::load(&provider, None).await;
        assert_eq!(view.error.as_deref(), Some(PROFILE_LOAD_FAILED));
        assert!(view.profile.is_none());
        assert!(view.to_string().contains(PROFILE_LOAD_FAILED));
    }

    #[tokio::test]
    async fn test_render_views() {
        let provider = FakeProvider::alice();
        let ctx = ViewContext {
            provider: &provider,
            backend: None,
            origin: "http://localhost:4200",
        };

        let dashboard = render(ViewKind::AdminDashboard, &ctx).await;
        assert!(dashboard.contains("Welcome, alice!"));
        assert!(dashboard.contains("user, admin"));

        let denied = render(ViewKind::AccessDenied, &ctx).await;
        assert!(denied.starts_with("Access denied"));

        let guest = FakeProvider {
            logged_in: false,
            ..FakeProvider::alice()
        };
        let ctx = ViewContext {
            provider: &guest,
            backend: None,
            origin: "http://localhost:4200/",
        };
        let home = render(ViewKind::Home, &ctx).await;
        assert!(home.contains("http://localhost:4200/user-dashboard"));
    }
}

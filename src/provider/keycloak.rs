//! Keycloak-compatible OpenID Connect client.
//!
//! One `KeycloakClient` lives for one page load. `init` either finishes a
//! login callback found on the page URL or, with `login-required`, starts the
//! authorization-code + PKCE redirect.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, info, warn};
use url::Url;

use super::pkce::CallbackStore;
use super::{IdentityProvider, LoginOptions, Profile, ProviderError, Redirector, TokenClaims};
use crate::config::{InitConfig, OnLoad, ResponseMode};
use crate::http::{self, RetryPolicy};

const AUTH_ENDPOINT: &str = "protocol/openid-connect/auth";
const TOKEN_ENDPOINT: &str = "protocol/openid-connect/token";
const LOGOUT_ENDPOINT: &str = "protocol/openid-connect/logout";
const ACCOUNT_ENDPOINT: &str = "account";

/// Parameters the provider appends to the redirect URI.
const CALLBACK_PARAMS: &[&str] = &[
    "code",
    "state",
    "session_state",
    "error",
    "error_description",
    "error_uri",
    "iss",
];

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Tokens from the code exchange.
#[derive(Clone)]
struct Tokens {
    access_token: String,
    id_token: Option<String>,
    refresh_token: Option<String>,
}

impl std::fmt::Debug for Tokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tokens")
            .field("access_token", &"[REDACTED]")
            .field("id_token", &self.id_token.as_ref().map(|_| "[REDACTED]"))
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

#[derive(Debug, Default)]
struct ClientState {
    options: Option<InitConfig>,
    tokens: Option<Tokens>,
    claims: Option<TokenClaims>,
    profile: Option<Profile>,
}

/// Authorization response parsed from the page URL.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Callback {
    state: String,
    code: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl Callback {
    fn parse(location: &Url, mode: ResponseMode) -> Option<Self> {
        let pairs: Vec<(String, String)> = match mode {
            ResponseMode::Query => location.query_pairs().into_owned().collect(),
            ResponseMode::Fragment => url::form_urlencoded::parse(
                location.fragment().unwrap_or_default().as_bytes(),
            )
            .into_owned()
            .collect(),
        };
        let get = |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        };

        let state = get("state")?;
        let code = get("code");
        let error = get("error");
        if code.is_none() && error.is_none() {
            return None;
        }

        Some(Self {
            state,
            code,
            error,
            error_description: get("error_description"),
        })
    }
}

/// The page URL without any authorization-response parameters.
fn strip_callback_params(location: &Url) -> Url {
    let mut clean = location.clone();
    let kept: Vec<(String, String)> = location
        .query_pairs()
        .into_owned()
        .filter(|(k, _)| !CALLBACK_PARAMS.contains(&k.as_str()))
        .collect();

    if kept.is_empty() {
        clean.set_query(None);
    } else {
        clean.query_pairs_mut().clear().extend_pairs(kept);
    }

    if let Some(fragment) = location.fragment() {
        let has_callback = url::form_urlencoded::parse(fragment.as_bytes())
            .any(|(k, _)| CALLBACK_PARAMS.contains(&k.as_ref()));
        if has_callback {
            clean.set_fragment(None);
        }
    }
    clean
}

/// OpenID Connect client for a Keycloak realm.
pub struct KeycloakClient {
    http: Client,
    location: Url,
    redirector: Arc<dyn Redirector>,
    callbacks: CallbackStore,
    retry: RetryPolicy,
    state: RwLock<ClientState>,
}

impl KeycloakClient {
    /// Create a client for the page currently at `location`.
    pub fn new(
        location: Url,
        redirector: Arc<dyn Redirector>,
        callbacks: CallbackStore,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            http: http::build_client()?,
            location,
            redirector,
            callbacks,
            retry: RetryPolicy::default(),
            state: RwLock::new(ClientState::default()),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The page URL this client was created for.
    pub fn location(&self) -> &Url {
        &self.location
    }

    /// The page URL with any login callback parameters removed.
    pub fn clean_location(&self) -> Url {
        strip_callback_params(&self.location)
    }

    /// Adopt init options without running the on-load flow.
    ///
    /// Enough for `logout` on a page that never finished a login.
    pub fn configure(&self, options: &InitConfig) -> Result<(), ProviderError> {
        self.write_state(|state| state.options = Some(options.clone()))
    }

    fn options(&self) -> Result<InitConfig, ProviderError> {
        self.read_state(|state| state.options.clone())?
            .ok_or(ProviderError::NotInitialized)
    }

    fn read_state<T>(&self, f: impl FnOnce(&ClientState) -> T) -> Result<T, ProviderError> {
        self.state
            .read()
            .map(|state| f(&state))
            .map_err(|_| ProviderError::Request("client state poisoned".to_string()))
    }

    fn write_state(&self, f: impl FnOnce(&mut ClientState)) -> Result<(), ProviderError> {
        self.state
            .write()
            .map(|mut state| f(&mut state))
            .map_err(|_| ProviderError::Request("client state poisoned".to_string()))
    }

    fn endpoint(options: &InitConfig, relative: &str) -> Result<Url, ProviderError> {
        options
            .config
            .endpoint(relative)
            .map_err(|e| ProviderError::Config(format!("{:#}", e)))
    }

    /// Build the authorization URL for a pending login.
    fn authorize_url(
        options: &InitConfig,
        callback: &super::CallbackState,
    ) -> Result<Url, ProviderError> {
        let mut url = Self::endpoint(options, AUTH_ENDPOINT)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &options.config.client_id)
                .append_pair("redirect_uri", &callback.redirect_uri)
                .append_pair("state", &callback.state)
                .append_pair("response_mode", options.response_mode.as_str())
                .append_pair("response_type", "code")
                .append_pair("scope", "openid");
            if let Some(nonce) = &callback.nonce {
                query.append_pair("nonce", nonce);
            }
            if let Some(challenge) = &callback.code_challenge {
                query
                    .append_pair("code_challenge", challenge)
                    .append_pair("code_challenge_method", "S256");
            }
        }
        Ok(url)
    }

    /// Finish a login: validate the callback and exchange the code.
    async fn process_callback(
        &self,
        options: &InitConfig,
        callback: Callback,
    ) -> Result<(), ProviderError> {
        info!("🔑 Processing login callback...");

        let pending = self
            .callbacks
            .take(&callback.state)
            .ok_or_else(|| ProviderError::InvalidCallback("Unknown state".to_string()))?;

        if let Some(error) = &callback.error {
            let mut parts = vec![format!("({})", error)];
            if let Some(desc) = &callback.error_description {
                parts.push(desc.clone());
            }
            return Err(ProviderError::LoginFailed(parts.join(" ")));
        }

        let code = callback
            .code
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ProviderError::InvalidCallback("No code".to_string()))?;

        let token_url = Self::endpoint(options, TOKEN_ENDPOINT)?;
        let mut form = vec![
            ("grant_type", "authorization_code".to_string()),
            ("code", code),
            ("client_id", options.config.client_id.clone()),
            ("redirect_uri", pending.redirect_uri.clone()),
        ];
        if let Some(verifier) = pending.code_verifier {
            form.push(("code_verifier", verifier));
        }

        // Authorization codes are single use; never resend the exchange.
        let response = http::send_with_retry(RetryPolicy::none(), || {
            self.http.post(token_url.clone()).form(&form)
        })
        .await
        .map_err(|e| ProviderError::request(format!("{:#}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Token exchange failed with status {}: {}", status, body);
            return Err(ProviderError::LoginFailed(format!(
                "token endpoint returned {}",
                status
            )));
        }

        let token: TokenResponse = response.json().await.map_err(ProviderError::request)?;
        if token.access_token.is_empty() {
            return Err(ProviderError::LoginFailed(
                "Token response does not contain a valid 'access_token' field".to_string(),
            ));
        }

        let claims = TokenClaims::decode(&token.access_token)?;
        debug!("Token subject: {:?}", claims.subject());

        self.write_state(|state| {
            state.tokens = Some(Tokens {
                access_token: token.access_token,
                id_token: token.id_token,
                refresh_token: token.refresh_token,
            });
            state.claims = Some(claims);
        })?;

        info!("✅ Login callback processed");
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for KeycloakClient {
    async fn init(&self, options: &InitConfig) -> Result<bool, ProviderError> {
        self.configure(options)?;

        if options.check_login_iframe {
            warn!("⚠️  Session iframe checks are not supported; ignoring checkLoginIframe");
        }

        let authenticated = match Callback::parse(&self.location, options.response_mode) {
            Some(callback) => {
                self.process_callback(options, callback).await?;
                true
            }
            None => match options.on_load {
                OnLoad::LoginRequired => {
                    info!("🔐 No session on page load, redirecting to login...");
                    self.login(LoginOptions::default()).await?;
                    false
                }
                OnLoad::CheckSso => false,
            },
        };

        if authenticated && options.load_user_profile_at_startup {
            self.load_user_profile().await?;
        }

        Ok(authenticated)
    }

    async fn is_logged_in(&self) -> bool {
        self.read_state(|state| state.tokens.is_some())
            .unwrap_or(false)
    }

    async fn login(&self, options: LoginOptions) -> Result<(), ProviderError> {
        let init = self.options()?;
        let redirect_uri = options
            .redirect_uri
            .unwrap_or_else(|| self.clean_location().to_string());

        let pending = self
            .callbacks
            .create(&redirect_uri, init.pkce_method.is_some(), init.use_nonce)
            .map_err(|e| ProviderError::Request(format!("{:#}", e)))?;

        let url = Self::authorize_url(&init, &pending)?;
        debug!("Redirecting to {}", url);
        self.redirector.redirect(&url);
        Ok(())
    }

    async fn logout(&self, redirect_uri: Option<String>) -> Result<(), ProviderError> {
        let init = self.options()?;
        let id_token = self.read_state(|state| {
            state
                .tokens
                .as_ref()
                .and_then(|tokens| tokens.id_token.clone())
        })?;

        let redirect_uri = redirect_uri.unwrap_or_else(|| {
            let mut origin = self.clean_location();
            origin.set_path("/");
            origin.set_query(None);
            origin.to_string()
        });

        let mut url = Self::endpoint(&init, LOGOUT_ENDPOINT)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &init.config.client_id)
                .append_pair("post_logout_redirect_uri", &redirect_uri);
            if let Some(hint) = &id_token {
                query.append_pair("id_token_hint", hint);
            }
        }

        self.write_state(|state| {
            state.tokens = None;
            state.claims = None;
            state.profile = None;
        })?;

        info!("👋 Logging out");
        self.redirector.redirect(&url);
        Ok(())
    }

    fn username(&self) -> Result<String, ProviderError> {
        self.read_state(|state| {
            state
                .profile
                .as_ref()
                .and_then(|profile| profile.username.clone())
                .or_else(|| {
                    state
                        .claims
                        .as_ref()
                        .and_then(|claims| claims.preferred_username().map(str::to_string))
                })
        })?
        .ok_or(ProviderError::ProfileNotLoaded)
    }

    fn user_roles(&self) -> Vec<String> {
        self.read_state(|state| {
            state
                .claims
                .as_ref()
                .map(TokenClaims::all_roles)
                .unwrap_or_default()
        })
        .unwrap_or_default()
    }

    async fn load_user_profile(&self) -> Result<Profile, ProviderError> {
        let init = self.options()?;
        let token = self.token().await?;
        let url = Self::endpoint(&init, ACCOUNT_ENDPOINT)?;

        debug!("Loading user profile from {}", url);
        let response = http::send_with_retry(self.retry, || {
            self.http
                .get(url.clone())
                .header("Accept", "application/json")
                .bearer_auth(&token)
        })
        .await
        .map_err(|e| ProviderError::request(format!("{:#}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Request(format!(
                "profile endpoint returned {}",
                status
            )));
        }

        let profile: Profile = response.json().await.map_err(ProviderError::request)?;
        self.write_state(|state| state.profile = Some(profile.clone()))?;
        Ok(profile)
    }

    async fn token(&self) -> Result<String, ProviderError> {
        self.read_state(|state| {
            state
                .tokens
                .as_ref()
                .map(|tokens| tokens.access_token.clone())
        })?
        .ok_or(ProviderError::NotAuthenticated)
    }

    fn token_parsed(&self) -> Option<TokenClaims> {
        self.read_state(|state| state.claims.clone()).ok().flatten()
    }
}

impl std::fmt::Debug for KeycloakClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeycloakClient")
            .field("location", &self.location.as_str())
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;
    use crate::provider::token::encode_test_token;
    use crate::provider::PendingRedirect;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Harness {
        _dir: TempDir,
        store: CallbackStore,
        redirect: Arc<PendingRedirect>,
    }

    impl Harness {
        fn new() -> Self {
            let dir = tempdir().unwrap();
            let store = CallbackStore::new(dir.path()).unwrap();
            Self {
                _dir: dir,
                store,
                redirect: Arc::new(PendingRedirect::new()),
            }
        }

        fn client(&self, location: &str) -> KeycloakClient {
            KeycloakClient::new(
                Url::parse(location).unwrap(),
                self.redirect.clone(),
                self.store.clone(),
            )
            .unwrap()
            .with_retry_policy(RetryPolicy {
                max_retries: 1,
                base_delay: Duration::from_millis(5),
            })
        }
    }

    fn init_config(server: &MockServer) -> InitConfig {
        InitConfig::forced_login(ProviderConfig {
            url: server.uri(),
            realm: "master".to_string(),
            client_id: "bds-application".to_string(),
        })
    }

    fn access_token() -> String {
        encode_test_token(&json!({
            "exp": 1_900_000_000,
            "iat": 1_899_999_700,
            "preferred_username": "alice",
            "realm_access": { "roles": ["user"] },
            "resource_access": { "bds-application": { "roles": ["admin"] } },
        }))
    }

    #[test]
    fn test_callback_parse_query() {
        let url = Url::parse("http://localhost:4200/user-info?state=abc&code=xyz").unwrap();
        let callback = Callback::parse(&url, ResponseMode::Query).unwrap();
        assert_eq!(callback.state, "abc");
        assert_eq!(callback.code.as_deref(), Some("xyz"));

        assert!(Callback::parse(&url, ResponseMode::Fragment).is_none());
        let plain = Url::parse("http://localhost:4200/user-info?tab=1").unwrap();
        assert!(Callback::parse(&plain, ResponseMode::Query).is_none());
    }

    #[test]
    fn test_callback_parse_fragment_error() {
        let url = Url::parse(
            "http://localhost:4200/#state=abc&error=access_denied&error_description=nope",
        )
        .unwrap();
        let callback = Callback::parse(&url, ResponseMode::Fragment).unwrap();
        assert_eq!(callback.error.as_deref(), Some("access_denied"));
        assert_eq!(callback.error_description.as_deref(), Some("nope"));
    }

    #[test]
    fn test_strip_callback_params_keeps_app_query() {
        let url = Url::parse(
            "http://localhost:4200/user-info?tab=claims&state=abc&session_state=s&code=xyz",
        )
        .unwrap();
        assert_eq!(
            strip_callback_params(&url).as_str(),
            "http://localhost:4200/user-info?tab=claims"
        );

        let url = Url::parse("http://localhost:4200/admin/dashboard?state=a&code=b").unwrap();
        assert_eq!(
            strip_callback_params(&url).as_str(),
            "http://localhost:4200/admin/dashboard"
        );
    }

    #[tokio::test]
    async fn test_init_without_callback_redirects_to_login() {
        let server = MockServer::start().await;
        let harness = Harness::new();
        let client = harness.client("http://localhost:4200/user-info");

        let authenticated = client.init(&init_config(&server)).await.unwrap();
        assert!(!authenticated);
        assert!(!client.is_logged_in().await);

        let target = harness.redirect.take().unwrap();
        assert!(target
            .as_str()
            .starts_with(&format!("{}/realms/master/{}", server.uri(), AUTH_ENDPOINT)));
        let params: Vec<(String, String)> = target.query_pairs().into_owned().collect();
        let get = |k: &str| {
            params
                .iter()
                .find(|(key, _)| key == k)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("client_id"), Some("bds-application"));
        assert_eq!(get("redirect_uri"), Some("http://localhost:4200/user-info"));
        assert_eq!(get("response_mode"), Some("query"));
        assert_eq!(get("code_challenge_method"), Some("S256"));
        assert!(get("nonce").is_none());
        assert!(get("state").is_some());
    }

    #[tokio::test]
    async fn test_init_check_sso_stays_anonymous() {
        let server = MockServer::start().await;
        let harness = Harness::new();
        let client = harness.client("http://localhost:4200/");

        let mut options = init_config(&server);
        options.on_load = OnLoad::CheckSso;

        assert!(!client.init(&options).await.unwrap());
        assert!(!harness.redirect.is_pending());
    }

    #[tokio::test]
    async fn test_init_processes_callback_and_loads_profile() {
        let server = MockServer::start().await;
        let harness = Harness::new();

        Mock::given(method("POST"))
            .and(path(format!("/realms/master/{}", TOKEN_ENDPOINT)))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=the-code"))
            .and(body_string_contains("code_verifier="))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": access_token(),
                "id_token": "id-token",
                "token_type": "Bearer",
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/realms/master/account"))
            .and(header("Accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "username": "alice",
                "email": "alice@example.com",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let pending = harness
            .store
            .create("http://localhost:4200/user-info", true, false)
            .unwrap();
        let client = harness.client(&format!(
            "http://localhost:4200/user-info?state={}&session_state=s&code=the-code",
            pending.state
        ));

        let authenticated = client.init(&init_config(&server)).await.unwrap();
        assert!(authenticated);
        assert!(client.is_logged_in().await);
        assert!(!harness.redirect.is_pending());
        assert_eq!(client.username().unwrap(), "alice");
        assert_eq!(client.user_roles(), vec!["user", "admin"]);
        assert_eq!(client.token().await.unwrap(), access_token());
        assert_eq!(client.token_parsed().unwrap().exp(), Some(1_900_000_000));
        assert_eq!(
            client.clean_location().as_str(),
            "http://localhost:4200/user-info"
        );
    }

    #[tokio::test]
    async fn test_init_rejects_unknown_state() {
        let server = MockServer::start().await;
        let harness = Harness::new();
        harness
            .store
            .create("http://localhost:4200/", true, false)
            .unwrap();
        let client = harness.client("http://localhost:4200/?state=forged&code=the-code");

        let err = client.init(&init_config(&server)).await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidCallback(_)));
        assert!(!client.is_logged_in().await);
    }

    #[tokio::test]
    async fn test_init_surfaces_provider_error_callback() {
        let server = MockServer::start().await;
        let harness = Harness::new();
        let pending = harness
            .store
            .create("http://localhost:4200/", true, false)
            .unwrap();
        let client = harness.client(&format!(
            "http://localhost:4200/?state={}&error=access_denied&error_description=denied",
            pending.state
        ));

        let err = client.init(&init_config(&server)).await.unwrap_err();
        match err {
            ProviderError::LoginFailed(msg) => assert_eq!(msg, "(access_denied) denied"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_token_exchange_failure() {
        let server = MockServer::start().await;
        let harness = Harness::new();

        Mock::given(method("POST"))
            .and(path(format!("/realms/master/{}", TOKEN_ENDPOINT)))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
            .expect(1)
            .mount(&server)
            .await;

        let pending = harness
            .store
            .create("http://localhost:4200/", true, false)
            .unwrap();
        let client = harness.client(&format!(
            "http://localhost:4200/?state={}&code=stale",
            pending.state
        ));

        let err = client.init(&init_config(&server)).await.unwrap_err();
        assert!(matches!(err, ProviderError::LoginFailed(_)));
    }

    #[tokio::test]
    async fn test_logout_clears_session_and_redirects() {
        let server = MockServer::start().await;
        let harness = Harness::new();

        Mock::given(method("POST"))
            .and(path(format!("/realms/master/{}", TOKEN_ENDPOINT)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": access_token(),
                "id_token": "id-token",
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/realms/master/account"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"username": "alice"})))
            .mount(&server)
            .await;

        let pending = harness
            .store
            .create("http://localhost:4200/user-dashboard", true, false)
            .unwrap();
        let client = harness.client(&format!(
            "http://localhost:4200/user-dashboard?state={}&code=c",
            pending.state
        ));
        assert!(client.init(&init_config(&server)).await.unwrap());

        client.logout(None).await.unwrap();
        assert!(!client.is_logged_in().await);
        assert!(client.token_parsed().is_none());

        let target = harness.redirect.take().unwrap();
        assert!(target.path().ends_with(LOGOUT_ENDPOINT));
        let params: Vec<(String, String)> = target.query_pairs().into_owned().collect();
        assert!(params.contains(&(
            "post_logout_redirect_uri".to_string(),
            "http://localhost:4200/".to_string()
        )));
        assert!(params.contains(&("id_token_hint".to_string(), "id-token".to_string())));
    }

    #[tokio::test]
    async fn test_logout_after_configure_only() {
        let server = MockServer::start().await;
        let harness = Harness::new();
        let client = harness.client("http://localhost:4200/user-info");

        assert!(matches!(
            client.logout(None).await,
            Err(ProviderError::NotInitialized)
        ));

        client.configure(&init_config(&server)).unwrap();
        client.logout(None).await.unwrap();

        let target = harness.redirect.take().unwrap();
        let params: Vec<(String, String)> = target.query_pairs().into_owned().collect();
        assert!(params.iter().all(|(key, _)| key != "id_token_hint"));
        assert!(params.contains(&("client_id".to_string(), "bds-application".to_string())));
    }

    #[tokio::test]
    async fn test_profile_requires_session() {
        let server = MockServer::start().await;
        let harness = Harness::new();
        let client = harness.client("http://localhost:4200/");
        let mut options = init_config(&server);
        options.on_load = OnLoad::CheckSso;
        client.init(&options).await.unwrap();

        assert!(matches!(
            client.load_user_profile().await,
            Err(ProviderError::NotAuthenticated)
        ));
        assert!(matches!(
            client.username(),
            Err(ProviderError::ProfileNotLoaded)
        ));
        assert!(client.user_roles().is_empty());
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let tokens = Tokens {
            access_token: "secret-token-123".to_string(),
            id_token: Some("secret-id".to_string()),
            refresh_token: None,
        };
        let debug_str = format!("{:?}", tokens);
        assert!(!debug_str.contains("secret-token-123"));
        assert!(!debug_str.contains("secret-id"));
        assert!(debug_str.contains("[REDACTED]"));
    }
}

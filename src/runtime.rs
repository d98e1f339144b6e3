//! Process-wide runtime singleton.
//!
//! One process renders one page: the command layer assembles a `Runtime` for
//! the page URL, stores it with `set_runtime`, and everything after startup
//! reads it through `get_runtime`.
//!
//! ```ignore
//! let runtime = Runtime::build(config, location)?;
//! set_runtime(runtime);
//!
//! if let Some(rt) = get_runtime() {
//!     rt.guard.ensure().await?;
//!     rt.router.navigate("/user-info").await?;
//! }
//! ```

use std::sync::{Arc, OnceLock};

use anyhow::Result;
use url::Url;

use crate::authz::{ProviderSession, RouteAuthorizer};
use crate::backend::{BackendClient, BearerPolicy};
use crate::config::AppConfig;
use crate::provider::{CallbackStore, IdentityProvider, KeycloakClient, PendingRedirect};
use crate::router::{RouteTable, Router};
use crate::startup::{BootstrapGuard, StartupHooks};

/// Everything one page load needs.
pub struct Runtime {
    pub config: AppConfig,
    pub provider: Arc<KeycloakClient>,
    pub guard: Arc<BootstrapGuard>,
    pub router: Router,
    pub backend: BackendClient,
    /// Where the provider asked the browser to go, if anywhere.
    pub redirect: Arc<PendingRedirect>,
}

impl Runtime {
    /// Wire up the provider, bootstrap guard, router and backend client for
    /// the page at `location`.
    pub fn build(config: AppConfig, location: Url) -> Result<Self> {
        let redirect = Arc::new(PendingRedirect::new());
        let callbacks = CallbackStore::new(&config.cache_dir)?;
        let provider = Arc::new(KeycloakClient::new(
            location,
            redirect.clone(),
            callbacks,
        )?);
        let identity: Arc<dyn IdentityProvider> = provider.clone();

        let init = config.init_config();
        let policy = BearerPolicy::new(init.bearer_excluded_urls.iter().cloned());
        let guard = Arc::new(BootstrapGuard::new(identity.clone(), init));

        let table = RouteTable::load_or_default(config.routes_file.as_deref())?;
        let authorizer = Arc::new(RouteAuthorizer::new(
            Arc::new(ProviderSession::new(identity.clone())),
            config.origin.clone(),
        ));
        let router = Router::new(table, authorizer);

        let backend = BackendClient::new(config.api_base_url()?, policy, identity)?;

        Ok(Self {
            config,
            provider,
            guard,
            router,
            backend,
            redirect,
        })
    }

    /// Startup hooks that must finish before the first navigation.
    pub fn startup_hooks(&self) -> StartupHooks {
        let mut hooks = StartupHooks::new();
        hooks.register("identity-provider", self.guard.hook());
        hooks
    }
}

/// Global runtime singleton.
static RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// Set the global runtime. Later calls are ignored.
pub fn set_runtime(runtime: Runtime) {
    if RUNTIME.set(runtime).is_err() {
        tracing::warn!(
            "Attempting to set runtime when one is already configured. Keeping existing."
        );
    }
}

/// The global runtime, if `set_runtime()` has been called.
pub fn get_runtime() -> Option<&'static Runtime> {
    RUNTIME.get()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;
    use crate::startup::Phase;
    use tempfile::tempdir;

    fn config(cache_dir: &std::path::Path) -> AppConfig {
        AppConfig {
            provider: ProviderConfig::default(),
            origin: "http://localhost:4200".to_string(),
            api_url: "/api".to_string(),
            cache_dir: cache_dir.to_path_buf(),
            routes_file: None,
        }
    }

    #[test]
    fn test_build_wires_page() {
        let dir = tempdir().unwrap();
        let runtime = Runtime::build(
            config(dir.path()),
            Url::parse("http://localhost:4200/user-info").unwrap(),
        )
        .unwrap();

        assert_eq!(runtime.provider.location().path(), "/user-info");
        assert!(matches!(runtime.guard.phase(), Phase::Uninitialized));
        assert!(runtime.router.table().find("admin/dashboard").is_some());
        assert!(!runtime.redirect.is_pending());
        assert_eq!(runtime.startup_hooks().len(), 1);
    }

    #[test]
    fn test_build_with_route_file() {
        let dir = tempdir().unwrap();
        let routes = dir.path().join("routes.json");
        std::fs::write(
            &routes,
            r#"[{"path": "", "view": "home"}, {"path": "reports", "view": "user-dashboard", "guarded": true, "data": {"roles": ["analyst"]}}]"#,
        )
        .unwrap();

        let mut config = config(dir.path());
        config.routes_file = Some(routes);
        let runtime =
            Runtime::build(config, Url::parse("http://localhost:4200/").unwrap()).unwrap();

        let route = runtime.router.table().find("reports").unwrap();
        assert_eq!(route.data.roles, vec!["analyst".to_string()]);
        assert!(runtime.router.table().find("user-info").is_none());
    }
}

//! Route table and navigation pipeline.
//!
//! Routes are declared as a tree (like the host app's routing module) and
//! flattened into full paths. Navigating resolves redirects, runs the route
//! authorizer on guarded routes and follows in-app navigations the
//! authorizer requests (the access-denied page).

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::authz::{Navigator, RouteAuthorizer, RouteMetadata};

/// Redirect/navigation hops before giving up
const MAX_HOPS: usize = 10;

/// Pages the shell can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewKind {
    Home,
    UserDashboard,
    AdminDashboard,
    UserInfo,
    AccessDenied,
}

/// A route as declared in the routing configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteConfig {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<ViewKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
    /// Run the route authorizer before activating.
    #[serde(default)]
    pub guarded: bool,
    #[serde(default)]
    pub data: RouteMetadata,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RouteConfig>,
}

impl RouteConfig {
    fn view(path: &str, view: ViewKind) -> Self {
        Self {
            path: path.to_string(),
            view: Some(view),
            ..Self::default()
        }
    }

    fn guarded_view(path: &str, view: ViewKind, data: RouteMetadata) -> Self {
        Self {
            guarded: true,
            data,
            ..Self::view(path, view)
        }
    }

    fn redirect(path: &str, to: &str) -> Self {
        Self {
            path: path.to_string(),
            redirect_to: Some(to.to_string()),
            ..Self::default()
        }
    }
}

/// The application's routes.
pub fn default_routes() -> Vec<RouteConfig> {
    vec![
        // Forced login means every visitor already has a session here.
        RouteConfig::view("", ViewKind::Home),
        RouteConfig::redirect("home", ""),
        RouteConfig::guarded_view(
            "user-dashboard",
            ViewKind::UserDashboard,
            RouteMetadata::protected(),
        ),
        RouteConfig {
            path: "admin".to_string(),
            children: vec![
                RouteConfig::redirect("", "dashboard"),
                RouteConfig::guarded_view(
                    "dashboard",
                    ViewKind::AdminDashboard,
                    RouteMetadata::with_roles(["admin"]),
                ),
            ],
            ..RouteConfig::default()
        },
        RouteConfig::guarded_view(
            "user-info",
            ViewKind::UserInfo,
            RouteMetadata::with_roles(["user"]),
        ),
        // Public so a denied user can read the error without logging in again.
        RouteConfig::guarded_view(
            "access-denied",
            ViewKind::AccessDenied,
            RouteMetadata::public(),
        ),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteTarget {
    View(ViewKind),
    /// Full path to continue at.
    Redirect(String),
}

/// A route flattened to its full path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub path: String,
    pub target: RouteTarget,
    pub guarded: bool,
    pub data: RouteMetadata,
}

#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("Cannot match any routes. URL segment: '{0}'")]
    NotFound(String),
    #[error("Too many redirects while navigating to '{0}'")]
    TooManyRedirects(String),
    #[error("Invalid route '{path}': {reason}")]
    InvalidRoute { path: String, reason: String },
}

fn join_path(parent: &str, child: &str) -> String {
    match (parent.is_empty(), child.is_empty()) {
        (true, _) => child.to_string(),
        (false, true) => parent.to_string(),
        (false, false) => format!("{}/{}", parent, child),
    }
}

/// Split `/a/b?x=1#y` into (`a/b`, `?x=1#y`).
fn split_url(url: &str) -> (String, &str) {
    let cut = url.find(|c: char| c == '?' || c == '#').unwrap_or(url.len());
    let path = url[..cut].trim_matches('/').to_string();
    (path, &url[cut..])
}

/// Flattened route table.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new(config: &[RouteConfig]) -> Result<Self, RouterError> {
        let mut routes = Vec::new();
        Self::flatten("", config, &mut routes)?;
        Ok(Self { routes })
    }

    /// Parse a JSON routing configuration.
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Vec<RouteConfig> =
            serde_json::from_str(raw).context("Failed to parse route configuration")?;
        Ok(Self::new(&config)?)
    }

    /// Load a JSON routing configuration from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read route configuration: {:?}", path))?;
        Self::from_json(&raw)
    }

    /// Load `path` if given, else the built-in routes.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::new(&default_routes()).context("Invalid built-in routes")?),
        }
    }

    fn flatten(
        parent: &str,
        config: &[RouteConfig],
        out: &mut Vec<Route>,
    ) -> Result<(), RouterError> {
        for route in config {
            let path = join_path(parent, route.path.trim_matches('/'));
            let invalid = |reason: &str| RouterError::InvalidRoute {
                path: path.clone(),
                reason: reason.to_string(),
            };

            let target = match (&route.view, &route.redirect_to) {
                (Some(_), Some(_)) => return Err(invalid("both view and redirectTo")),
                (Some(view), None) => Some(RouteTarget::View(*view)),
                (None, Some(to)) if to.starts_with('/') => {
                    Some(RouteTarget::Redirect(to.trim_matches('/').to_string()))
                }
                (None, Some(to)) => Some(RouteTarget::Redirect(join_path(
                    parent,
                    to.trim_matches('/'),
                ))),
                (None, None) if route.children.is_empty() => {
                    return Err(invalid("needs a view, a redirectTo or children"))
                }
                (None, None) => None,
            };

            if let Some(target) = target {
                out.push(Route {
                    path: path.clone(),
                    target,
                    guarded: route.guarded,
                    data: route.data.clone(),
                });
            }
            Self::flatten(&path, &route.children, out)?;
        }
        Ok(())
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// First route declared for `path` (no leading slash).
    pub fn find(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.path == path)
    }
}

/// Where a navigation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// A view was activated at `url`.
    Rendered { url: String, view: ViewKind },
    /// The authorizer refused and requested no further in-app navigation
    /// (for example, a login redirect was issued).
    Blocked { url: String },
}

/// Navigator that queues one follow-up navigation.
#[derive(Debug, Default)]
pub struct PendingNavigation {
    next: Mutex<Option<String>>,
}

impl PendingNavigation {
    pub fn take(&self) -> Option<String> {
        self.next.lock().ok().and_then(|mut next| next.take())
    }
}

impl Navigator for PendingNavigation {
    fn navigate(&self, path: &str) {
        if let Ok(mut next) = self.next.lock() {
            *next = Some(path.to_string());
        }
    }
}

/// Resolves URLs against the route table and enforces guards.
pub struct Router {
    table: RouteTable,
    authorizer: Arc<RouteAuthorizer>,
}

impl Router {
    pub fn new(table: RouteTable, authorizer: Arc<RouteAuthorizer>) -> Self {
        Self { table, authorizer }
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Navigate to an in-app URL such as `/user-info?tab=claims`.
    pub async fn navigate(&self, url: &str) -> Result<NavigationOutcome, RouterError> {
        let (mut path, suffix) = split_url(url);
        let mut suffix = suffix.to_string();

        for _ in 0..MAX_HOPS {
            let route = self
                .table
                .find(&path)
                .ok_or_else(|| RouterError::NotFound(path.clone()))?;
            let current = format!("/{}{}", path, suffix);

            match &route.target {
                RouteTarget::Redirect(to) => {
                    debug!("↪️  {} redirects to /{}", current, to);
                    path = to.clone();
                    continue;
                }
                RouteTarget::View(view) => {
                    if route.guarded {
                        let pending = PendingNavigation::default();
                        let allowed = self
                            .authorizer
                            .can_activate(&route.data, &current, &pending)
                            .await;
                        if !allowed {
                            match pending.take() {
                                Some(next) => {
                                    let (next_path, next_suffix) = split_url(&next);
                                    path = next_path;
                                    suffix = next_suffix.to_string();
                                    continue;
                                }
                                None => return Ok(NavigationOutcome::Blocked { url: current }),
                            }
                        }
                    }

                    info!("📄 Navigated to {}", current);
                    return Ok(NavigationOutcome::Rendered {
                        url: current,
                        view: *view,
                    });
                }
            }
        }

        Err(RouterError::TooManyRedirects(url.to_string()))
    }
}

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use super::paths::resolve_cache_dir;
use crate::config::{
    AppConfig, ProviderConfig, DEFAULT_API_URL, DEFAULT_CLIENT_ID, DEFAULT_ISSUER,
    DEFAULT_ORIGIN, DEFAULT_REALM,
};

pub const ENV_ISSUER: &str = "REALMGATE_ISSUER";
pub const ENV_REALM: &str = "REALMGATE_REALM";
pub const ENV_CLIENT_ID: &str = "REALMGATE_CLIENT_ID";
pub const ENV_ORIGIN: &str = "REALMGATE_ORIGIN";
pub const ENV_API_URL: &str = "REALMGATE_API_URL";
pub const ENV_CACHE_DIR: &str = "REALMGATE_CACHE_DIR";
pub const ENV_ROUTES: &str = "REALMGATE_ROUTES";

/// realmgate - application shell behind a Keycloak login
#[derive(Parser, Debug)]
#[command(name = "realmgate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Identity provider base URL
    #[arg(long, global = true, env = ENV_ISSUER, default_value = DEFAULT_ISSUER)]
    pub issuer: String,

    /// Identity provider realm
    #[arg(long, global = true, env = ENV_REALM, default_value = DEFAULT_REALM)]
    pub realm: String,

    /// OAuth client id registered for this application
    #[arg(long, global = true, env = ENV_CLIENT_ID, default_value = DEFAULT_CLIENT_ID)]
    pub client_id: String,

    /// Origin the application is served from
    #[arg(long, global = true, env = ENV_ORIGIN, default_value = DEFAULT_ORIGIN)]
    pub origin: String,

    /// Backend API base URL, absolute or relative to the origin
    #[arg(long, global = true, env = ENV_API_URL, default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Directory for login callback state. Defaults to ~/.realmgate
    #[arg(long, global = true, env = ENV_CACHE_DIR)]
    pub cache_dir: Option<String>,

    /// JSON route table replacing the built-in routes
    #[arg(long, global = true, env = ENV_ROUTES)]
    pub routes: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load the app at a path (or a full URL, e.g. a pasted login redirect)
    Open {
        /// In-app path such as /user-info
        #[arg(default_value = "/")]
        target: String,
    },
    /// List the route table and each route's access requirements
    Routes,
    /// Show the effective configuration
    Config,
    /// End the session at the identity provider
    Logout,
}

impl Cli {
    /// Effective configuration from flags, environment and defaults.
    pub fn app_config(&self) -> Result<AppConfig> {
        Ok(AppConfig {
            provider: ProviderConfig {
                url: self.issuer.clone(),
                realm: self.realm.clone(),
                client_id: self.client_id.clone(),
            },
            origin: self.origin.clone(),
            api_url: self.api_url.clone(),
            cache_dir: resolve_cache_dir(self.cache_dir.clone())?,
            routes_file: self.routes.clone(),
        })
    }
}

/// Environment that reproduces `config` in a child process.
pub fn config_env(config: &AppConfig) -> Vec<(&'static str, String)> {
    let mut env = vec![
        (ENV_ISSUER, config.provider.url.clone()),
        (ENV_REALM, config.provider.realm.clone()),
        (ENV_CLIENT_ID, config.provider.client_id.clone()),
        (ENV_ORIGIN, config.origin.clone()),
        (ENV_API_URL, config.api_url.clone()),
        (ENV_CACHE_DIR, config.cache_dir.display().to_string()),
    ];
    if let Some(routes) = &config.routes_file {
        env.push((ENV_ROUTES, routes.display().to_string()));
    }
    env
}

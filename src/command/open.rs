use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::{debug, info};
use url::Url;

use crate::cli::args::config_env;
use crate::cli::paths::resolve_page_url;
use crate::config::AppConfig;
use crate::router::NavigationOutcome;
use crate::runtime::{get_runtime, set_runtime, Runtime};
use crate::views::{self, Header, ViewContext};

/// In-app URL of a page: path, query and fragment.
fn in_app_url(location: &Url) -> String {
    let mut url = location.path().to_string();
    if let Some(query) = location.query() {
        url.push('?');
        url.push_str(query);
    }
    if let Some(fragment) = location.fragment() {
        url.push('#');
        url.push_str(fragment);
    }
    url
}

/// Load one page: bootstrap the session, navigate, render.
pub async fn run_open(config: AppConfig, target: &str, verbose: bool) -> Result<()> {
    let location = resolve_page_url(&config.origin, target)?;
    debug!("Loading page {}", location);

    set_runtime(Runtime::build(config, location)?);
    let rt = get_runtime().context("Runtime not configured")?;

    if let Err(err) = rt.startup_hooks().run().await {
        println!("❌ Application failed to start: {}", err);
        return Err(err.into());
    }

    // Forced login: a page without a session ends in a redirect.
    if let Some(login_url) = rt.redirect.take() {
        return continue_login(&rt.config, &login_url, verbose).await;
    }

    let url = in_app_url(&rt.provider.clean_location());
    match rt.router.navigate(&url).await? {
        NavigationOutcome::Rendered { url, view } => {
            let ctx = ViewContext {
                provider: rt.provider.as_ref(),
                backend: Some(&rt.backend),
                origin: &rt.config.origin,
            };
            println!("{}", Header::load(ctx.provider).await);
            println!("{}\n", "-".repeat(60));
            debug!("Rendering {:?} at {}", view, url);
            print!("{}", views::render(view, &ctx).await);
            Ok(())
        }
        NavigationOutcome::Blocked { url } => match rt.redirect.take() {
            Some(login_url) => continue_login(&rt.config, &login_url, verbose).await,
            None => {
                println!("⛔ Navigation to {} was blocked.", url);
                Ok(())
            }
        },
    }
}

/// Send the user to the provider, then load the page they come back to.
async fn continue_login(config: &AppConfig, login_url: &Url, verbose: bool) -> Result<()> {
    println!("🔐 Login required.\n");

    print!("Open login page in browser? [Y/n]: ");
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    let answer = answer.trim().to_lowercase();

    // Default to yes if user just presses Enter
    if answer.is_empty() || answer == "y" || answer == "yes" {
        println!("🌐 Opening login page in your browser...");
        if open::that(login_url.as_str()).is_err() {
            println!("⚠️  Could not open browser automatically.");
        }
    }

    println!("Please log in using your browser:");
    println!("\n{}\n", login_url);
    println!("After logging in, your browser is sent back to {}.", config.origin);
    println!("Copy the full address from the browser's address bar and paste it below.\n");

    print!("Paste the redirected URL here: ");
    io::stdout().flush()?;

    let mut pasted = String::new();
    io::stdin().read_line(&mut pasted)?;
    let pasted = pasted.trim();
    if pasted.is_empty() {
        println!("Login cancelled.");
        return Ok(());
    }

    // The redirect is a fresh page load, so it gets a fresh process.
    info!("🔄 Reloading at the login callback...");
    let exe = std::env::current_exe().context("Failed to locate the realmgate executable")?;
    let mut command = tokio::process::Command::new(exe);
    command.arg("open").arg(pasted).envs(config_env(config));
    if verbose {
        command.arg("--verbose");
    }

    let status = command
        .status()
        .await
        .context("Failed to reload realmgate")?;
    if !status.success() {
        anyhow::bail!("Page load after login failed ({})", status);
    }
    Ok(())
}

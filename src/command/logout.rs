use anyhow::{Context, Result};

use crate::config::AppConfig;
use crate::provider::IdentityProvider;
use crate::runtime::{get_runtime, set_runtime, Runtime};

pub async fn run_logout(config: AppConfig) -> Result<()> {
    let location = config.origin_url()?;
    let init = config.init_config();

    set_runtime(Runtime::build(config, location)?);
    let rt = get_runtime().context("Runtime not configured")?;

    rt.provider.configure(&init)?;
    rt.provider.logout(None).await?;
    let logout_url = rt
        .redirect
        .take()
        .context("Identity provider did not return a logout URL")?;

    println!("👋 Ending your session at the identity provider:");
    println!("\n{}\n", logout_url);
    if open::that(logout_url.as_str()).is_err() {
        println!("⚠️  Could not open browser automatically. Open the URL above to finish logging out.");
    }

    Ok(())
}

use anyhow::{Context, Result};

use crate::config::AppConfig;

pub async fn run_config(config: AppConfig) -> Result<()> {
    let init = config.init_config();

    println!("⚙️  Effective configuration:\n");
    println!(
        "{}",
        serde_json::to_string_pretty(&config).context("Failed to serialize configuration")?
    );
    println!("\nRealm URL: {}", config.provider.realm_url()?);
    println!("Backend API: {}", config.api_base_url()?);
    println!("\nProvider init options:\n");
    println!(
        "{}",
        serde_json::to_string_pretty(&init).context("Failed to serialize init options")?
    );

    Ok(())
}

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod authz;
mod backend;
mod cli;
mod command;
mod config;
mod http;
mod provider;
mod router;
mod runtime;
mod startup;
mod views;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.app_config()?;

    match cli.command {
        Some(Commands::Open { target }) => {
            command::run_open(config, &target, cli.verbose).await?;
        }
        Some(Commands::Routes) => {
            command::run_routes(config).await?;
        }
        Some(Commands::Config) => {
            command::run_config(config).await?;
        }
        Some(Commands::Logout) => {
            command::run_logout(config).await?;
        }
        None => {
            // No command specified, show help
            eprintln!("No command specified. Use --help for usage information.");
            eprintln!("Use 'realmgate open /' to load the application.");
        }
    }

    Ok(())
}

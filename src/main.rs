mod api;
mod cache;
mod cli;
mod config;
mod error;
mod filter;
mod models;

use clap::Parser;
use cli::{App, Cli};
use colored::*;
use config::Config;
use error::Result;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize logging; stdout is reserved for command output
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.global.no_color {
        colored::control::set_override(false);
    }

    if let Err(e) = run(cli).await {
        error!("Command failed: {:?}", e);
        eprintln!("{} {}", "Error:".red(), e.to_string().red());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.global.url.as_deref(), cli.global.cache_ttl)?;
    info!("Using nagios-api at {}", config.url);

    let app = App::new(config, cli.global)?;
    app.run(cli.object).await
}

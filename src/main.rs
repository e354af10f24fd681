mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use opds_fulfill::config::Config;
use opds_fulfill::observability;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    // Logged while loading configuration, before the configured filter applies
    let config =
        tracing::subscriber::with_default(observability::bootstrap_subscriber(), Config::load)?;
    observability::init_tracing(&config.logging.filter);

    match cli.command {
        Commands::Paths(args) => commands::paths(&config, args)?,
        Commands::Fulfill(args) => commands::fulfill(&config, args).await?,
    }

    Ok(())
}

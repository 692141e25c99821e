mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use dispatchbox::config::Config;
use dispatchbox::runner;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let config = match cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Worker => runner::run_worker(config).await?,
        Commands::Replay(args) => {
            runner::run_replay(config, &args.input, args.dry_run).await?;
        }
    }

    Ok(())
}

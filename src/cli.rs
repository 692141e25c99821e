use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "dispatchbox")]
#[command(about = "Outbound message dispatcher with provider media relay", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to $DISPATCHBOX_CONFIG or config/dispatchbox.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Poll the inbound queue and dispatch jobs until stopped
    Worker,
    /// Process queue messages from a file, one JSON message per line
    Replay(ReplayArgs),
}

#[derive(clap::Args, Debug)]
pub struct ReplayArgs {
    /// File with one queue message per line
    #[arg(long)]
    pub input: PathBuf,

    /// Log outcomes instead of sending them to the result queue
    #[arg(long)]
    pub dry_run: bool,
}

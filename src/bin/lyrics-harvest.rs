mod commands;

use clap::Parser;
use commands::{execute_command, Commands, RunOptions};
use std::path::PathBuf;

/// Harvest discographies, lyrics and songwriter credits
#[derive(Parser)]
#[command(
    name = "lyrics-harvest",
    about = "Harvest discographies, lyrics and songwriter credits",
    long_about = None
)]
struct Cli {
    /// Show detailed debug information
    #[arg(long, global = true)]
    verbose: bool,

    /// Config file (defaults to <config dir>/lyrics-harvest/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let options = RunOptions {
        config: args.config,
    };

    if let Err(e) = execute_command(args.command, &options).await {
        eprintln!("❌ Command failed: {e}");
        std::process::exit(1);
    }

    Ok(())
}

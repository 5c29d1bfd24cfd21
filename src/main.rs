mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (ignores if missing)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = cli::commands::utils::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Search { keyword, pages } => {
            cli::commands::search::run(&keyword, pages, &config).await?;
        }
        Commands::Resolve { keyword, index } => {
            cli::commands::search::resolve(&keyword, index, &config).await?;
        }
        Commands::Play { keyword, index } => {
            cli::commands::play::run(&keyword, index, &config).await?;
        }
    }

    Ok(())
}

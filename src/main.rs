// podtune - Terminal Podcast Player
// Browse the show's episode catalog and listen without leaving the terminal

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use podtune::config::Config;
use podtune::ui::App;

#[derive(Debug, Parser)]
#[command(name = "podtune", about = "Terminal podcast player")]
struct Args {
    /// Override the episodes API base URL from the config file
    #[arg(long)]
    api_url: Option<String>,

    /// Load config from an explicit path instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load config - falls back to defaults if missing
    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(api_url) = args.api_url {
        config.api.base_url = api_url;
    }

    // The TUI owns stdout, so logs go to a file
    let _log_guard = init_logging(&config)?;

    // Fire up the TUI and let it rip
    let mut app = App::new(config).await?;
    app.run().await?;

    Ok(())
}

fn init_logging(config: &Config) -> Result<WorkerGuard> {
    fs::create_dir_all(&config.log_dir)
        .with_context(|| format!("Failed to create log directory {}", config.log_dir.display()))?;

    let appender = tracing_appender::rolling::daily(&config.log_dir, "podtune.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok(guard)
}

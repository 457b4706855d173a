use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use vt_cli::commands::{clear, init, run, sessions, stats, status, tracking};
use vt_cli::{Cli, Commands, Config};

/// Load config and open the store, ensuring the parent directory exists.
fn open_store(config_path: Option<&Path>) -> Result<(vt_store::Store, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let store =
        vt_store::Store::open(&config.database_path).context("failed to open session store")?;
    Ok((store, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    match &cli.command {
        Some(Commands::Init { label }) => {
            let (store, _config) = open_store(cli.config.as_deref())?;
            init::run(&store, label.as_deref(), &init::PrintNotifier)?;
        }
        Some(Commands::Run { feed, tab }) => {
            let config =
                Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
            run::run(&config, feed.as_deref(), tab)?;
        }
        Some(Commands::Status) => {
            let (store, config) = open_store(cli.config.as_deref())?;
            let mut stdout = std::io::stdout();
            status::run(&mut stdout, &store, &config.database_path)?;
            stdout.flush()?;
        }
        Some(Commands::Sessions { json }) => {
            let (store, _config) = open_store(cli.config.as_deref())?;
            let mut stdout = std::io::stdout();
            sessions::run(&mut stdout, &store, *json)?;
            stdout.flush()?;
        }
        Some(Commands::Stats { json }) => {
            let (store, _config) = open_store(cli.config.as_deref())?;
            let mut stdout = std::io::stdout();
            stats::run(&mut stdout, &store, *json)?;
            stdout.flush()?;
        }
        Some(Commands::Clear) => {
            let (mut store, _config) = open_store(cli.config.as_deref())?;
            clear::run(&mut store)?;
        }
        Some(Commands::Tracking { state }) => {
            let (store, _config) = open_store(cli.config.as_deref())?;
            tracking::run(&store, state.is_enabled())?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}

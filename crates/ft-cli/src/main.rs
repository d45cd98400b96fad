use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ft_cli::bridge::Framing;
use ft_cli::commands::track::TrackOptions;
use ft_cli::commands::{report, serve, status, track};
use ft_cli::{Cli, Commands, Config};

fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");
    Ok(config)
}

/// Open the collector database, ensuring the parent directory exists.
fn open_database(config: &Config) -> Result<ft_db::Database> {
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }
    ft_db::Database::open(&config.database_path).context("failed to open database")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Command output goes to stdout, logs to stderr
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    match cli.command {
        Some(Commands::Track {
            mode,
            endpoint,
            native,
        }) => {
            let config = load_config(cli.config.as_deref())?;
            let options = TrackOptions {
                endpoint: endpoint.unwrap_or(config.endpoint),
                mode: mode.unwrap_or(config.mode),
                framing: if native {
                    Framing::Native
                } else {
                    Framing::Lines
                },
            };
            track::run(options).await?;
        }
        Some(Commands::Serve { listen }) => {
            let config = load_config(cli.config.as_deref())?;
            let db = open_database(&config)?;
            let listen_addr = listen.unwrap_or(config.listen_addr);
            serve::run(db, &listen_addr).await?;
        }
        Some(Commands::Report { json }) => {
            let config = load_config(cli.config.as_deref())?;
            let db = open_database(&config)?;
            report::run(&mut io::stdout(), &db, json)?;
        }
        Some(Commands::Status) => {
            let config = load_config(cli.config.as_deref())?;
            let db = open_database(&config)?;
            status::run(&mut io::stdout(), &db, &config.database_path)?;
        }
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
        }
    }

    Ok(())
}

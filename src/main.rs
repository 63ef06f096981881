//! Spotify Remote Driver - Spotify Web API integration for remote-control hubs
//!
//! Shows what is playing on the account's active device and, for Premium
//! accounts, drives playback from the remote.

mod api;
mod auth;
mod cli;
mod config;
mod driver;
mod entities;
mod error;
mod hub;
mod models;
mod setup;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "spotify-remote-driver")]
#[command(about = "Spotify integration driver for remote-control hubs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory holding config.json
    #[arg(long, global = true, env = "UC_CONFIG_HOME")]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Enter app credentials and authorize the Spotify account
    Setup {
        /// Authorize again even if tokens are already stored
        #[arg(short, long)]
        reconfigure: bool,

        /// Spotify app client ID (prompted if omitted)
        #[arg(long)]
        client_id: Option<String>,

        /// Spotify app client secret (prompted if omitted)
        #[arg(long)]
        client_secret: Option<String>,

        /// Account has Spotify Premium (enables playback control)
        #[arg(long)]
        premium: bool,

        /// Seconds between now-playing polls (10-300)
        #[arg(long)]
        polling_interval: Option<u64>,
    },

    /// Show configuration and token status
    Status,

    /// Clear stored tokens
    Logout {
        /// Also remove app credentials and preferences
        #[arg(long)]
        all: bool,
    },

    /// Send one command to an entity
    Command {
        /// Entity ID (spotify_media_player_main or spotify_remote_main)
        entity: String,

        /// Command ID, e.g. play_pause, volume, send_cmd
        cmd_id: String,

        /// Command parameters as a JSON object
        #[arg(short, long)]
        params: Option<String>,
    },

    /// Run the driver, reading `<entity> <cmd_id> [json]` lines from stdin
    Run,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config_dir = cli::config_dir(cli.config_dir)?;

    match cli.command {
        Commands::Setup {
            reconfigure,
            client_id,
            client_secret,
            premium,
            polling_interval,
        } => {
            tracing::info!("Starting setup flow...");
            cli::setup(
                &config_dir,
                cli::SetupOptions {
                    reconfigure,
                    client_id,
                    client_secret,
                    premium,
                    polling_interval,
                },
            )
            .await?;
        }
        Commands::Status => {
            cli::status(&config_dir).await?;
        }
        Commands::Logout { all } => {
            tracing::info!("Logging out...");
            cli::logout(&config_dir, all).await?;
        }
        Commands::Command {
            entity,
            cmd_id,
            params,
        } => {
            cli::command(&config_dir, &entity, &cmd_id, params.as_deref()).await?;
        }
        Commands::Run => {
            cli::run(&config_dir).await?;
        }
    }

    Ok(())
}

//! Burrow Daemon
//!
//! HTTP file server over a single storage directory.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use daemon::config::{default_config_path, Config};
use daemon::{shutdown_signal, Server};
use tracing_subscriber::EnvFilter;

/// Burrow Daemon - serve a directory tree over HTTP.
#[derive(Parser, Debug)]
#[command(name = "burrow-daemon")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute (defaults to `serve`)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands for the daemon.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start serving the storage root
    Serve {
        /// Storage root directory (overrides the config file)
        #[arg(long, value_name = "DIR")]
        root: Option<PathBuf>,

        /// Listen address (overrides the config file)
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
    },

    /// Write a default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long, short)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);

    let command = cli.command.clone().unwrap_or(Commands::Serve {
        root: None,
        bind: None,
    });

    match command {
        Commands::InitConfig { force } => {
            init_logging("info", cli.verbose);

            if config_path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists at {} (use --force to overwrite)",
                    config_path.display()
                );
            }

            Config::default().save(&config_path)?;
            println!("Wrote default configuration to {}", config_path.display());
        }
        Commands::Serve { root, bind } => {
            // Load configuration
            let mut config = Config::load(&config_path)?;

            // Apply environment variable overrides, then command line flags
            config.apply_env_overrides();
            if let Some(root) = root {
                config.storage.root = root;
            }
            if let Some(bind) = bind {
                config.server.bind_addr = bind;
            }

            // Validate configuration
            config.validate()?;

            init_logging(&config.daemon.log_level, cli.verbose);
            tracing::info!("Burrow daemon starting...");
            tracing::debug!("Using config file: {:?}", config_path);

            let server = Server::bind(&config).await?;
            server.serve(shutdown_signal()).await?;
        }
    }

    Ok(())
}

/// Initialize tracing.
///
/// `RUST_LOG` wins when set; otherwise the configured level applies to this
/// crate and the request trace layer.
fn init_logging(level: &str, verbose: bool) {
    let level = if verbose { "debug" } else { level };
    let level = level.to_lowercase();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("daemon={level},tower_http={level}")));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

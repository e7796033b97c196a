//! OpsWeave CLI — the main entry point.
//!
//! Commands:
//! - `serve`   — Run the scheduler, broadcaster and HTTP gateway
//! - `cycle`   — Run cycles offline and print the reports
//! - `config`  — Show, validate or locate the configuration
//! - `doctor`  — Diagnose configuration and credentials

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "opsweave",
    about = "OpsWeave — autonomous MSP operations simulator",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of ~/.opsweave/config.toml
    #[arg(short, long, global = true, env = "OPSWEAVE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the agent runtime and HTTP gateway
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,

        /// Override the bind address
        #[arg(long)]
        host: Option<String>,
    },

    /// Run agent cycles back to back without serving
    Cycle {
        /// Number of cycles to run
        #[arg(short = 'n', long, default_value_t = 1)]
        count: u32,

        /// Seed for the dataset and the cycle sampling
        #[arg(short, long)]
        seed: Option<u64>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Diagnose configuration and credentials
    Doctor,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Validate the configuration file
    Validate,
    /// Print the config file path
    Path,
    /// Print a default config file
    Init,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let path = cli.config.as_deref();
    match cli.command {
        Commands::Serve { port, host } => commands::serve::run(path, port, host).await?,
        Commands::Cycle { count, seed } => commands::cycle::run(path, count, seed).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show(path)?,
            ConfigAction::Validate => commands::config_cmd::validate(path)?,
            ConfigAction::Path => commands::config_cmd::path(path),
            ConfigAction::Init => commands::config_cmd::init(),
        },
        Commands::Doctor => commands::doctor::run(path).await?,
    }

    Ok(())
}

//! stepwire - Command-line client for a test runner's step-metadata API
//!
//! Resolves step texts and lists known steps against a running host.

mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::time::Duration;
use stepwire_client::{Client, ConnectionConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stepwire")]
#[command(about = "Query a test runner's step-metadata API")]
#[command(version)]
pub struct Cli {
    /// Host API port on 127.0.0.1
    #[arg(short, long, env = "GAUGE_API_PORT")]
    port: Option<u16>,

    /// Give up on a response after this many milliseconds
    #[arg(long)]
    request_timeout_ms: Option<u64>,

    /// Do not check that response ids match request ids
    #[arg(long)]
    no_verify_id: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve step texts to their step values
    StepValue {
        /// Step texts, e.g. "say <greeting> to <someone>"
        #[arg(required = true)]
        texts: Vec<String>,

        /// The steps take an inline table
        #[arg(long)]
        inline_table: bool,
    },

    /// List all steps known to the host
    AllSteps,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Config file and env first, then command-line flags
    let mut config = match cli.port {
        Some(port) => ConnectionConfig::new(port),
        None => match ConnectionConfig::load() {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{}: {}", "Configuration error".red(), e);
                std::process::exit(1);
            }
        },
    };
    if let Some(ms) = cli.request_timeout_ms {
        config = config.with_request_timeout(Duration::from_millis(ms));
    }
    if cli.no_verify_id {
        config = config.with_verify_message_id(false);
    }

    tracing::debug!("Using host at {}", config.addr());
    let client = match Client::connect_with(config).await {
        Ok(client) => client,
        Err(e) => {
            eprintln!("{}: {}", "Connection failed".red(), e);
            std::process::exit(1);
        }
    };

    let result = commands::execute(&client, cli.command, cli.json).await;

    match result {
        Ok(output) => {
            println!("{}", output);
        }
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            std::process::exit(1);
        }
    }

    client.close().await?;
    Ok(())
}

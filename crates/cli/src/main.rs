//! CLI tools for the variant provisioning service.
//!
//! # Usage
//!
//! ```bash
//! # Delete every variant whose title carries the cleanup suffix
//! bespoke-cli cleanup
//!
//! # List what would be deleted without touching the shop
//! bespoke-cli cleanup --dry-run
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bespoke-cli")]
#[command(author, version, about = "Variant provisioning CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Delete variants whose titles end with the ` - NNNN` cleanup suffix
    Cleanup {
        /// List matching variants without deleting anything
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Cleanup { dry_run } => commands::cleanup::run(dry_run).await?,
    }
    Ok(())
}

//! Chosen One CLI - catalog seeding and offline reports.
//!
//! # Usage
//!
//! ```bash
//! # Add whichever demo products are missing
//! co-cli seed-products
//!
//! # Delete every product and add the demo catalog
//! co-cli seed-products --reset
//!
//! # Store-wide analytics from the configured backend
//! co-cli report
//!
//! # One user's dashboard metrics from an export file
//! co-cli report --file export.json --user ava@example.com
//! ```
//!
//! The backend is chosen by `CONSOLE_BACKEND` exactly as for the server.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "co-cli")]
#[command(author, version, about = "Chosen One console tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Top up the demo product catalog
    SeedProducts {
        /// Delete every product first, then add the full demo catalog
        #[arg(long)]
        reset: bool,
    },
    /// Print analytics computed by the aggregation pipeline
    Report {
        /// Read orders and products from a JSON or YAML export instead of the backend
        #[arg(short, long)]
        file: Option<String>,

        /// Report one user's dashboard metrics instead of store-wide analytics
        #[arg(short, long)]
        user: Option<String>,
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
        Commands::SeedProducts { reset } => commands::seed::products(reset).await?,
        Commands::Report { file, user } => {
            commands::report::run(file.as_deref(), user.as_deref()).await?;
        }
    }
    Ok(())
}

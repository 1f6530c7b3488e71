//! Haberdash CLI - Smoke probes and catalog tools.
//!
//! # Usage
//!
//! ```bash
//! # Probe the public checkout contract (rate limit, unknown product)
//! hd-cli smoke checkout
//!
//! # Probe the webhook receiver (signature, method)
//! hd-cli smoke webhook
//!
//! # Run every probe
//! hd-cli smoke all
//!
//! # Download the catalog CSV from the admin service
//! hd-cli catalog export -o products.csv
//! ```
//!
//! Base URLs default to the local dev ports and can be overridden with
//! `--base-url` or the `CHECKOUT_BASE_URL` / `ADMIN_BASE_URL` variables.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "hd-cli")]
#[command(author, version, about = "Haberdash CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe a running deployment's external contract
    Smoke {
        #[command(subcommand)]
        target: SmokeTarget,
    },
    /// Catalog tools against the admin service
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
}

#[derive(Subcommand)]
enum SmokeTarget {
    /// Checkout endpoint: per-minute rate limit and unknown-product rejection
    Checkout {
        /// Checkout service base URL
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Webhook receiver: invalid signature (401) and wrong method (405)
    Webhook {
        /// Checkout service base URL
        #[arg(long)]
        base_url: Option<String>,
    },
    /// All probes
    All {
        /// Checkout service base URL
        #[arg(long)]
        base_url: Option<String>,
    },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// Download the product catalog CSV
    Export {
        /// Admin service base URL
        #[arg(long)]
        base_url: Option<String>,

        /// Output file path
        #[arg(short, long, default_value = "products_export.csv")]
        output: String,
    },
}

#[tokio::main]
async fn main() {
    // Pick up base URLs from a local .env if present
    let _ = dotenvy::dotenv();

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
        Commands::Smoke { target } => match target {
            SmokeTarget::Checkout { base_url } => {
                commands::smoke::checkout(&checkout_url(base_url)).await?;
            }
            SmokeTarget::Webhook { base_url } => {
                commands::smoke::webhook(&checkout_url(base_url)).await?;
            }
            SmokeTarget::All { base_url } => {
                let url = checkout_url(base_url);
                commands::smoke::checkout(&url).await?;
                commands::smoke::webhook(&url).await?;
            }
        },
        Commands::Catalog { action } => match action {
            CatalogAction::Export { base_url, output } => {
                commands::catalog::export(&admin_url(base_url), &output).await?;
            }
        },
    }
    Ok(())
}

fn checkout_url(flag: Option<String>) -> String {
    flag.or_else(|| std::env::var("CHECKOUT_BASE_URL").ok())
        .unwrap_or_else(|| "http://localhost:3000".to_string())
}

fn admin_url(flag: Option<String>) -> String {
    flag.or_else(|| std::env::var("ADMIN_BASE_URL").ok())
        .unwrap_or_else(|| "http://localhost:3001".to_string())
}

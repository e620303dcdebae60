//! Vitrine CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! vitrine-cli migrate
//!
//! # Load products from YAML (optionally replacing the catalog)
//! vitrine-cli seed data/products.yaml --clear
//!
//! # Grant admin rights to a registered user
//! vitrine-cli admin promote -e owner@example.com
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed` - Seed the product catalog
//! - `admin promote` / `admin demote` - Toggle admin rights

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "vitrine-cli")]
#[command(author, version, about = "Vitrine CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the product catalog from a YAML file
    Seed {
        /// Path to the YAML file
        file: String,

        /// Delete existing products first
        #[arg(long)]
        clear: bool,
    },
    /// Manage admin users
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Grant admin rights to an existing user
    Promote {
        /// User email address
        #[arg(short, long)]
        email: String,
    },
    /// Revoke admin rights
    Demote {
        /// User email address
        #[arg(short, long)]
        email: String,
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
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file, clear } => {
            commands::seed::products(&file, clear).await?;
        }
        Commands::Admin { action } => match action {
            AdminAction::Promote { email } => {
                commands::admin::set_admin(&email, true).await?;
            }
            AdminAction::Demote { email } => {
                commands::admin::set_admin(&email, false).await?;
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }
}

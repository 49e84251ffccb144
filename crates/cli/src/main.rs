//! Mart Africa CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! mart-cli migrate
//!
//! # Create an admin account
//! mart-cli admin create -e admin@example.com -n "Admin Name" -p 'a long passphrase'
//!
//! # Load categories and products from a YAML file
//! mart-cli seed catalog seed/catalog.yaml --owner admin@example.com
//!
//! # Drop revoked refresh tokens that have expired anyway
//! mart-cli tokens purge
//! ```
//!
//! # Environment Variables
//!
//! - `MART_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "mart-cli")]
#[command(author, version, about = "Mart Africa CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage admin accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Seed the database
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Maintain the refresh-token blocklist
    Tokens {
        #[command(subcommand)]
        action: TokenAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin account
    Create {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Admin full name
        #[arg(short, long)]
        name: String,

        /// Admin password
        #[arg(short, long)]
        password: String,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Load categories and products from a YAML file.
    ///
    /// Categories are matched by name and reused. Products are always
    /// inserted, so running the same file twice duplicates them.
    Catalog {
        /// Path to the YAML file
        file: String,

        /// Email of the admin who will own the seeded products
        #[arg(short, long)]
        owner: String,
    },
}

#[derive(Subcommand)]
enum TokenAction {
    /// Delete revoked tokens whose expiry has passed
    Purge,
}

#[tokio::main]
async fn main() {
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
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                name,
                password,
            } => {
                commands::admin::create_user(&email, &name, &password).await?;
            }
        },
        Commands::Seed { target } => match target {
            SeedTarget::Catalog { file, owner } => {
                commands::seed::catalog(&file, &owner).await?;
            }
        },
        Commands::Tokens { action } => match action {
            TokenAction::Purge => commands::tokens::purge().await?,
        },
    }
    Ok(())
}

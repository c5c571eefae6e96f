//! Comptoir CLI - database migrations, catalog seeding and accounts.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! comptoir migrate
//!
//! # Seed categories and products from YAML
//! comptoir seed catalog.yaml
//!
//! # Create an account (password from COMPTOIR_USER_PASSWORD)
//! comptoir user create -e owner@example.com
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "comptoir")]
#[command(author, version, about = "Comptoir CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the catalog from a YAML file
    Seed {
        /// Path to the seed file
        file: String,
    },
    /// Manage storefront accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new account
    Create {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file } => commands::seed::run(&file).await?,
        Commands::User { action } => match action {
            UserAction::Create { email } => commands::user::create(&email).await?,
        },
    }
    Ok(())
}

//! Bazaar CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run API database migrations
//! bazaar-cli migrate api
//!
//! # Create a user and print a bearer token
//! bazaar-cli user create -e seller@example.com -n "Seller" -r seller
//!
//! # Issue a fresh token for an existing user
//! bazaar-cli user token --id 3
//!
//! # Seed demo data (users, products, inventory, coupon SAVE10)
//! bazaar-cli seed
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bazaar-cli")]
#[command(author, version, about = "Bazaar CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        target: MigrateTarget,
    },
    /// Manage users and bearer tokens
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Seed the database with demo data
    Seed,
}

#[derive(Subcommand)]
enum MigrateTarget {
    /// Run API database migrations
    Api,
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new user and print a bearer token
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Role (`customer`, `seller`, `admin`)
        #[arg(short, long, default_value = "customer")]
        role: String,
    },
    /// Issue a fresh bearer token for an existing user
    Token {
        /// User ID
        #[arg(long)]
        id: i32,
    },
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
        Commands::Migrate { target } => match target {
            MigrateTarget::Api => commands::migrate::api().await?,
        },
        Commands::User { action } => match action {
            UserAction::Create { email, name, role } => {
                commands::user::create(&email, &name, &role).await?;
            }
            UserAction::Token { id } => {
                commands::user::issue_token(id).await?;
            }
        },
        Commands::Seed => commands::seed::run().await?,
    }
    Ok(())
}

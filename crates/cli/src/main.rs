//! Volunteer Hub CLI - session migrations and maintenance tools.
//!
//! # Usage
//!
//! ```bash
//! # Create the session store table
//! vh-cli migrate
//!
//! # Create missing profiles for auth identities
//! vh-cli users reconcile
//!
//! # Only list identities without a profile
//! vh-cli users reconcile --dry-run
//!
//! # Validate the external organization dataset
//! vh-cli directory check --path crates/web/data/organizations.json
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "vh-cli")]
#[command(author, version, about = "Volunteer Hub CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the session store table
    Migrate,
    /// Manage user profiles
    Users {
        #[command(subcommand)]
        action: UsersAction,
    },
    /// Inspect the external organization dataset
    Directory {
        #[command(subcommand)]
        action: DirectoryAction,
    },
}

#[derive(Subcommand)]
enum UsersAction {
    /// Create profiles for identities that have none
    Reconcile {
        /// Only list the identities that are missing a profile
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
enum DirectoryAction {
    /// Load the dataset and report record count and duplicate ids
    Check {
        /// Dataset path (defaults to `HUB_DIRECTORY_PATH` or the bundled file)
        #[arg(short, long)]
        path: Option<PathBuf>,
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
        Commands::Migrate => commands::migrate::sessions().await?,
        Commands::Users { action } => match action {
            UsersAction::Reconcile { dry_run } => commands::users::reconcile(dry_run).await?,
        },
        Commands::Directory { action } => match action {
            DirectoryAction::Check { path } => commands::directory::check(path)?,
        },
    }
    Ok(())
}

//! kongctl - command-line client for Kong Konnect.
//!
//! Authenticates through the OAuth device flow, keeps a per-profile session
//! on disk and refreshes it transparently before API calls.

mod auth;
mod cli;
mod client;
mod config;
mod error;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{AuthCommands, Cli, Commands, GetCommands};
use crate::config::settings::env;
use crate::error::Result;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging; stdout is reserved for command output
    let default_level = if cli.global.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(env::LOG_LEVEL).unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    // Run the command
    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        if let Some(hint) = e.hint() {
            eprintln!("{hint}");
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let global = &cli.global;
    match cli.command {
        Commands::Login { no_browser } => cli::commands::handle_login(global, no_browser).await,
        Commands::Logout => cli::commands::handle_logout(global),
        Commands::Auth { command } => match command {
            AuthCommands::Status => cli::commands::handle_status(global),
            AuthCommands::Token => cli::commands::handle_token(global).await,
        },
        Commands::Get { command } => match command {
            GetCommands::Me => cli::commands::handle_get_me(global).await,
        },
        Commands::Completions { shell } => cli::commands::handle_completions(shell),
    }
}

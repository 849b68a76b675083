//! Command-line argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::settings::env;
use crate::config::{Overrides, DEFAULT_PROFILE};

/// Command-line client for Kong Konnect.
///
/// Log in once with `kongctl login`; the session is stored per profile and
/// refreshed automatically when the access token expires.
#[derive(Parser, Debug)]
#[command(name = "kongctl")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Flags accepted by every command.
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Configuration profile to use.
    #[arg(long, global = true, env = env::PROFILE, default_value = DEFAULT_PROFILE)]
    pub profile: String,

    /// Path to the configuration file.
    #[arg(long, global = true, env = env::CONFIG_FILE)]
    pub config_file: Option<PathBuf>,

    /// Konnect personal access token. Skips the stored login.
    #[arg(long, global = true)]
    pub pat: Option<String>,

    /// Konnect API base URL.
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Konnect region (e.g. us, eu, au, global).
    #[arg(long, global = true, conflicts_with = "base_url")]
    pub region: Option<String>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl GlobalArgs {
    /// Flag values that override env and file settings.
    #[must_use]
    pub fn overrides(&self) -> Overrides {
        Overrides {
            pat: self.pat.clone(),
            base_url: self.base_url.clone(),
            region: self.region.clone(),
        }
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in to Konnect using the browser-based device flow.
    Login {
        /// Skip opening the browser automatically.
        #[arg(long)]
        no_browser: bool,
    },

    /// Remove stored Konnect credentials for the profile.
    Logout,

    /// Inspect the current session.
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },

    /// Retrieve Konnect resources.
    Get {
        #[command(subcommand)]
        command: GetCommands,
    },

    /// Generate shell completion scripts.
    ///
    /// Outputs completion script for the specified shell.
    /// Follow shell-specific instructions to install.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: ShellType,
    },
}

/// Authentication subcommands.
#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    /// Show current authentication status.
    Status,

    /// Print a valid access token, refreshing it if needed.
    Token,
}

/// Resource retrieval subcommands.
#[derive(Subcommand, Debug)]
pub enum GetCommands {
    /// Show the user the current token belongs to.
    Me,
}

/// Supported shell types for completions.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ShellType {
    Bash,
    Zsh,
    Fish,
}

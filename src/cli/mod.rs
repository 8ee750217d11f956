//! CLI module for the Kraepelin server
//!
//! Provides command-line interface parsing for the kraepelin-server binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod output;

use crate::types::Role;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Kraepelin test backend
#[derive(Parser, Debug)]
#[command(
    name = "kraepelin-server",
    version,
    about = "Kraepelin test backend",
    long_about = "Serves the Kraepelin arithmetic test: token authentication, \n\
                  administrator-managed test configuration and result storage.\n\n\
                  Run without arguments to start the server.",
    after_help = "EXAMPLES:\n    \
                  kraepelin-server                              # Start the server (reads kraepelin.toml)\n    \
                  kraepelin-server seed proctor@example.com     # Create or reset a stored account\n    \
                  kraepelin-server hash-password                # Print an Argon2 hash\n    \
                  kraepelin-server config --validate            # Check configuration and secrets"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "kraepelin.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Create or replace a stored account
    Seed {
        /// Account email
        email: String,

        /// Account password
        #[arg(long, env = "KRAEPELIN_SEED_PASSWORD", hide_env_values = true)]
        password: String,

        /// Account role
        #[arg(long, default_value = "user", value_parser = parse_role)]
        role: Role,
    },

    /// Print the Argon2 hash of a password
    HashPassword {
        /// Password to hash
        #[arg(env = "KRAEPELIN_HASH_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Show configuration information
    Config {
        /// Validate the configuration file and referenced secrets
        #[arg(long)]
        validate: bool,
    },
}

fn parse_role(value: &str) -> Result<Role, String> {
    value.parse::<Role>().map_err(|e| e.to_string())
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

//! Command-line interface for tasklog.
//!
//! Only the commands that drive the self-update subsystem live here:
//!
//! ```bash
//! tasklog upgrade [--check] [--channel <name>] [--yes] [--no-verify] [--rollback] [--dismiss]
//! tasklog version
//! ```
//!
//! # Global Options
//!
//! - `--verbose` / `-v`: debug logging
//! - `--quiet` / `-q`: errors only
//! - `--config` / `-c`: alternate configuration file
//!
//! `RUST_LOG` takes effect when neither `--verbose` nor `--quiet` is given.

mod upgrade;
mod version;


use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Dispatch;
use tracing_subscriber::EnvFilter;

use crate::config::GlobalConfig;

/// Version of the running binary.
pub const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[command(
    name = "tasklog",
    about = "tasklog - track tasks and log time from the terminal",
    version,
    long_about = "tasklog records tasks and time entries. \
                  This build includes self-update support via `tasklog upgrade`."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the global configuration file
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check for, install, or roll back tasklog releases
    Upgrade(upgrade::UpgradeArgs),

    /// Print the tasklog version
    Version,
}

impl Cli {
    /// Run the selected command.
    pub async fn execute(self) -> Result<()> {
        let dispatch = self.log_dispatch();
        // Ignored if a subscriber is already installed (e.g. by an embedding host).
        let _ = tracing::dispatcher::set_global_default(dispatch.clone());

        let config = GlobalConfig::load_with_optional(self.config).await?;

        match self.command {
            Commands::Upgrade(args) => upgrade::execute(args, &config.update, dispatch).await,
            Commands::Version => version::execute(&config.update, dispatch).await,
        }
    }

    /// Logging sink for this invocation, written to stderr.
    #[must_use]
    pub fn log_dispatch(&self) -> Dispatch {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(self.log_filter())
            .with_writer(std::io::stderr)
            .with_target(false)
            .finish();
        Dispatch::new(subscriber)
    }

    fn log_filter(&self) -> EnvFilter {
        if self.verbose {
            EnvFilter::new("debug")
        } else if self.quiet {
            EnvFilter::new("error")
        } else {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
        }
    }
}

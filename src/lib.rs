//! tasklog - task tracking and time logging from the terminal
//!
//! This crate carries tasklog's self-update subsystem: it detects, downloads,
//! verifies, and installs new releases of the `tasklog` executable without an
//! external package manager.
//!
//! # Core Modules
//!
//! - [`upgrade`] - Versions, channels, update cache, asset selection, installer, orchestrator
//! - [`config`] - Global configuration (`[update]` table)
//! - [`core`] - Error taxonomy and user-facing error rendering
//! - [`cli`] - `tasklog upgrade` and `tasklog version`
//!
//! # Example
//!
//! ```rust,no_run
//! use tasklog::upgrade::{GithubReleaseSource, Updater};
//!
//! # async fn example() -> Result<(), tasklog::core::UpdateError> {
//! let source = GithubReleaseSource::new("tasklog", "tasklog");
//! let updater = Updater::new(source, "/tmp/tasklog", "24h");
//! let notification = updater.check_for_update(env!("CARGO_PKG_VERSION"), "").await?;
//! if notification.available {
//!     println!("tasklog {} is available", notification.latest_version);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod upgrade;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

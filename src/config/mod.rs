//! Configuration management for tasklog
//!
//! tasklog reads a single user-wide TOML file (see [`GlobalConfig`] for its
//! location). Only the `[update]` table is consumed by this crate:
//!
//! ```toml
//! [update]
//! channel = ""
//! check_interval = "24h"
//! check_on_startup = true
//! verify_checksum = true
//! ```
//!
//! Unlike the update cache, configuration is explicit user input: a file that
//! exists but cannot be parsed is reported as an error instead of being ignored.

mod global;
mod update;

pub use global::{CONFIG_ENV_VAR, GlobalConfig};
pub use update::UpdateConfig;

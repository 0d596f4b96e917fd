//! Self-update functionality for tasklog.
//!
//! This module lets tasklog detect, download, verify, and install new releases
//! of its own executable without going through a package manager.
//!
//! # Architecture Overview
//!
//! - **[`Version`]**: semantic version with pre-release channel ordering
//! - **[`determine_channel`]**: which release channel to follow
//! - **[`cache`]**: throttles checks by persisting the last result
//! - **[`asset`]**: maps the host platform to a release artifact
//! - **[`Installer`]**: download, verify, back up, and atomically replace
//! - **[`Updater`]**: orchestrates the above over a [`ReleaseSource`]
//!
//! ## Update Process Flow
//!
//! ```text
//! 1. check_for_update
//!    ├── Return cached result if it is fresh
//!    ├── Resolve channel and fetch the newest release
//!    └── Compare versions and persist the result
//!
//! 2. get_update_info
//!    ├── Fetch the newest release (no cache)
//!    └── Select the platform asset and its checksum file
//!
//! 3. perform_upgrade
//!    ├── Confirm with the user
//!    ├── Download to a temp file next to the binary and verify it
//!    ├── Copy the binary to <binary>.backup
//!    └── Rename the temp file over the binary
//!
//! 4. rollback_upgrade (manual)
//!    └── Rename <binary>.backup back over the binary
//! ```
//!
//! # Safety
//!
//! Nothing touches the live binary until the download is complete and its
//! checksum verified. The backup is taken before the swap, and the swap is a
//! single same-directory rename. Only one backup is kept; each upgrade replaces
//! the previous one.
//!
//! # Usage
//!
//! ```bash
//! tasklog upgrade --check       # Report whether a newer release exists
//! tasklog upgrade               # Upgrade after confirmation
//! tasklog upgrade --channel beta
//! tasklog upgrade --rollback    # Restore <binary>.backup
//! ```

pub mod asset;
pub mod backup;
pub mod cache;
pub mod channel;
pub mod github;
pub mod installer;
pub mod source;
pub mod updater;
pub mod verification;
pub mod version;


pub use channel::determine_channel;
pub use github::GithubReleaseSource;
pub use installer::{InstallFailure, Installer};
pub use source::{Release, ReleaseAsset, ReleaseSource};
pub use updater::{UpdateCheck, UpdateInfo, UpdateNotification, Updater, UpdaterBuilder};
pub use verification::ChecksumVerifier;
pub use version::Version;

//! Error handling for tasklog's self-update subsystem
//!
//! The error system follows two rules:
//! 1. **Strongly-typed errors** so callers can react to specific failure modes
//!    (for example, telling a user cancellation apart from a failed download)
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! - [`UpdateError`] - Enumerated error types for every self-update failure
//! - [`ErrorContext`] - Wrapper that adds a suggestion and details for display
//!
//! Use [`user_friendly_error`] to turn any `anyhow::Error` coming out of the CLI
//! layer into an [`ErrorContext`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use tasklog::core::{UpdateError, user_friendly_error};
//!
//! let err = UpdateError::UserCancelled;
//! assert!(err.is_user_cancelled());
//!
//! let ctx = user_friendly_error(anyhow::Error::from(err));
//! ctx.display();
//! ```

use colored::Colorize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The error type for self-update operations.
///
/// Cache read/write failures never surface as an `UpdateError`: the cache is
/// best-effort and those failures are only logged.
#[derive(Error, Debug)]
pub enum UpdateError {
    /// A version string is not of the form `major.minor.patch[-prerelease]`.
    ///
    /// The running binary's own version failing to parse is swallowed by the
    /// updater (development builds); a release tag failing to parse is surfaced.
    #[error("Invalid version '{input}': {reason}")]
    Parse {
        /// The text that failed to parse
        input: String,
        /// Why it was rejected
        reason: String,
    },

    /// Fetching release metadata or downloading an artifact failed.
    #[error("Network error while {operation}: {reason}")]
    Network {
        /// What was being attempted, including the URL
        operation: String,
        /// Transport error or HTTP status
        reason: String,
    },

    /// The release exists but ships no artifact for this host.
    #[error("No binary found for platform {platform} in release {release}")]
    NoMatchingAsset {
        /// Platform hint that was searched for (e.g. `linux_x86_64`)
        platform: String,
        /// Release tag that was inspected
        release: String,
    },

    /// The downloaded artifact does not match its published digest.
    #[error("Checksum mismatch for {file}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Artifact name
        file: String,
        /// Digest published with the release
        expected: String,
        /// Digest of the downloaded bytes
        actual: String,
    },

    /// A checksum file was downloaded but lists no digest for the artifact.
    #[error("Checksum file {url} has no entry for {file}")]
    ChecksumUnavailable {
        /// Checksum file URL
        url: String,
        /// Artifact name that was looked up
        file: String,
    },

    /// The live executable's directory is not writable.
    #[error(
        "Insufficient permissions to update binary at {}: {reason}\n\
         Try running with sudo or install to a user-writable location",
        path.display()
    )]
    PermissionDenied {
        /// Executable path that could not be replaced
        path: PathBuf,
        /// Underlying failure
        reason: String,
    },

    /// The user answered "no" to the upgrade confirmation.
    #[error("Upgrade cancelled by user")]
    UserCancelled,

    /// Restoring the backup failed; no further automatic recovery is possible.
    #[error("Rollback from {} failed: {reason}", backup.display())]
    Rollback {
        /// Backup file that was to be restored
        backup: PathBuf,
        /// Why the restore failed
        reason: String,
    },

    /// A file system operation on a specific path failed.
    #[error("Failed to {operation} at {}", path.display())]
    FileSystem {
        /// Operation that failed (e.g. "create backup")
        operation: String,
        /// Path involved
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl UpdateError {
    /// Build a [`UpdateError::FileSystem`] from an I/O error.
    pub fn fs(
        operation: impl Into<String>,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::FileSystem {
            operation: operation.into(),
            path: path.into(),
            source,
        }
    }

    /// Build a [`UpdateError::Network`] error.
    pub fn network(operation: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::Network {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error is an explicit negative confirmation rather than a failure.
    #[must_use]
    pub const fn is_user_cancelled(&self) -> bool {
        matches!(self, Self::UserCancelled)
    }
}

/// Error wrapper carrying a suggestion and details for terminal display.
#[derive(Debug)]
pub struct ErrorContext {
    /// The main error message
    pub message: String,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Creates a new context from a message with no suggestion or details.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
            details: None,
        }
    }

    /// Adds a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Adds additional details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Prints the error to stderr with colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.message);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Converts an error into an [`ErrorContext`] with suggestions where possible.
///
/// Known [`UpdateError`] variants anywhere in the chain get a tailored
/// suggestion; anything else is rendered with its full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(update_error) = error.chain().find_map(|e| e.downcast_ref::<UpdateError>()) {
        return create_error_context(&error, update_error);
    }

    let permission_denied = error
        .downcast_ref::<std::io::Error>()
        .is_some_and(|e| e.kind() == std::io::ErrorKind::PermissionDenied);
    if permission_denied {
        return ErrorContext::new(with_chain(&error)).with_suggestion(
            "Try running with elevated permissions (sudo/Administrator) or check file ownership",
        );
    }

    ErrorContext::new(with_chain(&error))
}

fn create_error_context(error: &anyhow::Error, update_error: &UpdateError) -> ErrorContext {
    let ctx = ErrorContext::new(with_chain(error));
    match update_error {
        UpdateError::Parse { .. } => ctx
            .with_suggestion("Release tags must look like v1.2.3 or v1.2.3-beta.1")
            .with_details("The latest release carries a tag that is not a semantic version"),
        UpdateError::Network { .. } => ctx
            .with_suggestion("Check your internet connection and try again")
            .with_details("Update checks are never retried automatically"),
        UpdateError::NoMatchingAsset { .. } => ctx.with_suggestion(
            "Download a build for your platform manually from the release page, \
             or build from source",
        ),
        UpdateError::ChecksumMismatch { .. } | UpdateError::ChecksumUnavailable { .. } => ctx
            .with_suggestion(
                "Retry the upgrade; if the problem persists, report it to the maintainers",
            )
            .with_details(
                "The downloaded file was discarded and the installed binary was not modified",
            ),
        UpdateError::PermissionDenied { .. } => ctx.with_suggestion(
            "Run the upgrade with sudo/Administrator rights, \
             or reinstall tasklog to a user-writable directory",
        ),
        UpdateError::UserCancelled => ctx,
        UpdateError::Rollback { backup, .. } => ctx.with_suggestion(format!(
            "Restore manually by copying {} over the tasklog binary",
            backup.display()
        )),
        UpdateError::FileSystem { .. } => ctx.with_suggestion(
            "Check that the path exists and that you have permission to modify it",
        ),
    }
}

fn with_chain(error: &anyhow::Error) -> String {
    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    message
}

//! Core types shared across tasklog.
//!
//! - [`UpdateError`] - typed failures of the self-update subsystem
//! - [`ErrorContext`] / [`user_friendly_error`] - terminal rendering of errors

pub mod error;

pub use error::{ErrorContext, UpdateError, user_friendly_error};

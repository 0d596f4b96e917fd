//! Integration test suite for tasklog
//!
//! End-to-end tests of the self-update subsystem through its public API, plus
//! smoke tests of the `tasklog` binary.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **upgrade_flow**: check, cache, upgrade, and rollback against an in-memory release host
//! - **installer**: failure ordering of the binary swap
//! - **cli**: command-line behavior that needs no network access

mod cli;
mod installer;
mod upgrade_flow;

//! Test utilities for tasklog
//!
//! Helpers shared by unit tests and the integration suite:
//! - [`FakeReleaseSource`], an in-memory release host
//! - [`init_test_logging`] for ad-hoc debugging with `RUST_LOG`
//! - [`CapturedLogs`] for asserting on what an [`Updater`](crate::upgrade::Updater) logged
//!
//! # Example
//!
//! ```rust,no_run
//! use tasklog::test_utils::{FakeReleaseSource, release_with_assets};
//! use tasklog::upgrade::Updater;
//!
//! # async fn example() -> Result<(), tasklog::core::UpdateError> {
//! let source = FakeReleaseSource::new().with_latest(release_with_assets("v1.1.0", &[]));
//! let updater = Updater::new(source, "/tmp/cache", "24h");
//! let notification = updater.check_for_update("1.0.0", "").await?;
//! assert!(notification.available);
//! # Ok(())
//! # }
//! ```

pub mod release_source;

pub use release_source::{FAKE_DOWNLOAD_BASE, FakeReleaseSource, release_with_assets};

use std::io;
use std::sync::{Arc, Mutex, Once, PoisonError};
use tracing::{Dispatch, Level};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. Uses `level` if given, otherwise
/// `RUST_LOG`; with neither, logging stays off.
///
/// ```bash
/// RUST_LOG=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}

/// In-memory log sink.
#[derive(Debug, Clone, Default)]
pub struct CapturedLogs {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    pub fn new() -> Self {
        Self::default()
    }

    /// A dispatch that records events at `level` and above into this sink.
    pub fn dispatch(&self, level: Level) -> Dispatch {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_ansi(false)
            .with_target(false)
            .with_writer(self.clone())
            .finish();
        Dispatch::new(subscriber)
    }

    /// Everything logged so far.
    pub fn contents(&self) -> String {
        let buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

/// Writer handed out by [`CapturedLogs`].
pub struct CapturedWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl io::Write for CapturedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner).extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedWriter;

    fn make_writer(&'a self) -> Self::Writer {
        CapturedWriter {
            buffer: Arc::clone(&self.buffer),
        }
    }
}

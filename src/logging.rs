//! Logging configuration using tracing
//!
//! Two pieces live here:
//! - [`init`] installs the process-wide tracing subscriber (binary only).
//! - [`MirrorLog`] is the sink the sync engine writes status and error lines
//!   to. The engine never logs through a global; it is handed a sink at
//!   construction and [`TracingLog`] is the default one.

use std::error::Error as StdError;
use std::fmt;
use tracing_subscriber::{fmt as fmt_layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing subscriber
///
/// Filtering follows `RUST_LOG` when set, otherwise `default_level`.
///
/// # Example RUST_LOG values
/// - `RUST_LOG=debug` - Show debug and above
/// - `RUST_LOG=dirmirror=trace` - Trace level for the engine only
/// - `RUST_LOG=dirmirror=debug,notify=info` - Different levels per crate
///
/// # Errors
/// Returns an error if the subscriber has already been initialized
pub fn init(default_level: &str) -> crate::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt_layer::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .try_init()
        .map_err(|e| crate::MirrorError::Other(format!("Failed to initialize tracing: {}", e)))?;

    Ok(())
}

/// Initialize logging for tests (no-op if already initialized)
pub fn init_test() {
    let _ = init("debug");
}

/// Sink for human-readable status and error lines emitted by the engine
pub trait MirrorLog: Send + Sync {
    /// Informational status line ("Copied a to b")
    fn info(&self, message: &str);

    /// Something unusual that did not fail an operation
    fn warn(&self, message: &str);

    /// A failed operation, with the error that caused it
    fn error(&self, message: &str, error: &dyn StdError);
}

/// Default sink forwarding to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl MirrorLog for TracingLog {
    fn info(&self, message: &str) {
        tracing::info!("{}", message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!("{}", message);
    }

    fn error(&self, message: &str, error: &dyn StdError) {
        tracing::error!(error = %error, "{}", message);
    }
}

impl fmt::Debug for dyn MirrorLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MirrorLog")
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Sink that records every line, for assertions
    #[derive(Default)]
    pub struct MemoryLog {
        pub lines: Mutex<Vec<String>>,
    }

    impl MemoryLog {
        pub fn contains(&self, needle: &str) -> bool {
            self.lines.lock().unwrap().iter().any(|l| l.contains(needle))
        }
    }

    impl MirrorLog for MemoryLog {
        fn info(&self, message: &str) {
            self.lines.lock().unwrap().push(format!("INFO {}", message));
        }

        fn warn(&self, message: &str) {
            self.lines.lock().unwrap().push(format!("WARN {}", message));
        }

        fn error(&self, message: &str, error: &dyn StdError) {
            self.lines
                .lock()
                .unwrap()
                .push(format!("ERROR {}: {}", message, error));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MemoryLog;
    use super::*;

    #[test]
    fn test_init_test_helper() {
        // Should never panic
        init_test();
        init_test();
    }

    #[test]
    fn test_tracing_log_accepts_all_levels() {
        init_test();
        let log = TracingLog;
        log.info("copied a to b");
        log.warn("already watching");
        let err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        log.error("Error copying folder", &err);
    }

    #[test]
    fn test_memory_log_records_error_context() {
        let log = MemoryLog::default();
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        log.error("Error removing file from /x", &err);
        assert!(log.contains("ERROR Error removing file from /x: missing"));
    }
}

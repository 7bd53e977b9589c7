//! Structured Logger
//!
//! Wraps `tracing` with a stderr console layer, an optional daily-rotated
//! JSON file layer, and `RUST_LOG`-based level control.

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// File name prefix of the rotated log files.
pub const LOG_FILE_PREFIX: &str = "stackreport.log";

/// Initialize the global logger.
///
/// `RUST_LOG` wins over `level`. When `log_dir` is given, events are also
/// written as NDJSON to `<log_dir>/stackreport.log.YYYY-MM-DD`; a log
/// directory that cannot be created or written is an error.
pub fn init_logger(log_dir: Option<&Path>, level: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_layer = match log_dir {
        Some(dir) => {
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(LOG_FILE_PREFIX)
                .build(dir)
                .with_context(|| format!("Failed to open log directory {}", dir.display()))?;
            Some(fmt::layer().json().with_writer(appender).with_ansi(false))
        }
        None => None,
    };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        init_logger(Some(dir.path()), "debug").unwrap();
        // A second global init must not panic.
        init_logger(None, "info").unwrap();
        tracing::info!("logger initialised");
    }

    #[test]
    fn test_unusable_log_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        std::fs::write(&file, "").unwrap();

        let err = init_logger(Some(&file.join("logs")), "info").unwrap_err();
        assert!(err.to_string().contains("Failed to open log directory"));
    }
}

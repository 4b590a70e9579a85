//! Logging setup for the engine and CLI.
//!
//! Library code only emits `tracing` events; nothing is printed unless the
//! host installs a subscriber. [`init`] installs one that writes to stderr,
//! leaving stdout free for JSON responses, and optionally also to a daily
//! rotating file.
//!
//! ```no_run
//! tabstat::logging::init(None).expect("logging already initialised");
//! tracing::info!("ready");
//! ```

use anyhow::{Context as _, Result};
use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _};

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

const LOG_FILE_PREFIX: &str = "tabstat";
const MAX_LOG_FILES: usize = 10;

/// Installs the global subscriber.
///
/// With `log_dir`, events are also appended to `tabstat.<date>.log` in that
/// directory, rotated daily with the last 10 files kept.
///
/// # Errors
///
/// Returns an error if a subscriber is already installed or the log
/// directory cannot be used.
pub fn init(log_dir: Option<&Path>) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))
        .context("Failed to create env filter")?;

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_writer(std::io::stderr);

    let file_layer = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .max_log_files(MAX_LOG_FILES)
                .filename_prefix(LOG_FILE_PREFIX)
                .filename_suffix("log")
                .build(dir)
                .context("Failed to create log file appender")?;
            Some(
                fmt::layer()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_line_number(true)
                    .with_ansi(false)
                    .with_writer(appender),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Logging is already initialised")?;

    if let Some(dir) = log_dir {
        tracing::debug!("Logging to {}", dir.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails() {
        // The first call may lose to another test's subscriber; the second never succeeds.
        let _ = init(None);
        assert!(init(None).is_err());
    }
}

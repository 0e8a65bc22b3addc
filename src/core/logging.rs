//! Logging and Console Output
//!
//! Sets up `tracing` for the importer:
//! - A stderr layer (compact or JSON), so stdout stays free for payloads
//! - An optional daily-rolling JSON file layer (tracing-appender)
//! - `log` crate records forwarded into `tracing` (tracing-log)
//!
//! Also provides the styled one-line console messages used by the binary.

use std::fs;
use std::io;
use std::path::Path;

use console::style;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Layer};

use crate::config::LoggingConfig;

/// Base name of rolling log files.
pub const LOG_FILE_NAME: &str = "statblock-importer.log";

// ============================================================================
// Logging Initialization
// ============================================================================

/// Initialize the logging system.
///
/// `RUST_LOG` overrides `config.level`. Returns a `WorkerGuard` when a file
/// layer is active; it must be kept alive so buffered lines are flushed on
/// shutdown.
pub fn init(config: &LoggingConfig) -> Option<WorkerGuard> {
    let stderr_layer = if config.json {
        tracing_subscriber::fmt::layer()
            .with_writer(io::stderr)
            .json()
            .with_target(true)
            .with_filter(env_filter(&config.level))
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(io::stderr)
            .compact()
            .with_target(false)
            .with_filter(env_filter(&config.level))
            .boxed()
    };

    let (file_layer, guard) = match config.log_dir.as_deref().and_then(prepare_log_dir) {
        Some(log_dir) => {
            let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .json()
                .with_file(true)
                .with_line_number(true)
                .with_target(true)
                .with_filter(env_filter(&config.level));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let subscriber = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer);

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install tracing subscriber: {}", e);
        return guard;
    }

    // Redirect standard `log` macros to `tracing`
    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("Failed to initialize LogTracer: {}", e);
    }

    if let Some(dir) = &config.log_dir {
        log::debug!("Logging to {:?} (daily rolling)", dir.join(LOG_FILE_NAME));
    }

    guard
}

/// Filter from `RUST_LOG`, falling back to the configured directive and then
/// to `info` when that directive does not parse.
pub fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

fn prepare_log_dir(dir: &Path) -> Option<&Path> {
    if !dir.exists() {
        if let Err(e) = fs::create_dir_all(dir) {
            eprintln!("Failed to create logs directory {}: {}", dir.display(), e);
            return None;
        }
    }
    Some(dir)
}

// ============================================================================
// Console Output Utilities
// ============================================================================

/// Print a success message to stderr
pub fn print_success(message: &str) {
    eprintln!("{} {}", style("✓").green(), style(message).green());
}

/// Print a warning message to stderr
pub fn print_warning(message: &str) {
    eprintln!("{} {}", style("⚠").yellow(), style(message).yellow().bold());
}

/// Print an error message to stderr
pub fn print_error(message: &str) {
    eprintln!("{} {}", style("✗").red(), style(message).red().bold());
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_directive_falls_back() {
        // Must not panic whatever RUST_LOG holds
        let _filter = env_filter("not a [valid directive");
    }

    #[test]
    fn test_prepare_log_dir_creates_missing() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("logs").join("importer");
        assert_eq!(prepare_log_dir(&nested), Some(nested.as_path()));
        assert!(nested.is_dir());
    }

    #[test]
    fn test_console_helpers() {
        print_success("imported");
        print_warning("spell 'wish' not found");
        print_error("failed");
    }
}

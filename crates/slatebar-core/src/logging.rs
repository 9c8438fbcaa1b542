//! Shared logging initialization for the slatebar binary.
//!
//! Stdout carries the bar protocol, so log output always goes to stderr or a
//! log file.

use std::fs::File;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

static INIT: OnceLock<()> = OnceLock::new();

/// Environment variable consulted for the log level.
pub const LOG_ENV: &str = "SLATEBAR_LOG";

fn parse_level(raw: &str) -> tracing::Level {
    match raw.to_ascii_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}

/// Resolve the log level: `verbose` forces DEBUG, otherwise `SLATEBAR_LOG`,
/// otherwise INFO.
pub fn resolve_level(verbose: bool) -> tracing::Level {
    if verbose {
        return tracing::Level::DEBUG;
    }
    parse_level(&std::env::var(LOG_ENV).unwrap_or_else(|_| "info".to_string()))
}

/// Initialize process-level tracing output.
///
/// Writes to `log_file` (truncated) when given, stderr otherwise. Safe to call
/// multiple times; only the first call installs the subscriber.
///
/// # Errors
///
/// Returns an I/O error if the log file cannot be created.
pub fn init(verbose: bool, log_file: Option<&Path>) -> std::io::Result<()> {
    if INIT.get().is_some() {
        return Ok(());
    }
    let level = resolve_level(verbose);
    match log_file {
        Some(path) => {
            let file = File::create(path)?;
            let _ = tracing_subscriber::fmt()
                .with_max_level(level)
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_max_level(level)
                .with_target(false)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }
    let _ = INIT.set(());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_level_known_names() {
        assert_eq!(parse_level("trace"), tracing::Level::TRACE);
        assert_eq!(parse_level("DEBUG"), tracing::Level::DEBUG);
        assert_eq!(parse_level("warn"), tracing::Level::WARN);
        assert_eq!(parse_level("error"), tracing::Level::ERROR);
    }

    #[test]
    fn parse_level_unknown_falls_back_to_info() {
        assert_eq!(parse_level("chatty"), tracing::Level::INFO);
    }

    #[test]
    fn verbose_forces_debug() {
        assert_eq!(resolve_level(true), tracing::Level::DEBUG);
    }
}

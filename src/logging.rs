//! Logging infrastructure for taskboard
//!
//! Logs go to a daily-rotated `taskboard.log` under `~/.taskboard/logs` (or
//! `[logging].path`), keeping stdout free for rendered tables.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::config::{self, schema::LoggingConfig};

const LOG_FILE_PREFIX: &str = "taskboard.log";

/// Initialize the logging system
///
/// Sets up tracing with:
/// - File output with daily rotation
/// - Configurable log level via config or RUST_LOG env var
///
/// With logging disabled nothing is installed and events are dropped.
pub fn init(config: &LoggingConfig) -> Result<LoggingGuard> {
    if !config.enabled {
        return Ok(LoggingGuard { _guard: None });
    }

    let log_dir = log_dir(config).context("could not determine log directory")?;
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .try_init()
        .context("a global tracing subscriber is already installed")?;

    tracing::info!(
        log_dir = %log_dir.display(),
        level = %config.level,
        "logging initialized"
    );

    Ok(LoggingGuard {
        _guard: Some(guard),
    })
}

/// Initialize logging for tests (logs to the test writer)
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .with_span_events(FmtSpan::CLOSE)
        .try_init();
}

/// Keeps the background log writer alive; flushes pending writes on drop.
pub struct LoggingGuard {
    _guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

/// Resolved log directory: the configured path with `~` expanded, or
/// `~/.taskboard/logs` when unset.
pub fn log_dir(config: &LoggingConfig) -> Option<PathBuf> {
    let raw = config.path.trim();
    if raw.is_empty() {
        return config::taskboard_home().map(|home| home.join("logs"));
    }
    if let Some(rest) = raw.strip_prefix("~/") {
        return dirs::home_dir().map(|home| home.join(rest));
    }
    if raw == "~" {
        return dirs::home_dir();
    }
    Some(PathBuf::from(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_log_dir_is_under_taskboard_home() {
        if let Some(dir) = log_dir(&LoggingConfig::default()) {
            assert!(dir.ends_with(".taskboard/logs"));
        }
    }

    #[test]
    fn explicit_log_dir_is_kept() {
        let config = LoggingConfig {
            path: "/var/log/taskboard".to_string(),
            ..Default::default()
        };
        assert_eq!(log_dir(&config), Some(PathBuf::from("/var/log/taskboard")));
    }

    #[test]
    fn disabled_logging_installs_nothing() {
        let config = LoggingConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(init(&config).is_ok());
    }
}

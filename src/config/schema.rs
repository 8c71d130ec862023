//! Configuration schema and defaults for taskboard.
//!
//! Defines the TOML-serializable configuration structure with all sections:
//! `[source]`, `[dashboard]`, `[web]`, and `[logging]`.
//!
//! Every field has a built-in default. Users only need to set the values
//! they want to override.
use serde::{Deserialize, Serialize};

use crate::filter::RangeToken;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level taskboard configuration.
///
/// Maps directly to the `~/.taskboard/config.toml` and `.taskboard.toml`
/// file schemas. All sections and fields are optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskboardConfig {
    pub source: SourceConfig,
    pub dashboard: DashboardConfig,
    pub web: WebConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// [source]
// ---------------------------------------------------------------------------

/// Where dashboard payloads come from and how often they are refreshed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Dashboard endpoint. Task logs are fetched from `<endpoint>/logs/<job_id>`.
    pub endpoint: String,
    pub timeout_ms: u64,
    pub poll_interval_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8011/api/dashboard".to_string(),
            timeout_ms: 10_000,
            poll_interval_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// [dashboard]
// ---------------------------------------------------------------------------

/// Defaults for the rendered views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Initial time window: `24h`, `7d`, `30d`, or `all`.
    pub default_range: RangeToken,
    pub top_users: usize,
    pub top_failed_users: usize,
    /// Maximum rows in task tables.
    pub row_limit: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            default_range: RangeToken::All,
            top_users: 5,
            top_failed_users: 10,
            row_limit: 1000,
        }
    }
}

// ---------------------------------------------------------------------------
// [web]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub addr: String,
    pub open_browser: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:9747".to_string(),
            open_browser: true,
        }
    }
}

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Whether file logging is enabled.
    pub enabled: bool,
    /// Log level: `"info"`, `"debug"`, `"warn"`, `"error"`. `RUST_LOG` wins
    /// when set.
    pub level: String,
    /// Log directory. Empty means `~/.taskboard/logs`; `~` is expanded.
    pub path: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            path: String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Annotated default file
// ---------------------------------------------------------------------------

impl TaskboardConfig {
    /// Default config file content written by `taskboard config init`.
    pub fn default_toml() -> String {
        r#"# taskboard configuration
#
# Configuration hierarchy (highest precedence wins):
#   1. Environment variables (TASKBOARD_*)
#   2. Project config (.taskboard.toml in current directory)
#   3. User global config (~/.taskboard/config.toml)
#   4. Built-in defaults

[source]
endpoint = "http://localhost:8011/api/dashboard"
timeout_ms = 10000
poll_interval_secs = 30

[dashboard]
default_range = "all"     # 24h | 7d | 30d | all
top_users = 5
top_failed_users = 10
row_limit = 1000

[web]
addr = "127.0.0.1:9747"
open_browser = true

[logging]
enabled = true
level = "info"            # error | warn | info | debug | trace
path = ""                 # empty = ~/.taskboard/logs
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_toml_matches_defaults() {
        let parsed: TaskboardConfig = toml::from_str(&TaskboardConfig::default_toml()).unwrap();
        assert_eq!(parsed, TaskboardConfig::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: TaskboardConfig = toml::from_str(
            r#"
[dashboard]
default_range = "7d"
"#,
        )
        .unwrap();
        assert_eq!(parsed.dashboard.default_range, RangeToken::Last7Days);
        assert_eq!(parsed.dashboard.top_users, 5);
        assert_eq!(parsed.source.poll_interval_secs, 30);
    }

    #[test]
    fn round_trips_through_toml() {
        let text = toml::to_string_pretty(&TaskboardConfig::default()).unwrap();
        let parsed: TaskboardConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.web.addr, "127.0.0.1:9747");
    }
}

//! Layered configuration for taskboard.
//!
//! Sources, lowest precedence first:
//!
//! 1. Built-in defaults from [`schema::TaskboardConfig::default()`]
//! 2. User global config at `~/.taskboard/config.toml`
//! 3. Project config at `.taskboard.toml` in the working directory
//! 4. `TASKBOARD_*` environment variables
//!
//! Files are merged as TOML trees before deserializing, so a project file
//! that sets only `dashboard.row_limit` keeps every other value from the
//! global file.
//!
//! ```rust,ignore
//! let cfg = taskboard::config::load();
//! println!("polling {} every {}s", cfg.source.endpoint, cfg.source.poll_interval_secs);
//! ```

pub mod schema;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub use schema::TaskboardConfig;

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the fully resolved taskboard configuration.
///
/// Merges all layers in order: defaults → global TOML → project TOML → env
/// vars. Unreadable or malformed files are skipped with a warning so a bad
/// project file never stops the dashboard.
pub fn load() -> TaskboardConfig {
    let layers = [global_config_path(), project_config_path()];
    let mut config = load_layers(layers.iter().flatten().map(PathBuf::as_path));
    apply_env_overrides(&mut config);
    config
}

/// Merge TOML files in order over the defaults.
fn load_layers<'a>(paths: impl IntoIterator<Item = &'a Path>) -> TaskboardConfig {
    let mut merged = toml::Value::Table(toml::map::Map::new());

    for path in paths {
        if let Some(layer) = load_toml_file(path) {
            merge_toml(&mut merged, layer);
        }
    }

    let mut config = match merged.try_into::<TaskboardConfig>() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "merged config is invalid; using defaults");
            TaskboardConfig::default()
        }
    };
    replace_zero_interval(&mut config);
    config
}

/// A zero poll interval would refetch in a tight loop; fall back to the
/// default instead.
fn replace_zero_interval(config: &mut TaskboardConfig) {
    if config.source.poll_interval_secs == 0 {
        let fallback = schema::SourceConfig::default().poll_interval_secs;
        tracing::warn!(fallback, "source.poll_interval_secs must be at least 1; using default");
        config.source.poll_interval_secs = fallback;
    }
}

/// Read one TOML layer. Missing files are silent; malformed ones are logged.
fn load_toml_file(path: &Path) -> Option<toml::Value> {
    let content = fs::read_to_string(path).ok()?;
    match toml::from_str::<toml::Value>(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring malformed config file");
            None
        }
    }
}

/// Recursively overlay `overlay` onto `base`. Tables merge key by key; any
/// other value replaces what was there.
fn merge_toml(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                match base_table.get_mut(&key) {
                    Some(existing) => merge_toml(existing, value),
                    None => {
                        base_table.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

/// Path to the user global config: `~/.taskboard/config.toml`.
fn global_config_path() -> Option<PathBuf> {
    taskboard_home().map(|dir| dir.join("config.toml"))
}

/// Path to the project local config: `.taskboard.toml` in the current directory.
fn project_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".taskboard.toml"))
}

/// `~/.taskboard`, home of the global config and default log directory.
pub fn taskboard_home() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".taskboard"))
}

/// Return the path to the global config file for display/init purposes.
pub fn global_config_file() -> Option<PathBuf> {
    global_config_path()
}

/// Return the path to the project config file for display purposes.
pub fn project_config_file() -> Option<PathBuf> {
    project_config_path()
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides (highest precedence layer).
///
/// Supported variables:
/// - `TASKBOARD_ENDPOINT`: dashboard endpoint URL
/// - `TASKBOARD_TIMEOUT_MS`: request timeout
/// - `TASKBOARD_POLL_INTERVAL_SECS`: refresh interval
/// - `TASKBOARD_RANGE`: default range (`24h`, `7d`, `30d`, `all`)
/// - `TASKBOARD_WEB_ADDR`: bind address for `serve`
/// - `TASKBOARD_LOG_LEVEL`: log level
fn apply_env_overrides(config: &mut TaskboardConfig) {
    apply_overrides(config, |name| std::env::var(name).ok());
}

/// Apply overrides from any variable lookup. Invalid values are ignored.
fn apply_overrides(config: &mut TaskboardConfig, var: impl Fn(&str) -> Option<String>) {
    if let Some(val) = var("TASKBOARD_ENDPOINT")
        && !val.is_empty()
    {
        config.source.endpoint = val;
    }
    if let Some(val) = var("TASKBOARD_TIMEOUT_MS")
        && let Ok(ms) = val.parse::<u64>()
    {
        config.source.timeout_ms = ms;
    }
    if let Some(val) = var("TASKBOARD_POLL_INTERVAL_SECS")
        && let Ok(secs) = val.parse::<u64>()
        && secs > 0
    {
        config.source.poll_interval_secs = secs;
    }
    if let Some(val) = var("TASKBOARD_RANGE")
        && let Ok(range) = val.parse()
    {
        config.dashboard.default_range = range;
    }
    if let Some(val) = var("TASKBOARD_WEB_ADDR")
        && !val.is_empty()
    {
        config.web.addr = val;
    }
    if let Some(val) = var("TASKBOARD_LOG_LEVEL")
        && !val.is_empty()
    {
        config.logging.level = val;
    }
}

/// Check if a string value represents a truthy boolean.
fn is_truthy(val: &str) -> bool {
    matches!(
        val.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

// ---------------------------------------------------------------------------
// Config init / set / reset
// ---------------------------------------------------------------------------

/// Write the default annotated config to `~/.taskboard/config.toml`.
///
/// Creates the `~/.taskboard/` directory if it doesn't exist. Returns an
/// error if the file already exists (use `force = true` to overwrite).
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create ~/.taskboard/ directory")?;
    }

    fs::write(&path, TaskboardConfig::default_toml()).context("failed to write config file")?;

    Ok(path)
}

/// Set a single config key to a value in the global config file.
///
/// Reads the current global config (or defaults), updates the specified key,
/// and writes the result back. Supports dotted keys like `source.endpoint`.
pub fn set_config_value(key: &str, value: &str) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;

    let content = if path.exists() {
        fs::read_to_string(&path).context("failed to read config file")?
    } else {
        toml::to_string_pretty(&TaskboardConfig::default())
            .context("failed to serialize default config")?
    };

    let updated = set_value_in_document(&content, key, value)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(&path, updated).context("failed to write config file")?;

    Ok(path)
}

/// Apply a dotted-key update to a TOML document and check the result still
/// describes a valid config.
fn set_value_in_document(content: &str, key: &str, value: &str) -> Result<String> {
    let mut root: toml::Value =
        toml::from_str(content).context("failed to parse config as TOML value")?;

    // Keys the file omits still exist in the schema; seed them from defaults
    // so their type is known.
    let defaults = toml::Value::try_from(TaskboardConfig::default())
        .context("failed to serialize default config")?;
    let mut seeded = defaults;
    merge_toml(&mut seeded, root.clone());
    if lookup(&root, key).is_none() && lookup(&seeded, key).is_some() {
        root = seeded;
    }

    set_toml_value(&mut root, key, value)?;

    let config = root
        .clone()
        .try_into::<TaskboardConfig>()
        .with_context(|| format!("invalid value '{value}' for '{key}'"))?;
    if config.source.poll_interval_secs == 0 {
        anyhow::bail!("source.poll_interval_secs must be at least 1");
    }

    toml::to_string_pretty(&root).context("failed to serialize updated config")
}

fn lookup<'a>(root: &'a toml::Value, key: &str) -> Option<&'a toml::Value> {
    key.split('.').try_fold(root, |node, part| node.get(part))
}

/// Set a value in a TOML value tree using a dotted key path.
fn set_toml_value(root: &mut toml::Value, key: &str, raw_value: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').collect();
    let Some((leaf, sections)) = parts.split_last() else {
        anyhow::bail!("empty config key");
    };

    // Navigate to the parent table
    let mut current = root;
    for &part in sections {
        current = current
            .get_mut(part)
            .with_context(|| format!("config key not found: section '{part}' in '{key}'"))?;
    }

    let table = current.as_table_mut().with_context(|| {
        format!(
            "expected table at '{}'",
            key.rsplit_once('.').map(|(s, _)| s).unwrap_or("")
        )
    })?;

    let new_value = match table.get(*leaf) {
        Some(toml::Value::Boolean(_)) => toml::Value::Boolean(is_truthy(raw_value)),
        Some(toml::Value::Integer(_)) => {
            let n: i64 = raw_value
                .parse()
                .with_context(|| format!("expected integer for '{key}', got '{raw_value}'"))?;
            toml::Value::Integer(n)
        }
        Some(toml::Value::Float(_)) => {
            let f: f64 = raw_value
                .parse()
                .with_context(|| format!("expected float for '{key}', got '{raw_value}'"))?;
            toml::Value::Float(f)
        }
        Some(_) => toml::Value::String(raw_value.to_string()),
        None => anyhow::bail!("unknown config key '{key}'"),
    };

    table.insert(leaf.to_string(), new_value);
    Ok(())
}

/// Reset the global config to defaults (overwrite the file).
pub fn reset_config() -> Result<PathBuf> {
    init_config(true)
}

/// Show the effective (fully resolved) config as TOML.
pub fn show_effective_config() -> Result<String> {
    let config = load();
    toml::to_string_pretty(&config).context("failed to serialize effective config")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::RangeToken;
    use std::collections::HashMap;

    fn write_temp(name: &str, content: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("taskboard-config-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn is_truthy_accepts_variants() {
        assert!(is_truthy("1"));
        assert!(is_truthy("TRUE"));
        assert!(is_truthy("yes"));
        assert!(is_truthy("on"));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("off"));
        assert!(!is_truthy(""));
    }

    #[test]
    fn layers_merge_per_key() {
        let global = write_temp(
            "global.toml",
            "[source]\nendpoint = \"http://global/api\"\n\n[dashboard]\ntop_users = 3\n",
        );
        let project = write_temp("project.toml", "[dashboard]\nrow_limit = 50\n");

        let config = load_layers([global.as_path(), project.as_path()]);
        assert_eq!(config.source.endpoint, "http://global/api");
        assert_eq!(config.dashboard.top_users, 3);
        assert_eq!(config.dashboard.row_limit, 50);
        assert_eq!(config.source.poll_interval_secs, 30);
    }

    #[test]
    fn malformed_layer_is_skipped() {
        let bad = write_temp("bad.toml", "[source\nendpoint = ");
        let config = load_layers([bad.as_path()]);
        assert_eq!(config, TaskboardConfig::default());
    }

    #[test]
    fn missing_layer_is_skipped() {
        let config = load_layers([Path::new("/nonexistent/taskboard.toml")]);
        assert_eq!(config, TaskboardConfig::default());
    }

    #[test]
    fn env_overrides_apply_and_ignore_garbage() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("TASKBOARD_ENDPOINT", "http://env/api"),
            ("TASKBOARD_TIMEOUT_MS", "not-a-number"),
            ("TASKBOARD_POLL_INTERVAL_SECS", "0"),
            ("TASKBOARD_RANGE", "7d"),
            ("TASKBOARD_LOG_LEVEL", "debug"),
        ]);
        let mut config = TaskboardConfig::default();
        apply_overrides(&mut config, |name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.source.endpoint, "http://env/api");
        assert_eq!(config.source.timeout_ms, 10_000);
        assert_eq!(config.source.poll_interval_secs, 30);
        assert_eq!(config.dashboard.default_range, RangeToken::Last7Days);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn set_toml_value_updates_string() {
        let mut root: toml::Value = toml::from_str("[source]\nendpoint = \"a\"\n").unwrap();
        set_toml_value(&mut root, "source.endpoint", "http://b").unwrap();
        assert_eq!(root["source"]["endpoint"].as_str(), Some("http://b"));
    }

    #[test]
    fn set_toml_value_updates_bool() {
        let mut root: toml::Value = toml::from_str("[web]\nopen_browser = true\n").unwrap();
        set_toml_value(&mut root, "web.open_browser", "off").unwrap();
        assert_eq!(root["web"]["open_browser"].as_bool(), Some(false));
    }

    #[test]
    fn set_toml_value_updates_integer() {
        let mut root: toml::Value = toml::from_str("[dashboard]\ntop_users = 5\n").unwrap();
        set_toml_value(&mut root, "dashboard.top_users", "8").unwrap();
        assert_eq!(root["dashboard"]["top_users"].as_integer(), Some(8));
        assert!(set_toml_value(&mut root, "dashboard.top_users", "many").is_err());
    }

    #[test]
    fn set_toml_value_rejects_unknown_key() {
        let mut root: toml::Value = toml::from_str("[source]\nendpoint = \"a\"\n").unwrap();
        assert!(set_toml_value(&mut root, "nonexistent.key", "value").is_err());
        assert!(set_toml_value(&mut root, "source.nope", "value").is_err());
    }

    #[test]
    fn set_in_sparse_document_seeds_from_defaults() {
        let updated = set_value_in_document("[web]\naddr = \"0.0.0.0:1\"\n", "dashboard.row_limit", "10").unwrap();
        let config: TaskboardConfig = toml::from_str(&updated).unwrap();
        assert_eq!(config.dashboard.row_limit, 10);
        assert_eq!(config.web.addr, "0.0.0.0:1");
    }

    #[test]
    fn set_rejects_invalid_range() {
        let base = toml::to_string_pretty(&TaskboardConfig::default()).unwrap();
        assert!(set_value_in_document(&base, "dashboard.default_range", "3w").is_err());
        assert!(set_value_in_document(&base, "dashboard.default_range", "24h").is_ok());
    }

    #[test]
    fn zero_poll_interval_in_file_falls_back_to_default() {
        let zero = write_temp("zero.toml", "[source]\npoll_interval_secs = 0\n");
        let config = load_layers([zero.as_path()]);
        assert_eq!(config.source.poll_interval_secs, 30);
    }

    #[test]
    fn set_rejects_zero_poll_interval() {
        let base = toml::to_string_pretty(&TaskboardConfig::default()).unwrap();
        assert!(set_value_in_document(&base, "source.poll_interval_secs", "0").is_err());
        assert!(set_value_in_document(&base, "source.poll_interval_secs", "5").is_ok());
    }

    #[test]
    fn show_effective_config_returns_toml() {
        let toml_str = show_effective_config().unwrap();
        let _: TaskboardConfig = toml::from_str(&toml_str).unwrap();
    }
}

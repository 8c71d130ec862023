//! CLI command implementations for taskboard.
//!
//! Provides subcommand handlers for:
//! - `taskboard overview|tiktok|facebook`: one dashboard tab for a range
//! - `taskboard task <id>`: per-batch, per-account breakdown of one task
//! - `taskboard logs <id>`: a task's log text
//! - `taskboard watch`: re-render a tab on every refresh
//! - `taskboard config show|init|set|reset`: configuration management

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use colored::Colorize;

use crate::analytics::detail::{AccountSelector, DetailChart, DetailMetric};
use crate::analytics::metrics::{StatusBucket, UsageBucket};
use crate::config::{self, TaskboardConfig};
use crate::filter::RangeToken;
use crate::poller::Poller;
use crate::source::{self, FileSource, HttpSource, PayloadSource};
use crate::store::{Selection, SnapshotStore};
use crate::views::{
    self, CountEntry, FacebookTaskRow, FacebookView, OverviewView, Tab, TabView, TaskDetailView,
    TaskRow, TikTokView,
};

/// Output format for dashboard commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl OutputFormat {
    pub fn from_str_opt(s: Option<&str>) -> Self {
        match s {
            Some("json") => Self::Json,
            Some("csv") => Self::Csv,
            _ => Self::Table,
        }
    }
}

/// Pick the payload source: a file when given, otherwise the HTTP endpoint
/// (flag first, then config).
pub fn build_source(
    cfg: &TaskboardConfig,
    endpoint: Option<&str>,
    file: Option<&Path>,
) -> Box<dyn PayloadSource> {
    match (file, endpoint) {
        (Some(path), _) => Box::new(FileSource::new(path)),
        (None, Some(url)) => Box::new(HttpSource::new(
            url,
            Duration::from_millis(cfg.source.timeout_ms),
        )),
        (None, None) => Box::new(HttpSource::from_config(&cfg.source)),
    }
}

/// Fetch once into a fresh store. One-shot commands fail on fetch errors.
fn load_store(source: &dyn PayloadSource, selection: Selection) -> Result<SnapshotStore> {
    let payload = source
        .fetch_dashboard()
        .with_context(|| format!("could not load dashboard from {}", source.describe()))?;
    let mut store = SnapshotStore::new(selection);
    store.replace(payload, Utc::now());
    Ok(store)
}

// ---------------------------------------------------------------------------
// taskboard overview | tiktok | facebook
// ---------------------------------------------------------------------------

/// Render one dashboard tab for a range.
pub fn run_tab(
    source: &dyn PayloadSource,
    cfg: &TaskboardConfig,
    tab: Tab,
    range: RangeToken,
    format: OutputFormat,
) -> Result<()> {
    let store = load_store(
        source,
        Selection {
            range,
            tab,
            ..Default::default()
        },
    )?;
    let Some(view) = views::current(&store, &cfg.dashboard, Utc::now()) else {
        return Ok(());
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&view)?),
        OutputFormat::Csv => print_tab_csv(&view),
        OutputFormat::Table => print_tab_table(&view, range),
    }
    Ok(())
}

fn print_tab_table(view: &TabView, range: RangeToken) {
    match view {
        TabView::Overview(v) => print_overview_table(v, range),
        TabView::Tiktok(v) => print_tiktok_table(v, range),
        TabView::Facebook(v) => print_facebook_table(v, range),
    }
}

fn print_tab_csv(view: &TabView) {
    match view {
        TabView::Overview(v) => print_task_rows_csv(&v.tasks),
        TabView::Tiktok(v) => print_task_rows_csv(&v.tasks),
        TabView::Facebook(v) => print_facebook_rows_csv(&v.tasks),
    }
}

fn print_title(tab: Tab, range: RangeToken) {
    println!(
        "{} {}",
        tab.title().bold().cyan(),
        format!("(range: {range})").dimmed()
    );
    println!("{}", "=".repeat(60));
    println!();
}

fn print_overview_table(view: &OverviewView, range: RangeToken) {
    print_title(Tab::Overview, range);

    let s = &view.summary;
    println!("  {} {}", "Total tasks:  ".bold(), format_number(s.total));
    println!("  {} {:.1}%", "Success rate: ".bold(), s.success_rate_pct);
    println!("  {} {:.2}s", "Avg duration: ".bold(), s.avg_duration_seconds);
    println!("  {} {}", "Active users: ".bold(), s.distinct_email_count);
    println!();

    print_counts("Task Status", &view.statuses);
    print_counts("Task Types", &view.task_types);

    if !view.top_users.is_empty() {
        println!("{}", "Top Users".bold().cyan());
        for (entry, label) in view.top_users.iter().zip(&view.top_user_labels) {
            println!(
                "  {:<24} {:>6}  {}",
                truncate(label, 24),
                entry.count,
                entry.label.dimmed()
            );
        }
        println!();
    }

    print_counts("Top Failed Users", &view.top_failed_users);
    print_task_rows(&view.tasks);
}

fn print_tiktok_table(view: &TikTokView, range: RangeToken) {
    print_title(Tab::Tiktok, range);

    println!("  {} {}", "TikTok tasks:  ".bold(), format_number(view.total_tasks));
    println!("  {} {}", "Product tasks: ".bold(), view.product_tasks);
    println!("  {} {}", "Creative tasks:".bold(), view.creative_tasks);
    println!();

    println!("{}", "Task Types".bold().cyan());
    println!(
        "  Product: {}  Creative: {}  Other: {}",
        view.types.product, view.types.creative, view.types.other
    );
    println!();

    print_status_buckets(&view.statuses.as_pairs());

    if !view.api_totals.is_empty() {
        println!("{}", "API Calls by Endpoint".bold().cyan());
        println!(
            "  {:<40} {:>10}  {}",
            "Endpoint",
            "Calls",
            format!("({} samples)", view.api_timeline.labels.len()).dimmed()
        );
        println!("  {}", "-".repeat(58));
        for total in &view.api_totals {
            println!(
                "  {:<40} {:>10}",
                truncate(&total.endpoint, 40),
                format_number(total.total as usize)
            );
        }
        println!();
    }

    print_task_rows(&view.tasks);
}

fn print_facebook_table(view: &FacebookView, range: RangeToken) {
    print_title(Tab::Facebook, range);

    let b = &view.batches;
    println!("  {} {}", "Facebook tasks:    ".bold(), format_number(view.total_tasks));
    println!("  {} {}", "Batches:           ".bold(), format_number(b.total_batches));
    println!("  {} {}", "Successful batches:".bold(), format_number(b.successful_batches));
    println!("  {} {:.1}s", "Total backoff:     ".bold(), b.total_backoff_sec);
    println!();

    println!("{}", "App Usage (per batch)".bold().cyan());
    println!(
        "  {}: {}  {}: {}  {}: {}",
        colorize_usage(UsageBucket::Critical),
        view.usage.critical,
        colorize_usage(UsageBucket::Warning),
        view.usage.warning,
        colorize_usage(UsageBucket::Safe),
        view.usage.safe,
    );
    println!();

    println!("{}", "Report Types".bold().cyan());
    println!(
        "  Daily: {}  Performance: {}  Breakdown: {}  Other: {}",
        view.types.daily, view.types.performance, view.types.breakdown, view.types.other
    );
    println!();

    print_status_buckets(&view.statuses.as_pairs());

    if view.tasks.is_empty() {
        return;
    }
    println!("{}", "Facebook Tasks".bold().cyan());
    println!(
        "  {:<12} {:<24} {:<24} {:<10} {:>9} {:>7}",
        "Job", "Template", "User", "Status", "Backoff", "Batches"
    );
    println!("  {}", "-".repeat(92));
    for (i, row) in view.tasks.iter().enumerate() {
        let line = format!(
            "  {:<12} {:<24} {:<24} {:<10} {:>8.1}s {:>7}",
            row.short_id,
            truncate(&row.template, 24),
            truncate(&row.user_email, 24),
            truncate(&row.status, 10),
            row.backoff_sec,
            row.batch_count,
        );
        print_striped(i, &line);
    }
}

fn print_counts(title: &str, entries: &[CountEntry]) {
    if entries.is_empty() {
        return;
    }
    println!("{}", title.bold().cyan());
    for entry in entries {
        println!("  {:<32} {:>6}", truncate(&entry.label, 32), entry.count);
    }
    println!();
}

fn print_status_buckets(pairs: &[(&'static str, usize)]) {
    println!("{}", "Status".bold().cyan());
    let cells: Vec<String> = pairs
        .iter()
        .map(|(label, count)| format!("{}: {count}", colorize_status(label)))
        .collect();
    println!("  {}", cells.join("  "));
    println!();
}

fn print_task_rows(rows: &[TaskRow]) {
    if rows.is_empty() {
        println!("{}", "No tasks in this range.".yellow());
        return;
    }
    println!("{}", "Tasks".bold().cyan());
    println!(
        "  {:<12} {:<22} {:<24} {:<10} {:<20} {:>10}",
        "Job", "Type", "User", "Status", "Started", "Duration"
    );
    println!("  {}", "-".repeat(102));
    for (i, row) in rows.iter().enumerate() {
        let line = format!(
            "  {:<12} {:<22} {:<24} {:<10} {:<20} {:>10}",
            row.short_id,
            truncate(&row.task_type, 22),
            truncate(&row.user_email, 24),
            truncate(&row.status, 10),
            row.start_time,
            row.duration,
        );
        print_striped(i, &line);
    }
}

fn print_striped(i: usize, line: &str) {
    if i % 2 == 0 {
        println!("{line}");
    } else {
        println!("{}", line.dimmed());
    }
}

fn print_task_rows_csv(rows: &[TaskRow]) {
    println!("job_id,task_type,user_email,status,start_time,end_time,duration,message");
    for r in rows {
        println!(
            "{},{},{},{},{},{},{},{}",
            csv_field(&r.job_id),
            csv_field(&r.task_type),
            csv_field(&r.user_email),
            csv_field(&r.status),
            csv_field(&r.start_time),
            csv_field(&r.end_time),
            csv_field(&r.duration),
            csv_field(&r.message),
        );
    }
}

fn print_facebook_rows_csv(rows: &[FacebookTaskRow]) {
    println!("job_id,template,user_email,status,backoff_sec,batch_count,message");
    for r in rows {
        println!(
            "{},{},{},{},{:.1},{},{}",
            csv_field(&r.job_id),
            csv_field(&r.template),
            csv_field(&r.user_email),
            csv_field(&r.status),
            r.backoff_sec,
            r.batch_count,
            csv_field(&r.message),
        );
    }
}

// ---------------------------------------------------------------------------
// taskboard task
// ---------------------------------------------------------------------------

/// Show the per-batch breakdown of one task.
pub fn run_task(
    source: &dyn PayloadSource,
    job_id: &str,
    account: &AccountSelector,
    metric: DetailMetric,
    format: OutputFormat,
) -> Result<()> {
    let store = load_store(source, Selection::default())?;
    let task = store
        .find_task(job_id)
        .with_context(|| format!("task '{job_id}' not found"))?;
    let view = views::task_detail(task, account, metric);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&view)?),
        OutputFormat::Csv => match &view.chart {
            Some(chart) => print_chart_csv(chart),
            None => anyhow::bail!("account {account:?} has no data in task '{job_id}'"),
        },
        OutputFormat::Table => print_task_detail(&view, account),
    }
    Ok(())
}

fn print_task_detail(view: &TaskDetailView, account: &AccountSelector) {
    println!("{} {}", "Task".bold().cyan(), view.job_id.bold());
    println!("{}", "=".repeat(60));
    println!("  {} {}", "Status: ".bold(), colorize_status(&view.status));
    println!("  {} {}", "User:   ".bold(), view.user_email);
    println!("  {} {}", "Started:".bold(), view.started);
    println!("  {} {}", "Batches:".bold(), view.detail.batch_len());
    println!();

    if !view.accounts.is_empty() {
        println!("{}", "Ad Accounts".bold().cyan());
        println!(
            "  {:<22} {:>12} {:>10} {:<18} {:>7}",
            "Account", "Max Insights", "Max ETA", "Tier", "Batches"
        );
        println!("  {}", "-".repeat(73));
        for (i, row) in view.accounts.iter().enumerate() {
            let line = format!(
                "  {:<22} {:>11.1}% {:>9.0}s {:<18} {:>7}",
                truncate(&row.account_id, 22),
                row.max_insights,
                row.max_eta,
                truncate(&row.tier, 18),
                row.batch_count,
            );
            print_striped(i, &line);
        }
        println!();
    }

    match &view.chart {
        Some(chart) => print_chart_table(chart),
        None => {
            if let AccountSelector::Account(id) = account {
                println!("{}", format!("Account {id} has no data in this task.").yellow());
            }
        }
    }
}

fn print_chart_table(chart: &DetailChart) {
    println!("{} {}", "Chart".bold().cyan(), format!("({})", chart.metric).dimmed());
    let mut header = format!("  {:<22}", "Batch");
    for dataset in &chart.datasets {
        header.push_str(&format!(" {:>28}", truncate(&dataset.label, 28)));
    }
    println!("{header}");
    println!("  {}", "-".repeat(22 + 29 * chart.datasets.len()));

    for (i, label) in chart.labels.iter().enumerate() {
        let mut line = format!("  {:<22}", truncate(label, 22));
        for dataset in &chart.datasets {
            let value = dataset.data.get(i).copied().unwrap_or(0.0);
            line.push_str(&format!(" {value:>28.2}"));
        }
        print_striped(i, &line);
    }

    if let Some(limit) = chart.limit_line {
        println!();
        println!("  {}", format!("Limit: {limit:.0}%").red());
    }
}

fn print_chart_csv(chart: &DetailChart) {
    let mut header = vec!["batch".to_string()];
    header.extend(chart.datasets.iter().map(|d| csv_field(&d.label)));
    println!("{}", header.join(","));

    for (i, label) in chart.labels.iter().enumerate() {
        let mut cells = vec![csv_field(label)];
        cells.extend(
            chart
                .datasets
                .iter()
                .map(|d| d.data.get(i).copied().unwrap_or(0.0).to_string()),
        );
        println!("{}", cells.join(","));
    }
}

// ---------------------------------------------------------------------------
// taskboard logs
// ---------------------------------------------------------------------------

/// Print a task's logs, or the inline placeholder/error text.
pub fn run_logs(source: &dyn PayloadSource, job_id: &str) -> Result<()> {
    let text = source::log_viewer_text(job_id, source.fetch_task_logs(job_id));
    println!("{text}");
    Ok(())
}

// ---------------------------------------------------------------------------
// taskboard watch
// ---------------------------------------------------------------------------

/// Poll forever and redraw the selected tab after every refresh. Fetch
/// failures keep the last good render on screen with a warning line.
pub fn run_watch(
    source: Box<dyn PayloadSource>,
    cfg: &TaskboardConfig,
    tab: Tab,
    range: RangeToken,
    interval: Duration,
) -> Result<()> {
    let origin = source.describe();
    let mut store = SnapshotStore::new(Selection {
        range,
        tab,
        ..Default::default()
    });
    let mut poller = Poller::new(source, interval);

    poller.run(&mut store, |store| {
        // Clear screen and home the cursor.
        print!("\x1B[2J\x1B[H");
        if let Some(view) = views::current(store, &cfg.dashboard, Utc::now()) {
            print_tab_table(&view, range);
        }
        print_watch_status(store, &origin, interval);
    })
}

fn print_watch_status(store: &SnapshotStore, origin: &str, interval: Duration) {
    let status = store.status();
    println!();
    if let Some(at) = status.fetched_at {
        println!(
            "  {}",
            format!(
                "{origin} · updated {} · refresh every {}s · Ctrl+C to stop",
                at.with_timezone(&Local).format("%H:%M:%S"),
                interval.as_secs()
            )
            .dimmed()
        );
    }
    if let Some(err) = &status.last_error {
        let prefix = if status.has_snapshot {
            "Refresh failed; showing last good data:"
        } else {
            "Could not load dashboard:"
        };
        println!("  {} {}", prefix.yellow(), err);
    }
}

// ---------------------------------------------------------------------------
// taskboard config show | init | set | reset
// ---------------------------------------------------------------------------

/// Show the effective (merged) configuration as TOML.
pub fn run_config_show() -> Result<()> {
    let toml_str = config::show_effective_config()?;
    println!("{}", "Effective taskboard Configuration".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();
    println!("{toml_str}");

    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    print_source_line(global_exists, "~/.taskboard/config.toml");
    print_source_line(project_exists, ".taskboard.toml");
    println!(
        "  {} {}",
        "·".dimmed(),
        "TASKBOARD_* environment variables".dimmed()
    );

    Ok(())
}

fn print_source_line(exists: bool, name: &str) {
    if exists {
        println!("  {} {}", "✓".green(), name.dimmed());
    } else {
        println!("  {} {}", "·".dimmed(), format!("{name} (not found)").dimmed());
    }
}

/// Initialize a default config file at `~/.taskboard/config.toml`.
pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!(
        "{} Config written to {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

/// Set a single configuration value in the global config file.
pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    let path = config::set_config_value(key, value)?;
    println!(
        "{} Set {} = {} {}",
        "✓".green().bold(),
        key.bold(),
        value,
        format!("({})", path.display()).dimmed()
    );
    Ok(())
}

/// Reset configuration to defaults.
pub fn run_config_reset() -> Result<()> {
    let path = config::reset_config()?;
    println!(
        "{} Config reset to defaults at {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// Format a number with comma separators for readability.
fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, ch) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    result.chars().rev().collect()
}

/// Truncate a string to `max_len` characters, appending "…" if truncated.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

/// Quote a CSV cell when it contains a separator, quote, or newline.
fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Colorize a task status by its bucket.
fn colorize_status(status: &str) -> colored::ColoredString {
    match StatusBucket::classify(Some(status)) {
        StatusBucket::Success => status.green(),
        StatusBucket::Failed => status.red(),
        StatusBucket::Cancelled => status.yellow(),
        StatusBucket::Started => status.blue(),
    }
}

fn colorize_usage(bucket: UsageBucket) -> colored::ColoredString {
    match bucket {
        UsageBucket::Critical => bucket.label().red(),
        UsageBucket::Warning => bucket.label().yellow(),
        UsageBucket::Safe => bucket.label().green(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! View models for each dashboard tab.
//!
//! These bundle the aggregation outputs a presentation layer needs for one
//! tab: summary cards, grouped counts, chart series, and table rows. They
//! are plain serializable data; the CLI prints them and the web API returns
//! them as JSON.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analytics::detail::{self, AccountSelector, DetailChart, DetailMetric, TaskDetail};
use crate::analytics::metrics::{
    self, FacebookBatchStats, FacebookTypeCounts, GroupField, StatusBuckets, SummaryCounts,
    TikTokTypeCounts, UsageBuckets,
};
use crate::analytics::timeseries::{self, ChartSeries};
use crate::analytics::{CountMap, subsets};
use crate::config::schema::DashboardConfig;
use crate::model::time::{display_timestamp, display_timestamp_or_na};
use crate::model::{ApiTimeseries, TaskRecord};
use crate::store::SnapshotStore;

// ---------------------------------------------------------------------------
// Tabs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    Overview,
    Tiktok,
    Facebook,
}

impl Tab {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Overview => "overview",
            Self::Tiktok => "tiktok",
            Self::Facebook => "facebook",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Overview => "Dashboard Overview",
            Self::Tiktok => "TikTok Dashboard",
            Self::Facebook => "Facebook Dashboard",
        }
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tab {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overview" => Ok(Self::Overview),
            "tiktok" => Ok(Self::Tiktok),
            "facebook" => Ok(Self::Facebook),
            other => anyhow::bail!("unknown tab '{other}' (expected overview, tiktok or facebook)"),
        }
    }
}

/// The rendered content of whichever tab is selected.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "tab", rename_all = "lowercase")]
pub enum TabView {
    Overview(OverviewView),
    Tiktok(TikTokView),
    Facebook(FacebookView),
}

/// Render the selected tab from the store. `None` before the first fetch.
pub fn current(store: &SnapshotStore, config: &DashboardConfig, now: DateTime<Utc>) -> Option<TabView> {
    let payload = store.payload()?;
    let tasks = store.filtered(now);

    Some(match store.selection().tab {
        Tab::Overview => TabView::Overview(overview(&tasks, config)),
        Tab::Tiktok => TabView::Tiktok(tiktok(&tasks, &payload.api_timeseries, config)),
        Tab::Facebook => TabView::Facebook(facebook(&tasks, config)),
    })
}

// ---------------------------------------------------------------------------
// Task rows
// ---------------------------------------------------------------------------

/// One row of a task table, with display formatting applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskRow {
    pub job_id: String,
    /// First eight characters of the job id followed by `...`.
    pub short_id: String,
    pub task_type: String,
    pub user_email: String,
    pub status: String,
    pub start_time: String,
    pub end_time: String,
    /// Two decimals with an `s` suffix, empty when absent or zero.
    pub duration: String,
    pub message: String,
}

impl TaskRow {
    pub fn from_task(task: &TaskRecord) -> Self {
        Self {
            job_id: task.job_id.clone(),
            short_id: short_job_id(&task.job_id),
            task_type: task.task_type.clone().unwrap_or_default(),
            user_email: task.user_email.clone().unwrap_or_default(),
            status: task.status.clone().unwrap_or_default(),
            start_time: display_timestamp(task.start_time.as_deref()),
            end_time: display_timestamp(task.end_time.as_deref()),
            duration: task
                .duration_seconds
                .filter(|d| *d != 0.0)
                .map(|d| format!("{d:.2}s"))
                .unwrap_or_default(),
            message: task.message.clone().unwrap_or_default(),
        }
    }
}

pub fn short_job_id(job_id: &str) -> String {
    let prefix: String = job_id.chars().take(8).collect();
    format!("{prefix}...")
}

fn task_rows(tasks: &[&TaskRecord], limit: usize) -> Vec<TaskRow> {
    tasks
        .iter()
        .take(limit)
        .map(|t| TaskRow::from_task(t))
        .collect()
}

/// `(label, count)` pairs in display order.
fn pairs(entries: Vec<(String, usize)>) -> Vec<CountEntry> {
    entries
        .into_iter()
        .map(|(label, count)| CountEntry { label, count })
        .collect()
}

fn map_pairs(counts: &CountMap) -> Vec<CountEntry> {
    counts
        .iter()
        .map(|(label, count)| CountEntry {
            label: label.clone(),
            count: *count,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountEntry {
    pub label: String,
    pub count: usize,
}

// ---------------------------------------------------------------------------
// Overview
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct OverviewView {
    pub summary: SummaryCounts,
    /// Verbatim status histogram.
    pub statuses: Vec<CountEntry>,
    pub task_types: Vec<CountEntry>,
    pub top_users: Vec<CountEntry>,
    /// Local parts of `top_users` emails, for compact chart labels.
    pub top_user_labels: Vec<String>,
    pub top_failed_users: Vec<CountEntry>,
    pub tasks: Vec<TaskRow>,
}

pub fn overview(tasks: &[&TaskRecord], config: &DashboardConfig) -> OverviewView {
    let users = metrics::group_by_field(tasks, GroupField::UserEmail);
    let top_users = metrics::top_n(&users, config.top_users, true);
    let top_user_labels = top_users
        .iter()
        .map(|(email, _)| metrics::short_email(email).to_string())
        .collect();

    let failed = metrics::failed_users(tasks);

    OverviewView {
        summary: metrics::summary_counts(tasks),
        statuses: map_pairs(&metrics::status_histogram(tasks)),
        task_types: map_pairs(&metrics::group_by_field(tasks, GroupField::TaskType)),
        top_users: pairs(top_users),
        top_user_labels,
        top_failed_users: pairs(metrics::top_n(&failed, config.top_failed_users, true)),
        tasks: task_rows(tasks, config.row_limit),
    }
}

// ---------------------------------------------------------------------------
// TikTok
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct TikTokView {
    pub total_tasks: usize,
    pub product_tasks: usize,
    pub creative_tasks: usize,
    pub types: TikTokTypeCounts,
    pub statuses: StatusBuckets,
    /// TikTok endpoint call counts over time.
    pub api_timeline: ChartSeries,
    /// Total calls per TikTok endpoint, highest first.
    pub api_totals: Vec<EndpointTotal>,
    pub tasks: Vec<TaskRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointTotal {
    pub endpoint: String,
    pub total: u64,
}

pub fn tiktok(tasks: &[&TaskRecord], series: &ApiTimeseries, config: &DashboardConfig) -> TikTokView {
    let tk_tasks = subsets::tiktok_tasks(tasks);
    let endpoints = timeseries::select_endpoints(series, subsets::TIKTOK_DOMAIN);

    TikTokView {
        total_tasks: tk_tasks.len(),
        product_tasks: metrics::count_type_containing(&tk_tasks, "product"),
        creative_tasks: metrics::count_type_containing(&tk_tasks, "creative"),
        types: metrics::tiktok_type_breakdown(&tk_tasks),
        statuses: metrics::status_buckets(&tk_tasks),
        api_timeline: timeseries::project(&endpoints),
        api_totals: timeseries::endpoint_totals(&endpoints)
            .into_iter()
            .map(|(endpoint, total)| EndpointTotal { endpoint, total })
            .collect(),
        tasks: task_rows(&tk_tasks, config.row_limit),
    }
}

// ---------------------------------------------------------------------------
// Facebook
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct FacebookView {
    pub total_tasks: usize,
    pub batches: FacebookBatchStats,
    pub usage: UsageBuckets,
    pub types: FacebookTypeCounts,
    pub statuses: StatusBuckets,
    pub tasks: Vec<FacebookTaskRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FacebookTaskRow {
    pub job_id: String,
    pub short_id: String,
    /// Report template, `N/A` when absent.
    pub template: String,
    pub user_email: String,
    pub status: String,
    pub backoff_sec: f64,
    pub batch_count: u64,
    pub message: String,
}

impl FacebookTaskRow {
    pub fn from_task(task: &TaskRecord) -> Self {
        Self {
            job_id: task.job_id.clone(),
            short_id: short_job_id(&task.job_id),
            template: task.template_name.clone().unwrap_or_else(|| "N/A".to_string()),
            user_email: task.user_email.clone().unwrap_or_default(),
            status: task.status.clone().unwrap_or_default(),
            backoff_sec: task.api_counts.total_backoff_sec(),
            batch_count: task.api_counts.batch_count(),
            message: task.message.clone().unwrap_or_default(),
        }
    }
}

pub fn facebook(tasks: &[&TaskRecord], config: &DashboardConfig) -> FacebookView {
    let fb_tasks = subsets::facebook_tasks(tasks);

    FacebookView {
        total_tasks: fb_tasks.len(),
        batches: metrics::facebook_batch_stats(&fb_tasks),
        usage: metrics::classify_usage_buckets(&fb_tasks),
        types: metrics::facebook_type_breakdown(&fb_tasks),
        statuses: metrics::status_buckets(&fb_tasks),
        tasks: fb_tasks
            .iter()
            .take(config.row_limit)
            .map(|t| FacebookTaskRow::from_task(t))
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Task detail
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct TaskDetailView {
    pub job_id: String,
    pub status: String,
    pub user_email: String,
    /// Start time for the header; `N/A` when missing or unparseable.
    pub started: String,
    pub detail: TaskDetail,
    pub accounts: Vec<AccountRow>,
    /// `None` when the selected account is not part of this task.
    pub chart: Option<DetailChart>,
}

/// Account table row, ordered by batch appearances.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountRow {
    pub account_id: String,
    pub max_insights: f64,
    pub max_eta: f64,
    pub tier: String,
    pub batch_count: usize,
}

pub fn task_detail(task: &TaskRecord, account: &AccountSelector, metric: DetailMetric) -> TaskDetailView {
    let detail = detail::extract(task);
    let accounts = detail
        .ranked_accounts()
        .into_iter()
        .map(|(id, series)| AccountRow {
            account_id: id.to_string(),
            max_insights: series.max_insights,
            max_eta: series.max_eta,
            tier: series.tier_label().to_string(),
            batch_count: series.batch_count,
        })
        .collect();
    let chart = detail::chart_view(&detail, account, metric);

    TaskDetailView {
        job_id: task.job_id.clone(),
        status: task.status.clone().unwrap_or_default(),
        user_email: task.user_email.clone().unwrap_or_default(),
        started: display_timestamp_or_na(task.start_time.as_deref()),
        detail,
        accounts,
        chart,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> TaskRecord {
        TaskRecord::from_value(&value)
    }

    #[test]
    fn short_job_id_truncates() {
        assert_eq!(short_job_id("0123456789abcdef"), "01234567...");
        assert_eq!(short_job_id("abc"), "abc...");
    }

    #[test]
    fn task_row_formats_duration_and_dates() {
        let row = TaskRow::from_task(&record(json!({
            "job_id": "job-1",
            "duration_seconds": 3.14159,
            "start_time": "garbage"
        })));
        assert_eq!(row.duration, "3.14s");
        assert_eq!(row.start_time, "");
        assert_eq!(row.end_time, "");
    }

    #[test]
    fn overview_limits_rows() {
        let records: Vec<TaskRecord> = (0..5)
            .map(|i| record(json!({"job_id": format!("j{i}"), "status": "SUCCESS"})))
            .collect();
        let refs: Vec<&TaskRecord> = records.iter().collect();
        let config = DashboardConfig {
            row_limit: 3,
            ..Default::default()
        };
        let view = overview(&refs, &config);
        assert_eq!(view.tasks.len(), 3);
        assert_eq!(view.summary.total, 5);
    }

    #[test]
    fn facebook_row_defaults() {
        let row = FacebookTaskRow::from_task(&record(json!({"job_id": "fb"})));
        assert_eq!(row.template, "N/A");
        assert_eq!(row.batch_count, 0);
        assert_eq!(row.backoff_sec, 0.0);
    }

    #[test]
    fn detail_header_uses_na_fallback() {
        let view = task_detail(
            &record(json!({"job_id": "x", "start_time": "bad"})),
            &AccountSelector::All,
            DetailMetric::AppUsage,
        );
        assert_eq!(view.started, "N/A");
        assert!(view.chart.is_some());
    }

    #[test]
    fn tab_parsing_and_titles() {
        assert_eq!("TikTok".parse::<Tab>().unwrap(), Tab::Tiktok);
        assert!("ads".parse::<Tab>().is_err());
        assert_eq!(Tab::Facebook.title(), "Facebook Dashboard");
    }
}

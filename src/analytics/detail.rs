//! Per-task usage breakdown across batches and ad accounts.
//!
//! [`extract`] walks a task's batch summaries in order and produces series
//! that all share one x-axis (one slot per batch). Accounts that show up
//! late are back-filled with zeros; accounts missing from a later batch get
//! a zero for that batch. Every account series therefore has exactly
//! `labels.len()` entries.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::TaskRecord;
use crate::model::time::display_timestamp;

/// Use-case type whose access tier is reported per account.
const ADS_INSIGHTS_USE_CASE: &str = "ads_insights";

/// Insights usage level drawn as a limit line on the insights chart.
pub const INSIGHTS_LIMIT_PCT: f64 = 95.0;

/// Aligned per-batch series for one task.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskDetail {
    /// Formatted batch timestamp, or `Batch {n}` when the batch has none.
    pub labels: Vec<String>,
    /// Global app usage per batch, in percent.
    pub app_usage: Vec<f64>,
    /// Largest per-account CPU time in each batch.
    pub max_cpu_time: Vec<f64>,
    /// Largest per-account process time in each batch.
    pub max_total_time: Vec<f64>,
    pub accounts: IndexMap<String, AccountSeries>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AccountSeries {
    pub insights_usage: Vec<f64>,
    pub eta_seconds: Vec<f64>,
    pub cpu_time: Vec<f64>,
    pub total_time: Vec<f64>,
    pub max_insights: f64,
    pub max_eta: f64,
    /// Access tier from the most recent batch with an `ads_insights` use case.
    pub tier: Option<String>,
    /// Number of batches the account appeared in.
    pub batch_count: usize,
}

impl AccountSeries {
    fn zeroed(len: usize) -> Self {
        Self {
            insights_usage: vec![0.0; len],
            eta_seconds: vec![0.0; len],
            cpu_time: vec![0.0; len],
            total_time: vec![0.0; len],
            ..Default::default()
        }
    }

    fn push_zero(&mut self) {
        self.insights_usage.push(0.0);
        self.eta_seconds.push(0.0);
        self.cpu_time.push(0.0);
        self.total_time.push(0.0);
    }

    pub fn tier_label(&self) -> &str {
        self.tier.as_deref().unwrap_or("N/A")
    }
}

pub fn extract(task: &TaskRecord) -> TaskDetail {
    let mut detail = TaskDetail::default();

    for (index, summary) in task.summaries().iter().enumerate() {
        let label = match summary.timestamp.as_deref() {
            Some(ts) => display_timestamp(Some(ts)),
            None => format!("Batch {}", index + 1),
        };
        detail.labels.push(label);
        detail.app_usage.push(summary.app_usage_pct * 100.0);

        // Every known account gets a zero slot for this batch; accounts seen
        // in the batch overwrite it below.
        for series in detail.accounts.values_mut() {
            series.push_zero();
        }

        let mut max_cpu = 0.0_f64;
        let mut max_total = 0.0_f64;
        let mut seen_in_batch: Vec<&str> = Vec::new();

        for account in &summary.accounts {
            let series = detail
                .accounts
                .entry(account.account_id.clone())
                .or_insert_with(|| AccountSeries::zeroed(index + 1));

            let mut cpu = 0.0;
            let mut total = 0.0;
            for use_case in &account.business_use_cases {
                cpu += use_case.total_cputime;
                total += use_case.total_time;
                if use_case.use_case_type.as_deref() == Some(ADS_INSIGHTS_USE_CASE) {
                    series.tier = use_case.ads_api_access_tier.clone();
                }
            }

            series.insights_usage[index] = account.insights_usage_pct;
            series.eta_seconds[index] = account.eta_seconds;
            series.cpu_time[index] = cpu;
            series.total_time[index] = total;
            series.max_insights = series.max_insights.max(account.insights_usage_pct);
            series.max_eta = series.max_eta.max(account.eta_seconds);

            if !seen_in_batch.contains(&account.account_id.as_str()) {
                series.batch_count += 1;
                seen_in_batch.push(&account.account_id);
            }

            max_cpu = max_cpu.max(cpu);
            max_total = max_total.max(total);
        }

        detail.max_cpu_time.push(max_cpu);
        detail.max_total_time.push(max_total);
    }

    detail
}

impl TaskDetail {
    pub fn batch_len(&self) -> usize {
        self.labels.len()
    }

    /// Accounts by batch appearances, most active first; ties keep insertion
    /// order.
    pub fn ranked_accounts(&self) -> Vec<(&str, &AccountSeries)> {
        let mut ranked: Vec<(&str, &AccountSeries)> = self
            .accounts
            .iter()
            .map(|(id, series)| (id.as_str(), series))
            .collect();
        ranked.sort_by(|a, b| b.1.batch_count.cmp(&a.1.batch_count));
        ranked
    }
}

// ---------------------------------------------------------------------------
// Chart selection
// ---------------------------------------------------------------------------

/// Which series the detail chart shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailMetric {
    #[default]
    AppUsage,
    InsightsUsage,
    Eta,
    TimeStats,
}

impl DetailMetric {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AppUsage => "app_usage",
            Self::InsightsUsage => "insights_usage",
            Self::Eta => "eta",
            Self::TimeStats => "time_stats",
        }
    }

    /// Metrics that only make sense for a single account.
    pub fn is_per_account(self) -> bool {
        matches!(self, Self::InsightsUsage | Self::Eta)
    }
}

impl fmt::Display for DetailMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DetailMetric {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "app_usage" => Ok(Self::AppUsage),
            "insights_usage" => Ok(Self::InsightsUsage),
            "eta" => Ok(Self::Eta),
            "time_stats" => Ok(Self::TimeStats),
            other => anyhow::bail!(
                "unknown metric '{other}' (expected app_usage, insights_usage, eta or time_stats)"
            ),
        }
    }
}

/// Either every account or one account id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountSelector {
    #[default]
    All,
    Account(String),
}

impl AccountSelector {
    /// `None`, empty, and `all` select every account.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") | Some("all") => Self::All,
            Some(id) => Self::Account(id.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailDataset {
    pub label: String,
    pub data: Vec<f64>,
}

/// Data for the detail chart under the current selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailChart {
    /// Metric actually shown (may differ from the requested one).
    pub metric: DetailMetric,
    pub labels: Vec<String>,
    pub datasets: Vec<DetailDataset>,
    /// Fixed y-axis maximum; `None` auto-scales.
    pub y_max: Option<f64>,
    /// Horizontal reference line, if any.
    pub limit_line: Option<f64>,
}

/// Select the chart series for an account/metric pair. Returns `None` for an
/// account id the task never reported.
pub fn chart_view(
    detail: &TaskDetail,
    account: &AccountSelector,
    metric: DetailMetric,
) -> Option<DetailChart> {
    let dataset = |label: String, data: &[f64]| DetailDataset {
        label,
        data: data.to_vec(),
    };
    let global_usage = || dataset("App Usage PCT (Global)".to_string(), &detail.app_usage);

    let (metric, datasets, y_max) = match account {
        AccountSelector::All => {
            // Per-account metrics fall back to global usage.
            let metric = if metric.is_per_account() {
                DetailMetric::AppUsage
            } else {
                metric
            };
            match metric {
                DetailMetric::TimeStats => (
                    metric,
                    vec![
                        dataset(
                            "Max CPU Time (Across All Accounts)".to_string(),
                            &detail.max_cpu_time,
                        ),
                        dataset(
                            "Max Process Time (Across All Accounts)".to_string(),
                            &detail.max_total_time,
                        ),
                    ],
                    None,
                ),
                _ => (DetailMetric::AppUsage, vec![global_usage()], Some(100.0)),
            }
        }
        AccountSelector::Account(id) => {
            let series = detail.accounts.get(id)?;
            match metric {
                DetailMetric::AppUsage => (metric, vec![global_usage()], Some(100.0)),
                DetailMetric::InsightsUsage => (
                    metric,
                    vec![dataset(
                        format!("Insights Usage PCT ({id})"),
                        &series.insights_usage,
                    )],
                    Some(100.0),
                ),
                DetailMetric::Eta => (
                    metric,
                    vec![dataset(format!("ETA Seconds ({id})"), &series.eta_seconds)],
                    None,
                ),
                DetailMetric::TimeStats => (
                    metric,
                    vec![
                        dataset(format!("Total CPU Time ({id})"), &series.cpu_time),
                        dataset(format!("Total Process Time ({id})"), &series.total_time),
                    ],
                    None,
                ),
            }
        }
    };

    Some(DetailChart {
        metric,
        labels: detail.labels.clone(),
        datasets,
        y_max,
        limit_line: (metric == DetailMetric::InsightsUsage).then_some(INSIGHTS_LIMIT_PCT),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn task_with_summaries(summaries: serde_json::Value) -> TaskRecord {
        TaskRecord::from_value(&json!({
            "job_id": "detail",
            "api_total_counts": {"summaries": summaries}
        }))
    }

    #[test]
    fn task_without_summaries_is_empty() {
        let detail = extract(&TaskRecord::default());
        assert_eq!(detail.batch_len(), 0);
        assert!(detail.accounts.is_empty());
    }

    #[test]
    fn labels_fall_back_to_batch_numbers() {
        let detail = extract(&task_with_summaries(json!([
            {"rate_limits": {"app_usage_pct": 0.1}},
            {"timestamp": "nonsense", "rate_limits": {"app_usage_pct": 0.2}},
            {"timestamp": "2025-01-15T10:00:00", "rate_limits": {}}
        ])));
        assert_eq!(detail.labels[0], "Batch 1");
        assert_eq!(detail.labels[1], "");
        assert!(!detail.labels[2].is_empty());
        assert_eq!(detail.app_usage.len(), 3);
        assert!((detail.app_usage[1] - 20.0).abs() < 1e-9);
        assert_eq!(detail.app_usage[2], 0.0);
    }

    #[test]
    fn tier_only_changes_on_ads_insights() {
        let detail = extract(&task_with_summaries(json!([
            {"rate_limits": {"account_details": [{
                "account_id": "A",
                "business_use_cases": [
                    {"type": "ads_management", "ads_api_access_tier": "development_access"},
                    {"type": "ads_insights", "ads_api_access_tier": "standard_access"}
                ]
            }]}},
            {"rate_limits": {"account_details": [{
                "account_id": "A",
                "business_use_cases": [
                    {"type": "ads_management", "ads_api_access_tier": "development_access"}
                ]
            }]}}
        ])));
        assert_eq!(detail.accounts["A"].tier.as_deref(), Some("standard_access"));
    }

    #[test]
    fn duplicate_account_in_one_batch_keeps_lengths() {
        let detail = extract(&task_with_summaries(json!([
            {"rate_limits": {"account_details": [
                {"account_id": "A", "insights_usage_pct": 10},
                {"account_id": "A", "insights_usage_pct": 30}
            ]}}
        ])));
        let series = &detail.accounts["A"];
        assert_eq!(series.insights_usage, vec![30.0]);
        assert_eq!(series.max_insights, 30.0);
        assert_eq!(series.batch_count, 1);
    }

    #[test]
    fn all_accounts_coerces_per_account_metrics() {
        let detail = extract(&task_with_summaries(json!([
            {"rate_limits": {"app_usage_pct": 0.5, "account_details": [{"account_id": "A"}]}}
        ])));
        let chart = chart_view(&detail, &AccountSelector::All, DetailMetric::Eta).unwrap();
        assert_eq!(chart.metric, DetailMetric::AppUsage);
        assert_eq!(chart.datasets[0].data, vec![50.0]);
        assert_eq!(chart.y_max, Some(100.0));
    }

    #[test]
    fn insights_chart_has_limit_line() {
        let detail = extract(&task_with_summaries(json!([
            {"rate_limits": {"account_details": [{"account_id": "A", "insights_usage_pct": 42}]}}
        ])));
        let chart = chart_view(
            &detail,
            &AccountSelector::Account("A".into()),
            DetailMetric::InsightsUsage,
        )
        .unwrap();
        assert_eq!(chart.limit_line, Some(INSIGHTS_LIMIT_PCT));
        assert_eq!(chart.datasets[0].label, "Insights Usage PCT (A)");
    }

    #[test]
    fn unknown_account_has_no_chart() {
        let detail = extract(&TaskRecord::default());
        assert!(
            chart_view(&detail, &AccountSelector::Account("nope".into()), DetailMetric::Eta)
                .is_none()
        );
    }

    #[test]
    fn metric_and_selector_parsing() {
        assert_eq!("time_stats".parse::<DetailMetric>().unwrap(), DetailMetric::TimeStats);
        assert!("cpu".parse::<DetailMetric>().is_err());
        assert_eq!(AccountSelector::parse(Some("all")), AccountSelector::All);
        assert_eq!(AccountSelector::parse(None), AccountSelector::All);
        assert_eq!(
            AccountSelector::parse(Some("act_1")),
            AccountSelector::Account("act_1".into())
        );
    }
}

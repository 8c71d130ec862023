//! Scalar and grouped statistics over a task subset.
//!
//! All functions take the filtered subset as `&[&TaskRecord]` and are total:
//! absent optional fields count as zero or are skipped, never an error.

use std::collections::HashSet;

use serde::Serialize;

use super::CountMap;
use crate::model::TaskRecord;

/// Key used when a grouping field is missing.
pub const UNKNOWN_KEY: &str = "Unknown";

// ---------------------------------------------------------------------------
// Summary cards
// ---------------------------------------------------------------------------

/// Headline numbers for the overview cards.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SummaryCounts {
    pub total: usize,
    /// Tasks whose status is exactly `SUCCESS`.
    pub successful: usize,
    pub success_rate_pct: f64,
    /// Mean over tasks with a positive duration only.
    pub avg_duration_seconds: f64,
    /// Distinct emails containing `@`.
    pub distinct_email_count: usize,
}

pub fn summary_counts(tasks: &[&TaskRecord]) -> SummaryCounts {
    let total = tasks.len();
    let successful = tasks
        .iter()
        .filter(|t| t.status.as_deref() == Some("SUCCESS"))
        .count();

    let success_rate_pct = if total == 0 {
        0.0
    } else {
        (successful as f64 / total as f64) * 100.0
    };

    let durations: Vec<f64> = tasks
        .iter()
        .filter_map(|t| t.duration_seconds)
        .filter(|d| *d > 0.0)
        .collect();
    let avg_duration_seconds = if durations.is_empty() {
        0.0
    } else {
        durations.iter().sum::<f64>() / durations.len() as f64
    };

    let distinct_email_count = tasks
        .iter()
        .filter_map(|t| t.user_email.as_deref())
        .filter(|e| e.contains('@'))
        .collect::<HashSet<_>>()
        .len();

    SummaryCounts {
        total,
        successful,
        success_rate_pct,
        avg_duration_seconds,
        distinct_email_count,
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Status strings exactly as reported, in first-encountered order.
pub fn status_histogram(tasks: &[&TaskRecord]) -> CountMap {
    group_by_field(tasks, GroupField::Status)
}

/// Normalized four-way status classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StatusBucket {
    Success,
    Failed,
    Cancelled,
    Started,
}

impl StatusBucket {
    /// Case-insensitive; anything unrecognized (including a missing status)
    /// counts as failed.
    pub fn classify(status: Option<&str>) -> Self {
        match status.unwrap_or("").to_ascii_uppercase().as_str() {
            "SUCCESS" | "COMPLETED" => Self::Success,
            "CANCELLED" | "REVOKED" => Self::Cancelled,
            "STARTED" | "RUNNING" => Self::Started,
            _ => Self::Failed,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Failed => "Failed",
            Self::Cancelled => "Cancelled",
            Self::Started => "Started",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusBuckets {
    pub success: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub started: usize,
}

impl StatusBuckets {
    pub fn total(&self) -> usize {
        self.success + self.failed + self.cancelled + self.started
    }

    /// Chart order: Success, Failed, Cancelled, Started.
    pub fn as_pairs(&self) -> [(&'static str, usize); 4] {
        [
            (StatusBucket::Success.label(), self.success),
            (StatusBucket::Failed.label(), self.failed),
            (StatusBucket::Cancelled.label(), self.cancelled),
            (StatusBucket::Started.label(), self.started),
        ]
    }
}

pub fn status_buckets(tasks: &[&TaskRecord]) -> StatusBuckets {
    let mut buckets = StatusBuckets::default();
    for task in tasks {
        match StatusBucket::classify(task.status.as_deref()) {
            StatusBucket::Success => buckets.success += 1,
            StatusBucket::Failed => buckets.failed += 1,
            StatusBucket::Cancelled => buckets.cancelled += 1,
            StatusBucket::Started => buckets.started += 1,
        }
    }
    buckets
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupField {
    /// Missing type is grouped under [`UNKNOWN_KEY`].
    TaskType,
    /// Tasks without an email are skipped.
    UserEmail,
    /// Verbatim status; missing status is grouped under [`UNKNOWN_KEY`].
    Status,
}

pub fn group_by_field(tasks: &[&TaskRecord], field: GroupField) -> CountMap {
    let mut counts = CountMap::new();
    for task in tasks {
        let key = match field {
            GroupField::TaskType => Some(task.task_type.as_deref().unwrap_or(UNKNOWN_KEY)),
            GroupField::UserEmail => task.user_email.as_deref(),
            GroupField::Status => Some(task.status.as_deref().unwrap_or(UNKNOWN_KEY)),
        };
        if let Some(key) = key {
            *counts.entry(key.to_string()).or_default() += 1;
        }
    }
    counts
}

/// Entries sorted by count (stable: ties keep first-encountered order),
/// truncated to `n`.
pub fn top_n(counts: &CountMap, n: usize, descending: bool) -> Vec<(String, usize)> {
    let mut entries: Vec<(String, usize)> = counts
        .iter()
        .map(|(key, count)| (key.clone(), *count))
        .collect();

    if descending {
        entries.sort_by(|a, b| b.1.cmp(&a.1));
    } else {
        entries.sort_by(|a, b| a.1.cmp(&b.1));
    }

    entries.truncate(n);
    entries
}

/// Failed (`FAILED` / `FAILURE`) task counts per email; missing email is
/// grouped under [`UNKNOWN_KEY`].
pub fn failed_users(tasks: &[&TaskRecord]) -> CountMap {
    let mut counts = CountMap::new();
    for task in tasks {
        if matches!(task.status.as_deref(), Some("FAILED" | "FAILURE")) {
            let email = task.user_email.as_deref().unwrap_or(UNKNOWN_KEY);
            *counts.entry(email.to_string()).or_default() += 1;
        }
    }
    counts
}

/// Local part of an email for compact chart labels.
pub fn short_email(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

// ---------------------------------------------------------------------------
// Usage buckets
// ---------------------------------------------------------------------------

/// Warning threshold for app usage, in percent.
pub const USAGE_WARNING_PCT: f64 = 75.0;
/// Critical threshold for app usage, in percent.
pub const USAGE_CRITICAL_PCT: f64 = 95.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UsageBucket {
    Safe,
    Warning,
    Critical,
}

impl UsageBucket {
    /// Classify a usage percentage (0–100). Boundaries belong to the upper
    /// bucket.
    pub fn classify_pct(pct: f64) -> Self {
        if pct >= USAGE_CRITICAL_PCT {
            Self::Critical
        } else if pct >= USAGE_WARNING_PCT {
            Self::Warning
        } else {
            Self::Safe
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Safe => "Safe (<75%)",
            Self::Warning => "Warning (75-95%)",
            Self::Critical => "Critical (>95%)",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UsageBuckets {
    pub safe: usize,
    pub warning: usize,
    pub critical: usize,
}

impl UsageBuckets {
    pub fn total(&self) -> usize {
        self.safe + self.warning + self.critical
    }
}

/// Every batch summary of every task, bucketed by `app_usage_pct × 100`.
pub fn classify_usage_buckets(tasks: &[&TaskRecord]) -> UsageBuckets {
    let mut buckets = UsageBuckets::default();
    for summary in tasks.iter().flat_map(|t| t.summaries()) {
        match UsageBucket::classify_pct(summary.app_usage_pct * 100.0) {
            UsageBucket::Safe => buckets.safe += 1,
            UsageBucket::Warning => buckets.warning += 1,
            UsageBucket::Critical => buckets.critical += 1,
        }
    }
    buckets
}

// ---------------------------------------------------------------------------
// Per-platform breakdowns
// ---------------------------------------------------------------------------

/// TikTok job kinds, by case-insensitive substring of the task type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TikTokTypeCounts {
    pub product: usize,
    pub creative: usize,
    pub other: usize,
}

pub fn tiktok_type_breakdown(tasks: &[&TaskRecord]) -> TikTokTypeCounts {
    let mut counts = TikTokTypeCounts::default();
    for task in tasks {
        let kind = task.task_type_str().to_lowercase();
        if kind.contains("product") {
            counts.product += 1;
        } else if kind.contains("creative") {
            counts.creative += 1;
        } else {
            counts.other += 1;
        }
    }
    counts
}

/// Number of tasks whose type contains `needle` (case-sensitive). Drives the
/// TikTok product/creative cards.
pub fn count_type_containing(tasks: &[&TaskRecord], needle: &str) -> usize {
    tasks
        .iter()
        .filter(|t| t.task_type_str().contains(needle))
        .count()
}

/// Facebook report kinds, by case-insensitive substring of the task type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FacebookTypeCounts {
    pub daily: usize,
    pub performance: usize,
    pub breakdown: usize,
    pub other: usize,
}

pub fn facebook_type_breakdown(tasks: &[&TaskRecord]) -> FacebookTypeCounts {
    let mut counts = FacebookTypeCounts::default();
    for task in tasks {
        let kind = task.task_type_str().to_lowercase();
        if kind.contains("daily") {
            counts.daily += 1;
        } else if kind.contains("performance") {
            counts.performance += 1;
        } else if kind.contains("breakdown") {
            counts.breakdown += 1;
        } else {
            counts.other += 1;
        }
    }
    counts
}

/// Batch-level health across Facebook tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FacebookBatchStats {
    pub total_batches: usize,
    /// Batches with at least one success and no errors.
    pub successful_batches: usize,
    pub total_backoff_sec: f64,
}

pub fn facebook_batch_stats(tasks: &[&TaskRecord]) -> FacebookBatchStats {
    let mut stats = FacebookBatchStats::default();
    for task in tasks {
        stats.total_backoff_sec += task.api_counts.total_backoff_sec();
        for summary in task.summaries() {
            stats.total_batches += 1;
            if summary.success_count > 0 && summary.error_count == 0 {
                stats.successful_batches += 1;
            }
        }
    }
    stats
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

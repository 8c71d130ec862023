//! Wire types for the dashboard endpoint and their ingestion.
//!
//! The backend emits loosely-typed JSON: optional fields go missing, numbers
//! sometimes arrive as strings, and `api_total_counts` is either a flat
//! endpoint→count map or a rich object with per-batch `summaries`. Every
//! record is resolved **once** here into explicit Rust types so the
//! aggregation pipeline never re-inspects JSON shapes. Ingestion is total:
//! malformed optional fields become absent/zero/empty instead of errors.

pub mod time;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Body of `GET <dashboard-endpoint>`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "RawPayload")]
pub struct DashboardPayload {
    pub task_logs: Vec<TaskRecord>,
    pub api_timeseries: ApiTimeseries,
}

#[derive(Deserialize)]
struct RawPayload {
    #[serde(default)]
    task_logs: Value,
    #[serde(default)]
    api_timeseries: Value,
}

impl From<RawPayload> for DashboardPayload {
    fn from(raw: RawPayload) -> Self {
        let task_logs = match raw.task_logs {
            Value::Array(items) => items.iter().map(TaskRecord::from_value).collect(),
            _ => Vec::new(),
        };

        Self {
            task_logs,
            api_timeseries: timeseries_from_value(&raw.api_timeseries),
        }
    }
}

impl DashboardPayload {
    /// Look up a task by job id. The first match wins.
    pub fn find_task(&self, job_id: &str) -> Option<&TaskRecord> {
        self.task_logs.iter().find(|t| t.job_id == job_id)
    }
}

/// Body of `GET <dashboard-endpoint>/logs/<jobId>`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogsResponse {
    #[serde(default)]
    pub logs: Value,
}

impl LogsResponse {
    /// The log text, or `None` when the field is absent, empty, or not a
    /// string.
    pub fn text(&self) -> Option<String> {
        non_empty_string(&self.logs)
    }
}

// ---------------------------------------------------------------------------
// Timeseries
// ---------------------------------------------------------------------------

/// Endpoint URL → chronological points. Map order follows the payload.
pub type ApiTimeseries = IndexMap<String, Vec<TimeseriesPoint>>;

/// One `{timestamp, count}` sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeseriesPoint {
    pub timestamp: Option<String>,
    pub count: u64,
}

fn timeseries_from_value(value: &Value) -> ApiTimeseries {
    let Some(map) = value.as_object() else {
        return ApiTimeseries::new();
    };

    map.iter()
        .map(|(endpoint, points)| {
            let points = points
                .as_array()
                .map(|items| {
                    items
                        .iter()
                        .map(|p| TimeseriesPoint {
                            timestamp: non_empty_string(field(p, "timestamp")),
                            count: as_u64(field(p, "count")),
                        })
                        .collect()
                })
                .unwrap_or_default();
            (endpoint.clone(), points)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Task records
// ---------------------------------------------------------------------------

/// One logged execution of a background job.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskRecord {
    pub job_id: String,
    pub task_type: Option<String>,
    pub user_email: Option<String>,
    pub status: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub duration_seconds: Option<f64>,
    pub message: Option<String>,
    pub template_name: Option<String>,
    pub api_counts: ApiCounts,
    /// Compact JSON of the raw `api_total_counts` value, empty when absent.
    /// Substring membership checks run against this text.
    pub api_counts_text: String,
}

impl<'de> Deserialize<'de> for TaskRecord {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

impl TaskRecord {
    /// Resolve a raw JSON task into a typed record. Never fails; a non-object
    /// value yields an empty record.
    pub fn from_value(value: &Value) -> Self {
        let raw_counts = field(value, "api_total_counts");
        let api_counts_text = if is_truthy(raw_counts) {
            serde_json::to_string(raw_counts).unwrap_or_default()
        } else {
            String::new()
        };

        Self {
            job_id: id_string(field(value, "job_id")),
            task_type: non_empty_string(field(value, "task_type")),
            user_email: non_empty_string(field(value, "user_email")),
            status: non_empty_string(field(value, "status")),
            start_time: non_empty_string(field(value, "start_time")),
            end_time: non_empty_string(field(value, "end_time")),
            duration_seconds: as_f64(field(value, "duration_seconds")),
            message: non_empty_string(field(value, "message")),
            template_name: non_empty_string(field(value, "template_name")),
            api_counts: ApiCounts::from_value(raw_counts),
            api_counts_text,
        }
    }

    pub fn task_type_str(&self) -> &str {
        self.task_type.as_deref().unwrap_or("")
    }

    pub fn status_str(&self) -> &str {
        self.status.as_deref().unwrap_or("")
    }

    /// Batch summaries when the task carries rich usage data, else empty.
    pub fn summaries(&self) -> &[BatchSummary] {
        match &self.api_counts {
            ApiCounts::Batches(usage) => &usage.summaries,
            _ => &[],
        }
    }
}

// ---------------------------------------------------------------------------
// api_total_counts
// ---------------------------------------------------------------------------

/// The two shapes of `api_total_counts`, decided by the presence of a
/// `summaries` key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ApiCounts {
    #[default]
    Absent,
    /// Endpoint URL → call count, in payload order.
    Flat { counts: IndexMap<String, u64> },
    Batches(BatchUsage),
}

impl ApiCounts {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(map) if map.contains_key("summaries") => {
                Self::Batches(BatchUsage::from_object(map))
            }
            Value::Object(map) => Self::Flat {
                counts: map
                    .iter()
                    .filter_map(|(endpoint, count)| {
                        count_value(count).map(|n| (endpoint.clone(), n))
                    })
                    .collect(),
            },
            _ => Self::Absent,
        }
    }

    pub fn total_backoff_sec(&self) -> f64 {
        match self {
            Self::Batches(usage) => usage.total_backoff_sec,
            _ => 0.0,
        }
    }

    pub fn batch_count(&self) -> u64 {
        match self {
            Self::Batches(usage) => usage.batch_count,
            _ => 0,
        }
    }
}

/// Rich usage object written by the batch-based sync workers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchUsage {
    pub summaries: Vec<BatchSummary>,
    pub total_backoff_sec: f64,
    pub batch_count: u64,
    pub request_count: u64,
    pub total_rows_written: u64,
}

impl BatchUsage {
    fn from_object(map: &Map<String, Value>) -> Self {
        let get = |key: &str| map.get(key).unwrap_or(&Value::Null);
        Self {
            summaries: get("summaries")
                .as_array()
                .map(|items| items.iter().map(BatchSummary::from_value).collect())
                .unwrap_or_default(),
            total_backoff_sec: as_f64(get("total_backoff_sec")).unwrap_or(0.0),
            batch_count: as_u64(get("batch_count")),
            request_count: as_u64(get("request_count")),
            total_rows_written: as_u64(get("total_rows_written")),
        }
    }
}

/// Point-in-time rate-limit snapshot captured after one batch request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub timestamp: Option<String>,
    /// Application-wide usage as a fraction (0–1).
    pub app_usage_pct: f64,
    pub accounts: Vec<AccountSnapshot>,
    pub success_count: u64,
    pub error_count: u64,
}

impl BatchSummary {
    pub fn from_value(value: &Value) -> Self {
        let rate_limits = field(value, "rate_limits");
        Self {
            timestamp: non_empty_string(field(value, "timestamp")),
            app_usage_pct: as_f64(field(rate_limits, "app_usage_pct")).unwrap_or(0.0),
            accounts: field(rate_limits, "account_details")
                .as_array()
                .map(|items| items.iter().map(AccountSnapshot::from_value).collect())
                .unwrap_or_default(),
            success_count: as_u64(field(value, "success_count")),
            error_count: as_u64(field(value, "error_count")),
        }
    }
}

/// Per-ad-account usage inside one batch summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AccountSnapshot {
    pub account_id: String,
    pub insights_usage_pct: f64,
    pub eta_seconds: f64,
    pub business_use_cases: Vec<BusinessUseCase>,
}

impl AccountSnapshot {
    pub fn from_value(value: &Value) -> Self {
        Self {
            account_id: id_string(field(value, "account_id")),
            insights_usage_pct: as_f64(field(value, "insights_usage_pct")).unwrap_or(0.0),
            eta_seconds: as_f64(field(value, "eta_seconds")).unwrap_or(0.0),
            business_use_cases: field(value, "business_use_cases")
                .as_array()
                .map(|items| items.iter().map(BusinessUseCase::from_value).collect())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BusinessUseCase {
    pub use_case_type: Option<String>,
    pub total_cputime: f64,
    pub total_time: f64,
    pub ads_api_access_tier: Option<String>,
}

impl BusinessUseCase {
    pub fn from_value(value: &Value) -> Self {
        Self {
            use_case_type: non_empty_string(field(value, "type")),
            total_cputime: as_f64(field(value, "total_cputime")).unwrap_or(0.0),
            total_time: as_f64(field(value, "total_time")).unwrap_or(0.0),
            ads_api_access_tier: non_empty_string(field(value, "ads_api_access_tier")),
        }
    }
}

// ---------------------------------------------------------------------------
// Lenient accessors
// ---------------------------------------------------------------------------

fn field<'a>(value: &'a Value, key: &str) -> &'a Value {
    value.get(key).unwrap_or(&Value::Null)
}

fn non_empty_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Identifiers arrive as strings or bare numbers.
fn id_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn as_u64(value: &Value) -> u64 {
    count_value(value).unwrap_or(0)
}

/// Non-negative integer counts. Fractions are truncated, negatives dropped.
fn count_value(value: &Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    as_f64(value).filter(|n| *n >= 0.0).map(|n| n as u64)
}

/// JSON truthiness as the dashboard backend treats it: null, false, zero and
/// empty strings are absent.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

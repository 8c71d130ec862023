//! Relative date-range filtering of task records.
//!
//! A task's *effective start time* is its parsed `start_time`, or `now` when
//! that field is missing or unparseable. Records with bad timestamps are
//! therefore never excluded by a range: they always look brand new.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::model::TaskRecord;
use crate::model::time::parse_timestamp;

/// The time windows offered by the range selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RangeToken {
    #[serde(rename = "24h")]
    Last24Hours,
    #[serde(rename = "7d")]
    Last7Days,
    #[serde(rename = "30d")]
    Last30Days,
    #[default]
    #[serde(rename = "all")]
    All,
}

impl RangeToken {
    pub const ALL_TOKENS: [RangeToken; 4] = [
        Self::Last24Hours,
        Self::Last7Days,
        Self::Last30Days,
        Self::All,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Last24Hours => "24h",
            Self::Last7Days => "7d",
            Self::Last30Days => "30d",
            Self::All => "all",
        }
    }

    /// Length of the window, `None` for `all`.
    pub fn window(self) -> Option<Duration> {
        match self {
            Self::Last24Hours => Some(Duration::hours(24)),
            Self::Last7Days => Some(Duration::days(7)),
            Self::Last30Days => Some(Duration::days(30)),
            Self::All => None,
        }
    }

    /// Earliest effective start time that passes the filter.
    pub fn cutoff(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.window().map(|w| now - w)
    }

    /// Lenient parse used at the HTTP boundary: anything unknown means no
    /// filtering.
    pub fn parse_or_all(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.parse().ok()).unwrap_or(Self::All)
    }
}

impl fmt::Display for RangeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RangeToken {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "24h" => Ok(Self::Last24Hours),
            "7d" => Ok(Self::Last7Days),
            "30d" => Ok(Self::Last30Days),
            "all" => Ok(Self::All),
            other => anyhow::bail!("unknown range '{other}' (expected 24h, 7d, 30d or all)"),
        }
    }
}

/// Parsed `start_time`, falling back to `now` when missing or invalid.
pub fn effective_start_time(task: &TaskRecord, now: DateTime<Utc>) -> DateTime<Utc> {
    task.start_time
        .as_deref()
        .and_then(parse_timestamp)
        .unwrap_or(now)
}

/// Records whose effective start time is on or after the range cutoff, in
/// their original order. `all` keeps every record.
pub fn filter_tasks(tasks: &[TaskRecord], range: RangeToken, now: DateTime<Utc>) -> Vec<&TaskRecord> {
    let Some(cutoff) = range.cutoff(now) else {
        return tasks.iter().collect();
    };

    tasks
        .iter()
        .filter(|t| effective_start_time(t, now) >= cutoff)
        .collect()
}

/// Re-apply a range to an already filtered subset.
pub fn refilter<'a>(
    tasks: &[&'a TaskRecord],
    range: RangeToken,
    now: DateTime<Utc>,
) -> Vec<&'a TaskRecord> {
    let Some(cutoff) = range.cutoff(now) else {
        return tasks.to_vec();
    };

    tasks
        .iter()
        .copied()
        .filter(|t| effective_start_time(t, now) >= cutoff)
        .collect()
}

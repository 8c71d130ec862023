//! In-memory snapshot of the last successful fetch plus the user's current
//! selection.
//!
//! The snapshot is only ever replaced wholesale. Fetches are identified by
//! [`FetchTicket`]s so out-of-order completions can be told apart in logs,
//! but completion order decides what is shown: the last completion wins,
//! even when it carries an older ticket. A failed fetch leaves the previous
//! snapshot in place.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::analytics::detail::{AccountSelector, DetailMetric};
use crate::filter::{self, RangeToken};
use crate::model::{DashboardPayload, TaskRecord};
use crate::views::Tab;

/// Identifies one fetch request, in issue order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct FetchTicket(pub u64);

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub payload: DashboardPayload,
    pub fetched_at: DateTime<Utc>,
    pub ticket: FetchTicket,
}

/// What the user is currently looking at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub range: RangeToken,
    pub tab: Tab,
    pub account: AccountSelector,
    pub metric: DetailMetric,
}

/// Health of the refresh cycle, for status displays.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStatus {
    pub has_snapshot: bool,
    pub fetched_at: Option<DateTime<Utc>>,
    pub task_count: usize,
    pub endpoint_count: usize,
    pub applied_ticket: Option<FetchTicket>,
    pub consecutive_failures: usize,
    pub last_error: Option<String>,
}

#[derive(Debug, Default)]
pub struct SnapshotStore {
    snapshot: Option<Snapshot>,
    selection: Selection,
    next_ticket: u64,
    consecutive_failures: usize,
    last_error: Option<String>,
}

impl SnapshotStore {
    pub fn new(selection: Selection) -> Self {
        Self {
            selection,
            ..Default::default()
        }
    }

    /// Issue a ticket for a fetch that is about to start.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.next_ticket += 1;
        FetchTicket(self.next_ticket)
    }

    /// Apply a finished fetch. On success the snapshot is replaced and `true`
    /// is returned; on failure the error is logged and recorded, and the
    /// previous snapshot stays authoritative.
    pub fn complete(
        &mut self,
        ticket: FetchTicket,
        result: anyhow::Result<DashboardPayload>,
        now: DateTime<Utc>,
    ) -> bool {
        match result {
            Ok(payload) => {
                if let Some(current) = &self.snapshot
                    && current.ticket > ticket
                {
                    tracing::debug!(
                        stale = ticket.0,
                        current = current.ticket.0,
                        "older fetch completed last; replacing snapshot"
                    );
                }
                tracing::debug!(
                    ticket = ticket.0,
                    tasks = payload.task_logs.len(),
                    endpoints = payload.api_timeseries.len(),
                    "snapshot replaced"
                );
                self.snapshot = Some(Snapshot {
                    payload,
                    fetched_at: now,
                    ticket,
                });
                self.consecutive_failures = 0;
                self.last_error = None;
                true
            }
            Err(e) => {
                tracing::warn!(ticket = ticket.0, error = %format!("{e:#}"), "dashboard fetch failed; keeping previous snapshot");
                self.consecutive_failures += 1;
                self.last_error = Some(format!("{e:#}"));
                false
            }
        }
    }

    /// Convenience for callers that fetch and apply in one step.
    pub fn replace(&mut self, payload: DashboardPayload, now: DateTime<Utc>) {
        let ticket = self.begin_fetch();
        self.complete(ticket, Ok(payload), now);
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    pub fn payload(&self) -> Option<&DashboardPayload> {
        self.snapshot.as_ref().map(|s| &s.payload)
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut Selection {
        &mut self.selection
    }

    /// Task subset for the selected range. Empty before the first fetch.
    pub fn filtered(&self, now: DateTime<Utc>) -> Vec<&TaskRecord> {
        self.filtered_with(self.selection.range, now)
    }

    pub fn filtered_with(&self, range: RangeToken, now: DateTime<Utc>) -> Vec<&TaskRecord> {
        match self.payload() {
            Some(payload) => filter::filter_tasks(&payload.task_logs, range, now),
            None => Vec::new(),
        }
    }

    /// Look up a task in the full snapshot, ignoring the range filter.
    pub fn find_task(&self, job_id: &str) -> Option<&TaskRecord> {
        self.payload()?.find_task(job_id)
    }

    pub fn status(&self) -> StoreStatus {
        StoreStatus {
            has_snapshot: self.snapshot.is_some(),
            fetched_at: self.snapshot.as_ref().map(|s| s.fetched_at),
            task_count: self.payload().map_or(0, |p| p.task_logs.len()),
            endpoint_count: self.payload().map_or(0, |p| p.api_timeseries.len()),
            applied_ticket: self.snapshot.as_ref().map(|s| s.ticket),
            consecutive_failures: self.consecutive_failures,
            last_error: self.last_error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn payload(ids: &[&str]) -> DashboardPayload {
        DashboardPayload {
            task_logs: ids
                .iter()
                .map(|id| TaskRecord {
                    job_id: id.to_string(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn empty_until_first_fetch() {
        let store = SnapshotStore::default();
        assert!(store.snapshot().is_none());
        assert!(store.filtered(now()).is_empty());
        assert!(!store.status().has_snapshot);
    }

    #[test]
    fn tickets_increase() {
        let mut store = SnapshotStore::default();
        let a = store.begin_fetch();
        let b = store.begin_fetch();
        assert!(b > a);
    }

    #[test]
    fn failure_keeps_previous_snapshot() {
        let mut store = SnapshotStore::default();
        store.replace(payload(&["a", "b"]), now());

        let ticket = store.begin_fetch();
        let applied = store.complete(ticket, Err(anyhow::anyhow!("connection refused")), now());

        assert!(!applied);
        assert_eq!(store.payload().unwrap().task_logs.len(), 2);
        let status = store.status();
        assert_eq!(status.consecutive_failures, 1);
        assert!(status.last_error.unwrap().contains("connection refused"));
    }

    #[test]
    fn last_completion_wins() {
        let mut store = SnapshotStore::default();
        let older = store.begin_fetch();
        let newer = store.begin_fetch();

        store.complete(newer, Ok(payload(&["new"])), now());
        store.complete(older, Ok(payload(&["old"])), now());

        assert_eq!(store.snapshot().unwrap().ticket, older);
        assert!(store.find_task("old").is_some());
        assert!(store.find_task("new").is_none());
    }

    #[test]
    fn success_resets_failure_count() {
        let mut store = SnapshotStore::default();
        let t = store.begin_fetch();
        store.complete(t, Err(anyhow::anyhow!("boom")), now());
        store.replace(payload(&["a"]), now());
        let status = store.status();
        assert_eq!(status.consecutive_failures, 0);
        assert!(status.last_error.is_none());
        assert_eq!(status.task_count, 1);
    }
}

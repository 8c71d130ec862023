//! Payload sources for the dashboard.
//!
//! The dashboard only ever reads two things: the full dashboard payload and
//! the log text of one task. [`PayloadSource`] abstracts where they come
//! from: [`HttpSource`] talks to the live backend through the synchronous
//! `ureq` client, and [`FileSource`] reads a saved payload from disk.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::config::schema::SourceConfig;
use crate::model::{DashboardPayload, LogsResponse};

/// Shown in place of log text when a task has none.
pub const NO_LOGS_MESSAGE: &str = "No logs found.";

pub trait PayloadSource {
    /// Fetch the full `{task_logs, api_timeseries}` payload.
    fn fetch_dashboard(&self) -> Result<DashboardPayload>;

    /// Fetch the log text for one task. `Ok(None)` means the task has no logs.
    fn fetch_task_logs(&self, job_id: &str) -> Result<Option<String>>;

    /// Human-readable origin, for status lines.
    fn describe(&self) -> String;
}

/// Text for the log viewer: the logs, [`NO_LOGS_MESSAGE`], or the error
/// inline. Failures are also logged.
pub fn log_viewer_text(job_id: &str, result: Result<Option<String>>) -> String {
    match result {
        Ok(Some(text)) => text,
        Ok(None) => NO_LOGS_MESSAGE.to_string(),
        Err(e) => {
            tracing::warn!(job_id, error = %format!("{e:#}"), "failed to load task logs");
            format!("Error loading logs: {e:#}")
        }
    }
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

/// Synchronous client for the dashboard backend.
#[derive(Debug, Clone)]
pub struct HttpSource {
    endpoint: String,
    timeout: Duration,
}

impl HttpSource {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// Build a client from the resolved config.
    pub fn from_config(config: &SourceConfig) -> Self {
        Self::new(&config.endpoint, Duration::from_millis(config.timeout_ms))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// `<endpoint>/logs/<job_id>`, with the job id percent-encoded.
    pub fn logs_url(&self, job_id: &str) -> String {
        format!("{}/logs/{}", self.endpoint, urlencoding::encode(job_id))
    }
}

impl PayloadSource for HttpSource {
    fn fetch_dashboard(&self) -> Result<DashboardPayload> {
        let resp = ureq::get(&self.endpoint)
            .timeout(self.timeout)
            .call()
            .with_context(|| format!("failed to fetch dashboard from {}", self.endpoint))?;

        let payload: DashboardPayload = resp
            .into_json()
            .context("failed to parse dashboard payload")?;

        tracing::debug!(
            tasks = payload.task_logs.len(),
            endpoints = payload.api_timeseries.len(),
            "dashboard fetched"
        );
        Ok(payload)
    }

    fn fetch_task_logs(&self, job_id: &str) -> Result<Option<String>> {
        let url = self.logs_url(job_id);
        let resp = ureq::get(&url)
            .timeout(self.timeout)
            .call()
            .with_context(|| format!("failed to fetch logs from {url}"))?;

        let logs: LogsResponse = resp.into_json().context("failed to parse logs response")?;
        Ok(logs.text())
    }

    fn describe(&self) -> String {
        self.endpoint.clone()
    }
}

// ---------------------------------------------------------------------------
// File
// ---------------------------------------------------------------------------

/// Reads a saved dashboard payload from disk on every fetch.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PayloadSource for FileSource {
    fn fetch_dashboard(&self) -> Result<DashboardPayload> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse dashboard payload in {}", self.path.display()))
    }

    fn fetch_task_logs(&self, _job_id: &str) -> Result<Option<String>> {
        anyhow::bail!(
            "task logs are not available from a file source ({})",
            self.path.display()
        )
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

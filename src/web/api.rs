//! JSON API handlers for the web dashboard.
//!
//! Each handler corresponds to an API endpoint and returns a
//! `Response<Cursor<Vec<u8>>>` with JSON content.

use std::io::Cursor;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use tiny_http::{Response, StatusCode};

use crate::analytics::detail::{AccountSelector, DetailMetric};
use crate::filter::RangeToken;
use crate::source;
use crate::store::{Selection, StoreStatus};
use crate::views::{self, Tab, TabView};

use super::{AppState, content_type_json, error_response};

// ---------------------------------------------------------------------------
// JSON response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct TabResponse {
    range: RangeToken,
    #[serde(flatten)]
    view: TabView,
}

#[derive(Serialize)]
struct LogsResponse<'a> {
    job_id: &'a str,
    text: String,
}

#[derive(Serialize)]
struct RefreshResponse {
    refreshed: bool,
    status: StoreStatus,
}

#[derive(Serialize)]
struct StatusResponse<'a> {
    source: String,
    poll_interval_secs: u64,
    selection: &'a Selection,
    store: StoreStatus,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a JSON success response.
fn json_response<T: Serialize>(data: &T) -> Result<Response<Cursor<Vec<u8>>>> {
    let body = serde_json::to_string(data).context("failed to serialize JSON response")?;
    Ok(Response::from_data(body.into_bytes())
        .with_header(content_type_json())
        .with_status_code(StatusCode(200)))
}

/// Extract and percent-decode one query parameter. `+` means a space.
fn query_param(url: &str, key: &str) -> Option<String> {
    url.split_once('?')?.1.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == key).then(|| decode_component(&v.replace('+', " ")))
    })
}

/// Percent-decode a path segment or query value. Malformed escapes are
/// kept literally and invalid UTF-8 is replaced.
pub(super) fn decode_component(raw: &str) -> String {
    String::from_utf8_lossy(&urlencoding::decode_binary(raw.as_bytes())).into_owned()
}

fn no_data_yet() -> Response<Cursor<Vec<u8>>> {
    error_response(503, "no dashboard data yet; waiting for the first fetch")
}

// ---------------------------------------------------------------------------
// API Handlers
// ---------------------------------------------------------------------------

/// `GET /api/{overview,tiktok,facebook}?range=`: one tab's view. Without
/// `range` the current selection is kept; unknown ranges mean `all`.
pub fn get_tab(url: &str, tab: Tab, state: &mut AppState) -> Result<Response<Cursor<Vec<u8>>>> {
    let selection = state.store.selection_mut();
    selection.tab = tab;
    if let Some(raw) = query_param(url, "range") {
        selection.range = RangeToken::parse_or_all(Some(&raw));
    }
    let range = selection.range;

    match views::current(&state.store, &state.dashboard, Utc::now()) {
        Some(view) => json_response(&TabResponse { range, view }),
        None => Ok(no_data_yet()),
    }
}

/// `GET /api/tasks/<id>?account=&metric=`: per-batch breakdown of one task.
pub fn get_task(url: &str, job_id: &str, state: &mut AppState) -> Result<Response<Cursor<Vec<u8>>>> {
    let account = AccountSelector::parse(query_param(url, "account").as_deref());
    let metric = query_param(url, "metric")
        .and_then(|m| m.parse::<DetailMetric>().ok())
        .unwrap_or_default();

    let selection = state.store.selection_mut();
    selection.account = account.clone();
    selection.metric = metric;

    if state.store.payload().is_none() {
        return Ok(no_data_yet());
    }
    let Some(task) = state.store.find_task(job_id) else {
        return Ok(error_response(404, &format!("task '{job_id}' not found")));
    };

    json_response(&views::task_detail(task, &account, metric))
}

/// `GET /api/tasks/<id>/logs`: log text, placeholder, or inline error.
pub fn get_task_logs(job_id: &str, state: &mut AppState) -> Result<Response<Cursor<Vec<u8>>>> {
    let result = state.poller.source().fetch_task_logs(job_id);
    json_response(&LogsResponse {
        job_id,
        text: source::log_viewer_text(job_id, result),
    })
}

/// `POST /api/refresh`: fetch now instead of waiting for the next poll.
pub fn post_refresh(state: &mut AppState) -> Result<Response<Cursor<Vec<u8>>>> {
    let refreshed = state.poller.refresh(&mut state.store);
    json_response(&RefreshResponse {
        refreshed,
        status: state.store.status(),
    })
}

/// `GET /api/status`: snapshot age, failures, and current selection.
pub fn get_status(state: &mut AppState) -> Result<Response<Cursor<Vec<u8>>>> {
    json_response(&StatusResponse {
        source: state.poller.source().describe(),
        poll_interval_secs: state.poller.interval().as_secs(),
        selection: state.store.selection(),
        store: state.store.status(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

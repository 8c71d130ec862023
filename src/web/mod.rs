//! Embedded web dashboard for taskboard.
//!
//! Provides a lightweight HTTP server (sync, via `tiny_http`) that serves:
//! - A single-page dashboard rendering the tab views as tables
//! - JSON API endpoints for each tab, task details, logs, refresh and status
//!
//! Launched via `taskboard serve` (default: `http://127.0.0.1:9747`).
//!
//! Requests and the periodic refresh share one thread: the server waits for
//! a request only until the next poll is due, so a fetch never overlaps a
//! request and every response is a projection of one consistent snapshot.

mod api;
mod frontend;

use std::io::{Cursor, Read};

use anyhow::{Context, Result};
use tiny_http::{Header, Method, Response, Server, StatusCode};

use crate::config::schema::DashboardConfig;
use crate::poller::Poller;
use crate::store::{Selection, SnapshotStore};
use crate::views::Tab;

/// Everything a request handler may read or mutate.
pub struct AppState {
    pub store: SnapshotStore,
    pub poller: Poller,
    pub dashboard: DashboardConfig,
}

impl AppState {
    pub fn new(poller: Poller, dashboard: DashboardConfig) -> Self {
        let store = SnapshotStore::new(Selection {
            range: dashboard.default_range,
            ..Default::default()
        });
        Self {
            store,
            poller,
            dashboard,
        }
    }
}

// ---------------------------------------------------------------------------
// Server entry point
// ---------------------------------------------------------------------------

/// Start the web dashboard server on the given address.
///
/// Blocks the current thread. Handles requests sequentially (sufficient for
/// a local single-user dashboard) and refreshes the snapshot whenever the
/// poll interval elapses. Per-request errors become 500 responses.
pub fn serve(addr: &str, mut state: AppState, open: bool) -> Result<()> {
    let server = Server::http(addr)
        .map_err(|e| anyhow::anyhow!("failed to start HTTP server on {addr}: {e}"))?;

    println!("taskboard dashboard running at http://{addr}");
    println!(
        "Polling {} every {}s. Press Ctrl+C to stop.\n",
        state.poller.source().describe(),
        state.poller.interval().as_secs()
    );
    tracing::info!(addr, "web dashboard started");

    if open {
        let url = format!("http://{addr}");
        if let Err(e) = open_browser(&url) {
            tracing::debug!(error = %e, "could not open browser");
        }
    }

    loop {
        state.poller.tick(&mut state.store);

        let request = server
            .recv_timeout(state.poller.time_until_due())
            .context("HTTP server stopped accepting requests")?;
        let Some(mut request) = request else {
            continue;
        };

        let method = request.method().clone();
        let url = request.url().to_string();

        // POST bodies are not used by any route; drain them anyway.
        if matches!(method, Method::Post | Method::Put) {
            let mut sink = String::new();
            let _ = request.as_reader().read_to_string(&mut sink);
        }

        let resp = match dispatch(&method, &url, &mut state) {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(%method, url = %url, error = %format!("{e:#}"), "request failed");
                error_response(500, &format!("{e:#}"))
            }
        };
        let status = resp.status_code().0;

        if let Err(e) = request.respond(resp) {
            tracing::debug!(error = %e, "client went away before response");
        }

        tracing::info!(%method, url = %url, status, "request");
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Dispatch an incoming request to the appropriate handler.
fn dispatch(method: &Method, url: &str, state: &mut AppState) -> Result<Response<Cursor<Vec<u8>>>> {
    // Strip query string for path matching
    let path = url.split('?').next().unwrap_or(url);
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    match (method, segments.as_slice()) {
        // Frontend
        (&Method::Get, [""]) | (&Method::Get, ["index.html"]) => Ok(serve_frontend()),

        // API: tabs
        (&Method::Get, ["api", "overview"]) => api::get_tab(url, Tab::Overview, state),
        (&Method::Get, ["api", "tiktok"]) => api::get_tab(url, Tab::Tiktok, state),
        (&Method::Get, ["api", "facebook"]) => api::get_tab(url, Tab::Facebook, state),

        // API: single task
        (&Method::Get, ["api", "tasks", job_id]) => {
            api::get_task(url, &api::decode_component(job_id), state)
        }
        (&Method::Get, ["api", "tasks", job_id, "logs"]) => {
            api::get_task_logs(&api::decode_component(job_id), state)
        }

        // API: refresh cycle
        (&Method::Post, ["api", "refresh"]) => api::post_refresh(state),
        (&Method::Get, ["api", "status"]) => api::get_status(state),

        // 404
        _ => Ok(error_response(404, "not found")),
    }
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

/// Serve the embedded single-page frontend.
fn serve_frontend() -> Response<Cursor<Vec<u8>>> {
    Response::from_data(frontend::INDEX_HTML.as_bytes().to_vec())
        .with_header(content_type_html())
        .with_status_code(StatusCode(200))
}

/// `{"error": message}` with the given status.
pub(crate) fn error_response(status: u16, message: &str) -> Response<Cursor<Vec<u8>>> {
    let body = serde_json::json!({ "error": message }).to_string();
    Response::from_data(body.into_bytes())
        .with_header(content_type_json())
        .with_status_code(StatusCode(status))
}

/// JSON content type header.
pub(crate) fn content_type_json() -> Header {
    Header::from_bytes("Content-Type", "application/json; charset=utf-8")
        .expect("static header is valid")
}

/// HTML content type header.
fn content_type_html() -> Header {
    Header::from_bytes("Content-Type", "text/html; charset=utf-8").expect("static header is valid")
}

/// Attempt to open a URL in the system default browser.
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", url])
            .spawn()
            .context("failed to open browser")?;
    }

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open")
            .arg(url)
            .spawn()
            .context("failed to open browser")?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open")
            .arg(url)
            .spawn()
            .context("failed to open browser")?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DashboardPayload;
    use crate::source::PayloadSource;
    use std::time::Duration;

    struct Fixed(serde_json::Value);

    impl PayloadSource for Fixed {
        fn fetch_dashboard(&self) -> Result<DashboardPayload> {
            Ok(serde_json::from_value(self.0.clone())?)
        }

        fn fetch_task_logs(&self, job_id: &str) -> Result<Option<String>> {
            Ok((job_id == "with-logs").then(|| "hello".to_string()))
        }

        fn describe(&self) -> String {
            "fixed".to_string()
        }
    }

    fn state() -> AppState {
        let payload = serde_json::json!({
            "task_logs": [
                {"job_id": "with-logs", "task_type": "facebook_daily", "status": "SUCCESS"},
                {"job_id": "tk-1", "task_type": "product", "status": "FAILED"},
                {"job_id": "sync job#1", "task_type": "product", "status": "SUCCESS"}
            ],
            "api_timeseries": {}
        });
        let poller = Poller::new(Box::new(Fixed(payload)), Duration::from_secs(30));
        AppState::new(poller, DashboardConfig::default())
    }

    fn body(resp: Response<Cursor<Vec<u8>>>) -> (u16, serde_json::Value) {
        let status = resp.status_code().0;
        let mut text = String::new();
        resp.into_reader().read_to_string(&mut text).unwrap();
        (status, serde_json::from_str(&text).unwrap_or(serde_json::Value::Null))
    }

    #[test]
    fn tab_before_first_fetch_is_unavailable() {
        let mut state = state();
        let (status, json) = body(dispatch(&Method::Get, "/api/overview", &mut state).unwrap());
        assert_eq!(status, 503);
        assert!(json["error"].is_string());
    }

    #[test]
    fn refresh_then_overview() {
        let mut state = state();
        let (status, json) = body(dispatch(&Method::Post, "/api/refresh", &mut state).unwrap());
        assert_eq!(status, 200);
        assert_eq!(json["refreshed"], true);

        let (status, json) =
            body(dispatch(&Method::Get, "/api/overview?range=7d", &mut state).unwrap());
        assert_eq!(status, 200);
        assert_eq!(json["tab"], "overview");
        assert_eq!(json["summary"]["total"], 3);
        assert_eq!(state.store.selection().range, crate::filter::RangeToken::Last7Days);
    }

    #[test]
    fn task_routes() {
        let mut state = state();
        dispatch(&Method::Post, "/api/refresh", &mut state).unwrap();

        let (status, json) =
            body(dispatch(&Method::Get, "/api/tasks/with-logs?metric=eta", &mut state).unwrap());
        assert_eq!(status, 200);
        assert_eq!(json["job_id"], "with-logs");

        let (status, _) = body(dispatch(&Method::Get, "/api/tasks/missing", &mut state).unwrap());
        assert_eq!(status, 404);

        let (_, json) =
            body(dispatch(&Method::Get, "/api/tasks/with-logs/logs", &mut state).unwrap());
        assert_eq!(json["text"], "hello");

        let (_, json) = body(dispatch(&Method::Get, "/api/tasks/tk-1/logs", &mut state).unwrap());
        assert_eq!(json["text"], "No logs found.");
    }

    #[test]
    fn encoded_job_id_is_decoded() {
        let mut state = state();
        dispatch(&Method::Post, "/api/refresh", &mut state).unwrap();

        let (status, json) =
            body(dispatch(&Method::Get, "/api/tasks/sync%20job%231", &mut state).unwrap());
        assert_eq!(status, 200);
        assert_eq!(json["job_id"], "sync job#1");

        let (status, json) =
            body(dispatch(&Method::Get, "/api/tasks/sync%20job%231/logs", &mut state).unwrap());
        assert_eq!(status, 200);
        assert_eq!(json["job_id"], "sync job#1");
    }

    #[test]
    fn unknown_route_is_404() {
        let mut state = state();
        let (status, _) = body(dispatch(&Method::Get, "/api/nope", &mut state).unwrap());
        assert_eq!(status, 404);
    }

    #[test]
    fn frontend_is_served() {
        let mut state = state();
        let resp = dispatch(&Method::Get, "/", &mut state).unwrap();
        assert_eq!(resp.status_code().0, 200);
    }
}

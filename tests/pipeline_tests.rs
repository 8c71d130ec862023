//! Aggregation pipeline tests: range filtering, metrics, subsets, and
//! timeseries projection over JSON fixtures shaped like the backend payload.
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::json;

use taskboard::analytics::metrics::{self, GroupField, UsageBucket};
use taskboard::analytics::{subsets, timeseries};
use taskboard::filter::{self, RangeToken};
use taskboard::model::time::display_timestamp;
use taskboard::model::{DashboardPayload, TaskRecord};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
}

fn iso(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S+00:00").to_string()
}

fn payload(value: serde_json::Value) -> DashboardPayload {
    serde_json::from_value(value).unwrap()
}

fn refs(tasks: &[TaskRecord]) -> Vec<&TaskRecord> {
    tasks.iter().collect()
}

// ---------------------------------------------------------------------------
// Range filter
// ---------------------------------------------------------------------------

fn aged_payload() -> DashboardPayload {
    let n = now();
    payload(json!({
        "task_logs": [
            {"job_id": "h1", "start_time": iso(n - Duration::hours(1))},
            {"job_id": "d3", "start_time": iso(n - Duration::days(3))},
            {"job_id": "d20", "start_time": iso(n - Duration::days(20))},
            {"job_id": "d90", "start_time": iso(n - Duration::days(90))},
            {"job_id": "bad", "start_time": "not a date"},
            {"job_id": "none"}
        ]
    }))
}

fn ids(tasks: &[&TaskRecord]) -> Vec<String> {
    tasks.iter().map(|t| t.job_id.clone()).collect()
}

#[test]
fn ranges_are_nested() {
    let p = aged_payload();
    let day = filter::filter_tasks(&p.task_logs, RangeToken::Last24Hours, now());
    let week = filter::filter_tasks(&p.task_logs, RangeToken::Last7Days, now());
    let month = filter::filter_tasks(&p.task_logs, RangeToken::Last30Days, now());

    for id in ids(&day) {
        assert!(ids(&week).contains(&id), "{id} in 24h but not 7d");
    }
    for id in ids(&week) {
        assert!(ids(&month).contains(&id), "{id} in 7d but not 30d");
    }
    assert_eq!(ids(&day), vec!["h1", "bad", "none"]);
    assert_eq!(ids(&week), vec!["h1", "d3", "bad", "none"]);
    assert_eq!(ids(&month), vec!["h1", "d3", "d20", "bad", "none"]);
}

#[test]
fn all_returns_exact_input_sequence() {
    let p = aged_payload();
    let all = filter::filter_tasks(&p.task_logs, RangeToken::All, now());
    assert_eq!(all.len(), p.task_logs.len());
    for (kept, original) in all.iter().zip(&p.task_logs) {
        assert!(std::ptr::eq(*kept, original));
    }
}

#[test]
fn filtering_is_idempotent_for_every_range() {
    let p = aged_payload();
    for range in RangeToken::ALL_TOKENS {
        let once = filter::filter_tasks(&p.task_logs, range, now());
        let twice = filter::refilter(&once, range, now());
        assert_eq!(twice.len(), once.len(), "{range:?}");
        for (a, b) in twice.iter().zip(&once) {
            assert!(std::ptr::eq(*a, *b), "{range:?} reordered or replaced a task");
        }
        assert_eq!(ids(&filter::filter_tasks(&p.task_logs, range, now())), ids(&once));
    }
}

#[test]
fn unparseable_dates_pass_filter_but_render_empty() {
    let p = aged_payload();
    let day = filter::filter_tasks(&p.task_logs, RangeToken::Last24Hours, now());
    let bad = day.iter().find(|t| t.job_id == "bad").unwrap();
    assert_eq!(display_timestamp(bad.start_time.as_deref()), "");
}

#[test]
fn offset_artifact_timestamps_parse() {
    let p = payload(json!({
        "task_logs": [{"job_id": "z", "start_time": iso(now() - Duration::days(40)) + "Z"}]
    }));
    assert!(filter::filter_tasks(&p.task_logs, RangeToken::Last30Days, now()).is_empty());
}

// ---------------------------------------------------------------------------
// Summary metrics
// ---------------------------------------------------------------------------

#[test]
fn success_rate_and_average_duration() {
    let p = payload(json!({
        "task_logs": [
            {"job_id": "1", "status": "SUCCESS", "duration_seconds": 10},
            {"job_id": "2", "status": "FAILED", "duration_seconds": 0},
            {"job_id": "3", "status": "SUCCESS", "duration_seconds": 20},
            {"job_id": "4", "status": "success"}
        ]
    }));
    let s = metrics::summary_counts(&refs(&p.task_logs));

    assert_eq!(s.total, 4);
    assert_eq!(s.successful, 2);
    assert!((s.success_rate_pct - 50.0).abs() < 1e-9);
    assert!((s.avg_duration_seconds - 15.0).abs() < 1e-9);
    assert!(s.success_rate_pct >= 0.0 && s.success_rate_pct <= 100.0);
}

#[test]
fn empty_subset_yields_zeros() {
    let s = metrics::summary_counts(&[]);
    assert_eq!(s.total, 0);
    assert_eq!(s.success_rate_pct, 0.0);
    assert_eq!(s.avg_duration_seconds, 0.0);
    assert_eq!(s.distinct_email_count, 0);
}

#[test]
fn distinct_emails_require_at_sign() {
    let p = payload(json!({
        "task_logs": [
            {"job_id": "1", "user_email": "a@x.com"},
            {"job_id": "2", "user_email": "a@x.com"},
            {"job_id": "3", "user_email": "system"},
            {"job_id": "4", "user_email": "b@x.com"}
        ]
    }));
    assert_eq!(metrics::summary_counts(&refs(&p.task_logs)).distinct_email_count, 2);
}

// ---------------------------------------------------------------------------
// Groupings
// ---------------------------------------------------------------------------

#[test]
fn top_n_ties_keep_first_encountered_order() {
    let p = payload(json!({
        "task_logs": [
            {"job_id": "1", "user_email": "zed@x.com"},
            {"job_id": "2", "user_email": "amy@x.com"},
            {"job_id": "3", "user_email": "zed@x.com"},
            {"job_id": "4", "user_email": "amy@x.com"},
            {"job_id": "5", "user_email": "bob@x.com"}
        ]
    }));
    let users = metrics::group_by_field(&refs(&p.task_logs), GroupField::UserEmail);
    let top = metrics::top_n(&users, 2, true);
    assert_eq!(
        top,
        vec![("zed@x.com".to_string(), 2), ("amy@x.com".to_string(), 2)]
    );
}

#[test]
fn failed_users_count_failure_statuses_and_unknown() {
    let p = payload(json!({
        "task_logs": [
            {"job_id": "1", "user_email": "a@x.com", "status": "FAILED"},
            {"job_id": "2", "status": "FAILURE"},
            {"job_id": "3", "user_email": "a@x.com", "status": "FAILURE"},
            {"job_id": "4", "user_email": "b@x.com", "status": "SUCCESS"}
        ]
    }));
    let failed = metrics::failed_users(&refs(&p.task_logs));
    assert_eq!(failed.get("a@x.com"), Some(&2));
    assert_eq!(failed.get("Unknown"), Some(&1));
    assert_eq!(failed.get("b@x.com"), None);
}

#[test]
fn status_buckets_cover_every_task() {
    let p = payload(json!({
        "task_logs": [
            {"job_id": "1", "status": "SUCCESS"},
            {"job_id": "2", "status": "completed"},
            {"job_id": "3", "status": "REVOKED"},
            {"job_id": "4", "status": "RUNNING"},
            {"job_id": "5", "status": "weird"},
            {"job_id": "6"}
        ]
    }));
    let b = metrics::status_buckets(&refs(&p.task_logs));
    assert_eq!((b.success, b.cancelled, b.started, b.failed), (2, 1, 1, 2));
    assert_eq!(b.total(), 6);
}

// ---------------------------------------------------------------------------
// Usage buckets
// ---------------------------------------------------------------------------

fn fb_task(job_id: &str, usages: &[f64]) -> serde_json::Value {
    let summaries: Vec<_> = usages
        .iter()
        .map(|u| json!({"rate_limits": {"app_usage_pct": u}, "success_count": 1, "error_count": 0}))
        .collect();
    json!({
        "job_id": job_id,
        "task_type": "facebook_daily",
        "api_total_counts": {"summaries": summaries, "total_backoff_sec": 1.5, "batch_count": usages.len()}
    })
}

#[test]
fn usage_buckets_classify_fractions() {
    let p = payload(json!({"task_logs": [fb_task("a", &[0.96, 0.80, 0.50])]}));
    let b = metrics::classify_usage_buckets(&refs(&p.task_logs));
    assert_eq!((b.critical, b.warning, b.safe), (1, 1, 1));
    assert_eq!(b.total(), 3);
}

#[test]
fn usage_bucket_boundaries_belong_to_upper_bucket() {
    let p = payload(json!({"task_logs": [fb_task("a", &[0.75, 0.95])]}));
    let b = metrics::classify_usage_buckets(&refs(&p.task_logs));
    assert_eq!((b.critical, b.warning, b.safe), (1, 1, 0));
    assert_eq!(b.total(), 2);
    assert_eq!(UsageBucket::classify_pct(74.999), UsageBucket::Safe);
}

#[test]
fn facebook_batch_stats_sum_across_tasks() {
    let p = payload(json!({"task_logs": [fb_task("a", &[0.1, 0.2]), fb_task("b", &[0.3])]}));
    let fb = subsets::facebook_tasks(&refs(&p.task_logs));
    let stats = metrics::facebook_batch_stats(&fb);
    assert_eq!(stats.total_batches, 3);
    assert_eq!(stats.successful_batches, 3);
    assert!((stats.total_backoff_sec - 3.0).abs() < 1e-9);
}

// ---------------------------------------------------------------------------
// Subsets
// ---------------------------------------------------------------------------

#[test]
fn tiktok_membership_by_type_or_counts_domain() {
    let p = payload(json!({
        "task_logs": [
            {"job_id": "1", "task_type": "product"},
            {"job_id": "2", "task_type": "tiktok_creative"},
            {"job_id": "3", "task_type": "sync", "api_total_counts": {
                "https://business-api.tiktok.com/open_api/v1.3/bc/get/": 4
            }},
            {"job_id": "4", "task_type": "sync"},
            {"job_id": "5", "task_type": "product_feed"}
        ]
    }));
    let tk = subsets::tiktok_tasks(&refs(&p.task_logs));
    assert_eq!(ids(&tk), vec!["1", "2", "3"]);
}

#[test]
fn facebook_membership_by_type_substring() {
    let p = payload(json!({
        "task_logs": [
            {"job_id": "1", "task_type": "facebook_daily"},
            {"job_id": "2", "task_type": "fb_breakdown"},
            {"job_id": "3", "task_type": "product"}
        ]
    }));
    let fb = subsets::facebook_tasks(&refs(&p.task_logs));
    assert_eq!(ids(&fb), vec!["1", "2"]);
    let types = metrics::facebook_type_breakdown(&fb);
    assert_eq!((types.daily, types.breakdown, types.other), (1, 1, 0));
}

// ---------------------------------------------------------------------------
// Timeseries
// ---------------------------------------------------------------------------

#[test]
fn endpoint_totals_equal_sum_of_counts() {
    let p = payload(json!({
        "api_timeseries": {
            "https://business-api.tiktok.com/open_api/v1.3/product/get/": [
                {"timestamp": "2025-06-15T10:00:00+00:00", "count": 3},
                {"timestamp": "2025-06-15T11:00:00+00:00", "count": 5}
            ],
            "https://graph.facebook.com/v19.0/insights": [
                {"timestamp": "2025-06-15T10:00:00+00:00", "count": 9}
            ]
        }
    }));
    let tk = timeseries::select_endpoints(&p.api_timeseries, subsets::TIKTOK_DOMAIN);
    assert_eq!(tk.len(), 1);
    assert_eq!(timeseries::endpoint_totals(&tk), vec![("product/get".to_string(), 8)]);

    let chart = timeseries::project(&tk);
    assert_eq!(chart.labels.len(), 2);
    assert_eq!(chart.series[0].points, vec![3, 5]);
}

#[test]
fn malformed_timeseries_is_empty() {
    let p = payload(json!({"api_timeseries": "nope", "task_logs": null}));
    assert!(p.api_timeseries.is_empty());
    assert!(p.task_logs.is_empty());
    assert_eq!(timeseries::project(&p.api_timeseries).series.len(), 0);
}

//! taskboard: aggregation and filtering pipeline for a background-task
//! dashboard.
//!
//! A [`store::SnapshotStore`] holds the latest `{task_logs, api_timeseries}`
//! payload. [`filter`] narrows it to a relative time window, [`analytics`]
//! derives counts, buckets, chart series and per-task breakdowns, and
//! [`views`] bundles those into per-tab view models for the CLI and the
//! embedded web dashboard.

pub mod analytics;
pub mod cli;
pub mod config;
pub mod filter;
pub mod logging;
pub mod model;
pub mod poller;
pub mod source;
pub mod store;
pub mod views;
pub mod web;

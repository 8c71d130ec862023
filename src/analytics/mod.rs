//! Aggregation pipeline over task subsets.
//!
//! Everything in here is a pure function of its inputs:
//! - **metrics**: counts, rates, groupings, usage-bucket classification
//! - **subsets**: TikTok / Facebook membership predicates
//! - **timeseries**: endpoint→points reshaping for line charts
//! - **detail**: per-batch, per-account series for a single task

pub mod detail;
pub mod metrics;
pub mod subsets;
pub mod timeseries;

use indexmap::IndexMap;

/// Label → count, iterating in first-encountered order.
pub type CountMap = IndexMap<String, usize>;

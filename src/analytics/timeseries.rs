//! Reshape endpoint time series into chart-ready label/series arrays.
//!
//! Series are assumed aligned: the x-axis labels come from the first series
//! and no resampling is done.

use indexmap::IndexMap;
use serde::Serialize;

use crate::model::time::display_clock;
use crate::model::{ApiTimeseries, TimeseriesPoint};

/// Path segment after which endpoint URLs become readable names.
pub const ENDPOINT_PREFIX_MARKER: &str = "/v1.3/";

/// Chart input: x-axis labels plus one named series per endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub series: Vec<NamedSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedSeries {
    pub name: String,
    pub points: Vec<u64>,
}

/// Short endpoint name: the text after the version marker (up to the next
/// marker, if the URL repeats it), without one trailing slash. Falls back to
/// the full URL when the marker is absent or nothing follows it.
pub fn endpoint_display_name(url: &str) -> String {
    let tail = url
        .split(ENDPOINT_PREFIX_MARKER)
        .nth(1)
        .filter(|segment| !segment.is_empty())
        .unwrap_or(url);

    tail.strip_suffix('/').unwrap_or(tail).to_string()
}

/// Endpoints whose URL contains `needle`, keyed by display name. Names that
/// collide after shortening are not deduplicated: the later series replaces
/// the earlier one in place.
pub fn select_endpoints(series: &ApiTimeseries, needle: &str) -> ApiTimeseries {
    let mut selected = IndexMap::new();
    for (url, points) in series {
        if url.contains(needle) {
            selected.insert(endpoint_display_name(url), points.clone());
        }
    }
    selected
}

/// Build chart labels and series. Labels are the first series' timestamps
/// as `HH:MM`.
pub fn project(series: &ApiTimeseries) -> ChartSeries {
    let Some((_, first)) = series.first() else {
        return ChartSeries::default();
    };

    let labels = first
        .iter()
        .map(|p| display_clock(p.timestamp.as_deref()))
        .collect();

    let series = series
        .iter()
        .map(|(name, points)| NamedSeries {
            name: name.clone(),
            points: points.iter().map(|p| p.count).collect(),
        })
        .collect();

    ChartSeries { labels, series }
}

pub fn endpoint_total(points: &[TimeseriesPoint]) -> u64 {
    points.iter().map(|p| p.count).sum()
}

/// Per-endpoint totals, highest first; ties keep map order.
pub fn endpoint_totals(series: &ApiTimeseries) -> Vec<(String, u64)> {
    let mut totals: Vec<(String, u64)> = series
        .iter()
        .map(|(name, points)| (name.clone(), endpoint_total(points)))
        .collect();
    totals.sort_by(|a, b| b.1.cmp(&a.1));
    totals
}

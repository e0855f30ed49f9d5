//! Per-series duty statistics.

use rosterbook_shared::Result;
use rosterbook_storage::{SeriesAverages, StatsFilter, Storage};

/// Fetch the per-series averages report, sorted by series.
pub async fn series_report(storage: &Storage, filter: &StatsFilter) -> Result<Vec<SeriesAverages>> {
    storage.series_averages(filter).await
}

/// Render a minute count as `HH:MM` for display. Fractional minutes from
/// averaging are rounded to the nearest minute.
pub fn format_minutes(minutes: f64) -> String {
    let total = minutes.round().max(0.0) as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

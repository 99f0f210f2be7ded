use std::collections::BTreeSet;

use indexmap::IndexMap;
use log::warn;
use serde::Serialize;

use crate::models::{BuildRecord, Dated};

pub const SECONDS_PER_HOUR: f64 = 3600.0;
pub const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Label for the synthetic entry folding everything past the top-n cut.
pub const OTHERS_LABEL: &str = "Others";

/// What to do when a record has no value for the plotted field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GapPolicy {
    /// Emit a null placeholder so the plotted line shows a gap at that
    /// timestamp.
    Preserve,
    /// Omit the point entirely. Non-positive values are dropped too, since
    /// a zero duration or size means the scraper failed to capture data.
    Drop,
}

/// One chart point: epoch milliseconds and the scaled value, or None for a
/// gap under `GapPolicy::Preserve`.
pub type SeriesPoint = (i64, Option<f64>);

/// Package-duration breakdown for a single run, ready for a donut chart.
#[derive(Debug, PartialEq, Serialize)]
pub struct Breakdown {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

/// Keep only the runs where every required job is present.
///
/// Cross-variant comparisons (e.g. cuda vs no-cuda) are only meaningful
/// when both sides ran; a run missing one is dropped rather than plotted
/// as zero.
pub fn select_validated<'a>(
    records: &'a [BuildRecord],
    required_jobs: &[&str],
) -> Vec<&'a BuildRecord> {
    records
        .iter()
        .filter(|record| required_jobs.iter().all(|job| record.jobs.contains_key(*job)))
        .collect()
}

/// Map records to (timestamp, value / unit_scale) chart points.
///
/// Records with an unparseable date are skipped; the rest of the series is
/// still produced. `unit_scale` must be positive, that is on the caller.
pub fn to_time_series<'a, R, I, F>(
    records: I,
    selector: F,
    unit_scale: f64,
    gap_policy: GapPolicy,
) -> Vec<SeriesPoint>
where
    R: Dated + 'a,
    I: IntoIterator<Item = &'a R>,
    F: Fn(&R) -> Option<f64>,
{
    let mut points = Vec::new();

    for record in records {
        let Some(timestamp) = record_timestamp(record) else {
            continue;
        };

        match gap_policy {
            GapPolicy::Drop => {
                if let Some(value) = selector(record) {
                    if value > 0.0 {
                        points.push((timestamp, Some(value / unit_scale)));
                    }
                }
            }
            GapPolicy::Preserve => {
                points.push((timestamp, selector(record).map(|value| value / unit_scale)));
            }
        }
    }

    points
}

/// The `n` largest entries sorted descending, plus an "Others" entry
/// summing the remainder.
///
/// "Others" is always emitted, even when nothing overflows, so the chart
/// layout stays stable. Ties keep insertion order (stable sort).
pub fn top_n_with_overflow(durations: &IndexMap<String, f64>, n: usize) -> Breakdown {
    let mut entries: Vec<(&str, f64)> = durations
        .iter()
        .map(|(label, value)| (label.as_str(), *value))
        .collect();
    entries.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut labels = Vec::with_capacity(n.min(entries.len()) + 1);
    let mut values = Vec::with_capacity(n.min(entries.len()) + 1);

    for (label, value) in entries.iter().take(n) {
        labels.push((*label).to_string());
        values.push(*value);
    }

    let overflow: f64 = entries.iter().skip(n).map(|(_, value)| value).sum();
    labels.push(OTHERS_LABEL.to_string());
    values.push(overflow);

    Breakdown { labels, values }
}

/// Per-package duration trend in seconds, one point per run.
///
/// Gap-preserving by contract: a run without detail for the package emits
/// null rather than being omitted, so missing data stays visually distinct
/// from a zero duration.
pub fn series_for_package(records: &[BuildRecord], package: &str) -> Vec<SeriesPoint> {
    to_time_series(
        records.iter(),
        |record| record.package_seconds(package),
        1.0,
        GapPolicy::Preserve,
    )
}

/// Every package name appearing in any run's build details, for the
/// package-selection control.
pub fn collect_label_universe(records: &[BuildRecord]) -> BTreeSet<String> {
    let mut labels = BTreeSet::new();

    for record in records {
        if let Some(details) = &record.details {
            labels.extend(details.keys().cloned());
        }
    }

    labels
}

fn record_timestamp<R: Dated>(record: &R) -> Option<i64> {
    match record.timestamp() {
        Some(timestamp) => Some(timestamp.timestamp_millis()),
        None => {
            warn!("Skipping record with unparseable date '{}'", record.raw_date());
            None
        }
    }
}

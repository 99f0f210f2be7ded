use indexmap::IndexMap;
use log::{debug, info, warn};
use serde::Serialize;

use crate::error::{CidashError, Result};
use crate::models::{BuildRecord, ImageRecord, MetricsDocument};
use crate::transform::{
    select_validated, series_for_package, to_time_series, top_n_with_overflow, Breakdown,
    GapPolicy, SeriesPoint, BYTES_PER_GIB, SECONDS_PER_HOUR,
};

/// One named line on a chart, serialized as the renderer expects:
/// `{"name": ..., "data": [[epoch_ms, value-or-null], ...]}`.
#[derive(Debug, Serialize)]
pub struct Series {
    pub name: String,
    pub data: Vec<SeriesPoint>,
}

/// Dataset for one chart: either a set of time series or a labeled
/// breakdown for a donut chart.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ChartData {
    Series { series: Vec<Series> },
    Breakdown(Breakdown),
}

/// Declarative descriptor for a job-duration line chart.
///
/// Runs are validated against the full job set first, so variants are only
/// compared on runs where every variant actually ran. With an empty `jobs`
/// list the chart plots each run's total duration instead, which the
/// scraper already exports in hours.
pub struct JobDurationChart {
    pub id: &'static str,
    pub workflows: &'static [&'static str],
    pub jobs: &'static [&'static str],
}

/// Which byte count of an image record to plot.
#[derive(Clone, Copy, Debug)]
pub enum SizeMetric {
    Uncompressed,
    Compressed,
}

/// Declarative descriptor for an image-size line chart. An empty `images`
/// list plots every variant in the document, in document order.
pub struct ImageSizeChart {
    pub id: &'static str,
    pub images: &'static [&'static str],
    pub metric: SizeMetric,
}

/// The dashboard's standing charts.
pub const DEFAULT_JOB_CHARTS: &[JobDurationChart] = &[
    JobDurationChart {
        id: "health-check-time",
        workflows: &["health-check", "health-check-self-hosted"],
        jobs: &["no-cuda", "cuda"],
    },
    JobDurationChart {
        id: "docker-build-and-push-time",
        workflows: &["docker-build-and-push"],
        jobs: &["no-cuda", "cuda"],
    },
    JobDurationChart {
        id: "build-main-time",
        workflows: &["build-main", "build-main-self-hosted"],
        jobs: &[],
    },
];

pub const DEFAULT_IMAGE_CHARTS: &[ImageSizeChart] = &[
    ImageSizeChart {
        id: "docker-image-size",
        images: &[],
        metric: SizeMetric::Uncompressed,
    },
    ImageSizeChart {
        id: "docker-image-size-compressed",
        images: &[],
        metric: SizeMetric::Compressed,
    },
];

impl JobDurationChart {
    /// A workflow absent from the document yields no series rather than an
    /// error, so one missing section never takes down the whole dashboard.
    pub fn derive(&self, document: &MetricsDocument) -> ChartData {
        let mut series = Vec::new();

        for &workflow in self.workflows {
            let Some(records) = document.workflow_time.get(workflow) else {
                warn!("Workflow '{workflow}' not present in metrics document");
                continue;
            };

            if self.jobs.is_empty() {
                series.push(Series {
                    name: workflow.to_string(),
                    data: to_time_series(
                        records.iter(),
                        |record: &BuildRecord| record.duration,
                        1.0,
                        GapPolicy::Drop,
                    ),
                });
                continue;
            }

            let validated = select_validated(records, self.jobs);
            for &job in self.jobs {
                series.push(Series {
                    name: format!("{workflow} ({job})"),
                    data: to_time_series(
                        validated.iter().copied(),
                        |record: &BuildRecord| record.job_seconds(job),
                        SECONDS_PER_HOUR,
                        GapPolicy::Drop,
                    ),
                });
            }
        }

        ChartData::Series { series }
    }
}

impl ImageSizeChart {
    pub fn derive(&self, document: &MetricsDocument) -> ChartData {
        let variants: Vec<&str> = if self.images.is_empty() {
            document.docker_images.keys().map(String::as_str).collect()
        } else {
            self.images.to_vec()
        };

        let metric = self.metric;
        let mut series = Vec::new();
        for variant in variants {
            let Some(records) = document.docker_images.get(variant) else {
                warn!("Image variant '{variant}' not present in metrics document");
                continue;
            };

            let fresh = dedup_by_digest(records);
            series.push(Series {
                name: variant.to_string(),
                data: to_time_series(
                    fresh.iter().copied(),
                    // A zero size means the scraper failed to fetch the
                    // manifest, so Drop erases those points.
                    |record| {
                        let bytes = match metric {
                            SizeMetric::Uncompressed => record.size_bytes(),
                            SizeMetric::Compressed => record.size_compressed,
                        };
                        #[allow(clippy::cast_precision_loss)]
                        let bytes = bytes.map(|bytes| bytes as f64);
                        bytes
                    },
                    BYTES_PER_GIB,
                    GapPolicy::Drop,
                ),
            });
        }

        ChartData::Series { series }
    }
}

/// The same digest seen back-to-back means the image was re-published
/// unchanged; only the first occurrence is plotted.
fn dedup_by_digest(records: &[ImageRecord]) -> Vec<&ImageRecord> {
    let mut fresh: Vec<&ImageRecord> = Vec::with_capacity(records.len());

    for record in records {
        if let (Some(digest), Some(previous)) = (&record.digest, fresh.last()) {
            if previous.digest.as_deref() == Some(digest) {
                debug!("Skipping re-published image {:?} ({digest})", record.tag);
                continue;
            }
        }
        fresh.push(record);
    }

    fresh
}

/// Derive every standing chart, keyed by chart id.
pub fn derive_dashboard(document: &MetricsDocument) -> IndexMap<String, ChartData> {
    let mut dashboard = IndexMap::new();

    for chart in DEFAULT_JOB_CHARTS {
        dashboard.insert(chart.id.to_string(), chart.derive(document));
    }
    for chart in DEFAULT_IMAGE_CHARTS {
        dashboard.insert(chart.id.to_string(), chart.derive(document));
    }

    dashboard
}

/// Package breakdown for one run. A run without captured details yields
/// the empty breakdown (just "Others" at 0) rather than an error.
pub fn package_breakdown(
    records: &[BuildRecord],
    build_index: usize,
    top: usize,
) -> Result<ChartData> {
    let record = records.get(build_index).ok_or_else(|| {
        CidashError::Config(format!(
            "Build index {build_index} out of range ({} runs)",
            records.len()
        ))
    })?;
    info!(
        "Deriving package breakdown for run {:?} on {}",
        record.run_id, record.date
    );

    let empty = IndexMap::new();
    let details = record.details.as_ref().unwrap_or_else(|| {
        warn!("Run at index {build_index} has no per-package details");
        &empty
    });

    Ok(ChartData::Breakdown(top_n_with_overflow(details, top)))
}

/// Gap-preserving per-package trend, one point per run.
pub fn package_trend(records: &[BuildRecord], package: &str) -> ChartData {
    ChartData::Series {
        series: vec![Series {
            name: package.to_string(),
            data: series_for_package(records, package),
        }],
    }
}

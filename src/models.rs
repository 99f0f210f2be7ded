use chrono::{DateTime, NaiveDateTime, Utc};
use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::{CidashError, Result};

/// Date format written by the metrics scraper, e.g. "2024/01/15 03:42:10".
const SCRAPER_DATE_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// The pre-generated metrics document, fetched once and read-only afterwards.
#[derive(Debug, Deserialize)]
pub struct MetricsDocument {
    /// Workflow name -> runs ordered by ascending date.
    pub workflow_time: IndexMap<String, Vec<BuildRecord>>,
    /// Image-variant name -> published images ordered by ascending date.
    pub docker_images: IndexMap<String, Vec<ImageRecord>>,
}

/// A single workflow run.
///
/// `jobs` and `details` are sparse: a key is present only when that job ran
/// (or that package was built) for this particular run. A missing key means
/// "no data", never zero.
#[derive(Debug, Default, Deserialize)]
pub struct BuildRecord {
    pub date: String,
    pub run_id: Option<u64>,
    /// Total run duration in hours, as exported by the scraper.
    pub duration: Option<f64>,
    /// Job name -> duration in seconds.
    #[serde(default)]
    pub jobs: IndexMap<String, f64>,
    /// Package name -> build duration in seconds. None when per-package
    /// detail was not captured for this run.
    pub details: Option<IndexMap<String, f64>>,
}

/// A single published container image.
#[derive(Debug, Default, Deserialize)]
pub struct ImageRecord {
    pub date: String,
    pub tag: Option<String>,
    /// Uncompressed byte count.
    pub size: Option<u64>,
    pub size_compressed: Option<u64>,
    pub size_uncompressed: Option<u64>,
    /// Content digest, prefixed "sha256:" when present.
    pub digest: Option<String>,
}

/// Anything carrying the scraper's raw date string.
pub trait Dated {
    fn raw_date(&self) -> &str;

    /// None when the date fails to parse; callers skip such records and
    /// keep processing the rest of the series.
    fn timestamp(&self) -> Option<DateTime<Utc>> {
        parse_date(self.raw_date())
    }
}

impl Dated for BuildRecord {
    fn raw_date(&self) -> &str {
        &self.date
    }
}

impl Dated for ImageRecord {
    fn raw_date(&self) -> &str {
        &self.date
    }
}

impl MetricsDocument {
    /// Parse the document, failing fast when a required top-level key is
    /// absent rather than rendering silently empty charts.
    pub fn from_json(text: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(text)?;

        for key in ["workflow_time", "docker_images"] {
            if value.get(key).is_none() {
                return Err(CidashError::MissingData(key));
            }
        }

        Ok(serde_json::from_value(value)?)
    }

    pub fn workflow(&self, name: &str) -> Result<&[BuildRecord]> {
        self.workflow_time
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| CidashError::Config(format!("Unknown workflow '{name}'")))
    }
}

impl BuildRecord {
    pub fn job_seconds(&self, job: &str) -> Option<f64> {
        self.jobs.get(job).copied()
    }

    pub fn package_seconds(&self, package: &str) -> Option<f64> {
        self.details.as_ref()?.get(package).copied()
    }
}

impl ImageRecord {
    /// Effective uncompressed size; newer scraper output carries
    /// `size_uncompressed` instead of `size`.
    pub fn size_bytes(&self) -> Option<u64> {
        self.size.or(self.size_uncompressed)
    }
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(raw, SCRAPER_DATE_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

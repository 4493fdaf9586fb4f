//! Request descriptors: the shape of a single retrieval ask against a source.

use crate::{BoundingBox, TimeRange};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Spatial selection for a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Geometry {
    /// A single lat/lon (or projected x/y) point.
    Point { x: f64, y: f64 },
    /// A rectangular region.
    Bbox(BoundingBox),
    /// A fixed, named list of points (e.g. gauge locations), evaluated
    /// independently so a failure at one location never aborts the rest.
    LocationList(Vec<(String, f64, f64)>),
}

/// Temporal selection for a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TimeSelector {
    /// The most recently available time for the source.
    Latest,
    /// A single instant.
    Instant(DateTime<Utc>),
    /// An inclusive range, fetched as a time series.
    Range(TimeRange),
}

/// Options that tune how a request is executed without changing what data
/// it asks for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestOptions {
    /// Force bypassing the local chunk cache for this request.
    pub skip_cache: bool,
    /// Maximum number of concurrent chunk/point fetches for fan-out requests.
    pub max_concurrency: usize,
    /// Per-request deadline, in addition to per-HTTP-call timeouts.
    pub deadline_secs: Option<u64>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            skip_cache: false,
            max_concurrency: 8,
            deadline_secs: None,
        }
    }
}

/// A fully specified retrieval request: which source, which variable(s),
/// where, and when.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestDescriptor {
    pub source_id: String,
    pub dataset_id: String,
    pub variable_ids: Vec<String>,
    pub geometry: Geometry,
    pub time: TimeSelector,
    #[serde(default)]
    pub options: RequestOptions,
}

impl RequestDescriptor {
    pub fn point(
        source_id: impl Into<String>,
        dataset_id: impl Into<String>,
        variable_id: impl Into<String>,
        x: f64,
        y: f64,
        time: TimeSelector,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            dataset_id: dataset_id.into(),
            variable_ids: vec![variable_id.into()],
            geometry: Geometry::Point { x, y },
            time,
            options: RequestOptions::default(),
        }
    }

    /// True if this request fans out over more than one independent unit
    /// of work (multiple points, or a time range rather than an instant).
    pub fn is_fan_out(&self) -> bool {
        matches!(self.geometry, Geometry::LocationList(_)) || matches!(self.time, TimeSelector::Range(_))
    }
}

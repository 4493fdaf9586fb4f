//! Grid coordinate arithmetic, scaling, and aggregation.
//!
//! Pure computation, no I/O: this crate turns raw decoded grid values into
//! the point/spatial-mean/time-series results the client returns, the same
//! way `crates/wms-common/src/grid.rs` and `crates/grid-processor/src/
//! downsample.rs` compute grid math and NaN-aware block aggregation.

use chrono::{DateTime, Utc};
use hydro_common::{BoundingBox, HydroError};
use projection::GridProjection;

/// Find the nearest grid index to a geographic point under a given
/// projection, or `None` if the point falls outside the grid's dimensions.
pub fn nearest_index(projection: &dyn GridProjection, lat_deg: f64, lon_deg: f64) -> Option<(usize, usize)> {
    let (i, j) = projection.geo_to_grid(lat_deg, lon_deg);
    if i < 0.0 || j < 0.0 {
        return None;
    }
    let (nx, ny) = projection.dimensions();
    let i = i.round() as usize;
    let j = j.round() as usize;
    if i >= nx || j >= ny {
        return None;
    }
    Some((i, j))
}

/// Apply `cooked = raw * scale_factor + add_offset`, collapsing to `NaN`
/// when `raw` matches `fill_value` (within floating-point epsilon).
pub fn apply_scaling(raw: f64, scale_factor: f64, add_offset: f64, fill_value: Option<f64>) -> f64 {
    if let Some(fill) = fill_value {
        if (raw - fill).abs() < f64::EPSILON {
            return f64::NAN;
        }
    }
    raw * scale_factor + add_offset
}

/// Validate that a lat/lon pair is within the physically valid domain.
pub fn validate_coords(lat_deg: f64, lon_deg: f64) -> Result<(), HydroError> {
    if !(-90.0..=90.0).contains(&lat_deg) {
        return Err(HydroError::InvalidBbox {
            reason: format!("latitude {lat_deg} is outside [-90, 90]"),
        });
    }
    if !(-180.0..=360.0).contains(&lon_deg) {
        return Err(HydroError::InvalidBbox {
            reason: format!("longitude {lon_deg} is outside [-180, 360]"),
        });
    }
    Ok(())
}

/// Validate that a bounding box is well-formed (min below max on both axes).
pub fn validate_bbox(bbox: &BoundingBox) -> Result<(), HydroError> {
    if bbox.min_x > bbox.max_x {
        return Err(HydroError::InvalidBbox {
            reason: format!("min_x {} exceeds max_x {}", bbox.min_x, bbox.max_x),
        });
    }
    if bbox.min_y > bbox.max_y {
        return Err(HydroError::InvalidBbox {
            reason: format!("min_y {} exceeds max_y {}", bbox.min_y, bbox.max_y),
        });
    }
    Ok(())
}

/// Aggregation method for collapsing multiple values into one, per spec
/// §4.7: absent (`NaN`) values are excluded; if every value is absent the
/// aggregate itself is absent (`None`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationMethod {
    Mean,
    Sum,
    Min,
    Max,
    Median,
}

/// Spatial aggregation over a set of grid-cell values.
pub fn aggregate_spatial(values: &[f64], method: AggregationMethod) -> Option<f64> {
    aggregate(values, method)
}

/// Temporal aggregation over a set of per-timestep values. Same contract as
/// [`aggregate_spatial`]; kept as a distinct name to match the two call
/// sites the spec describes.
pub fn aggregate_temporal(values: &[f64], method: AggregationMethod) -> Option<f64> {
    aggregate(values, method)
}

fn aggregate(values: &[f64], method: AggregationMethod) -> Option<f64> {
    let mut present: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if present.is_empty() {
        return None;
    }
    Some(match method {
        AggregationMethod::Mean => present.iter().sum::<f64>() / present.len() as f64,
        AggregationMethod::Sum => present.iter().sum(),
        AggregationMethod::Min => present.iter().cloned().fold(f64::INFINITY, f64::min),
        AggregationMethod::Max => present.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
        AggregationMethod::Median => {
            present.sort_by(|a, b| a.partial_cmp(b).unwrap());
            let mid = present.len() / 2;
            if present.len() % 2 == 0 {
                (present[mid - 1] + present[mid]) / 2.0
            } else {
                present[mid]
            }
        }
    })
}

/// One point in a generated time series: the timestamp and either its
/// value or the error that prevented retrieval.
#[derive(Debug, Clone)]
pub struct TimeSeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub value: Result<f64, String>,
}

/// Build an ordered time series by invoking `fetch_one` for each timestamp.
/// Per-step failures are captured alongside the timestamp rather than
/// aborting the whole series.
pub fn time_series<F>(timestamps: &[DateTime<Utc>], mut fetch_one: F) -> Vec<TimeSeriesPoint>
where
    F: FnMut(&DateTime<Utc>) -> Result<f64, HydroError>,
{
    timestamps
        .iter()
        .map(|ts| TimeSeriesPoint {
            timestamp: *ts,
            value: fetch_one(ts).map_err(|e| e.to_string()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use projection::GeographicGrid;

    fn test_grid() -> GeographicGrid {
        GeographicGrid {
            first_lat: 90.0,
            first_lon: 0.0,
            dlat: -0.25,
            dlon: 0.25,
            nx: 1440,
            ny: 721,
        }
    }

    #[test]
    fn nearest_index_finds_origin() {
        let grid = test_grid();
        assert_eq!(nearest_index(&grid, 90.0, 0.0), Some((0, 0)));
    }

    #[test]
    fn nearest_index_out_of_bounds_is_none() {
        let grid = test_grid();
        assert_eq!(nearest_index(&grid, -95.0, 0.0), None);
    }

    #[test]
    fn apply_scaling_maps_fill_to_nan() {
        assert!(apply_scaling(9999.0, 0.1, 0.0, Some(9999.0)).is_nan());
        assert!((apply_scaling(10.0, 0.1, 273.0, Some(9999.0)) - 274.0).abs() < 1e-9);
    }

    #[test]
    fn validate_coords_rejects_out_of_range_latitude() {
        assert!(validate_coords(95.0, 0.0).is_err());
        assert!(validate_coords(45.0, 200.0).is_ok());
    }

    #[test]
    fn validate_bbox_rejects_inverted_box() {
        let bbox = BoundingBox::new(10.0, 0.0, 0.0, 10.0);
        assert!(validate_bbox(&bbox).is_err());
    }

    #[test]
    fn aggregate_spatial_excludes_nan_and_handles_all_absent() {
        let values = [1.0, f64::NAN, 3.0];
        assert_eq!(aggregate_spatial(&values, AggregationMethod::Mean), Some(2.0));
        assert_eq!(aggregate_spatial(&values, AggregationMethod::Sum), Some(4.0));
        assert_eq!(aggregate_spatial(&[f64::NAN, f64::NAN], AggregationMethod::Mean), None);
    }

    #[test]
    fn aggregate_spatial_median_of_odd_and_even_counts() {
        assert_eq!(aggregate_spatial(&[1.0, 2.0, 3.0], AggregationMethod::Median), Some(2.0));
        assert_eq!(aggregate_spatial(&[1.0, 2.0, 3.0, 4.0], AggregationMethod::Median), Some(2.5));
    }

    #[test]
    fn time_series_captures_per_step_failures() {
        let timestamps = vec![Utc::now(), Utc::now()];
        let mut call = 0;
        let series = time_series(&timestamps, |_| {
            call += 1;
            if call == 1 {
                Ok(42.0)
            } else {
                Err(HydroError::Cancelled)
            }
        });
        assert_eq!(series.len(), 2);
        assert!(series[0].value.is_ok());
        assert!(series[1].value.is_err());
    }
}

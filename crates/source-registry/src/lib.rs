//! Per-source adapter layer.
//!
//! Each data source differs in URL synthesis, wrapper compression, and how
//! a variable maps onto the underlying format (a GRIB2 discipline/category/
//! parameter triple, a NetCDF variable name, a Zarr array path) — but the
//! point/grid/time-series/multi-point algorithms built on top are the
//! same. [`SourceAdapter`] is a sealed, tagged-variant capability interface
//! (per the generic-base-plus-hooks shape `services/wms-api/src/
//! model_config.rs` and `layer_config.rs` use for per-model YAML-driven
//! behaviour) rather than a class-inheritance chain.

pub mod adapters;
pub mod table;

use chrono::{DateTime, Utc};
use hydro_common::{HydroError, ValidTime, VariableDescriptor};

/// How a source's raw fetched bytes are wrapped before the format decoder
/// sees them. Zarr chunks carry their own compressor in `.zarray` and so
/// are always [`DecompressPolicy::None`] at this layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecompressPolicy {
    None,
    Gzip,
}

/// How a variable maps onto the source's underlying wire format.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageSelector {
    /// A GRIB2 message identified by its Product Definition Section triple.
    Grib2 {
        discipline: u8,
        category: u8,
        parameter: u8,
    },
    /// A NetCDF variable name.
    NetCdfVariable(String),
    /// A Zarr array path relative to the store root.
    ZarrVariable(String),
}

/// The context a URL (or Zarr chunk path) is synthesized from. A sealed
/// set of variants rather than one do-everything parameter struct: each
/// adapter only implements the variant(s) its format actually uses.
#[derive(Debug, Clone, PartialEq)]
pub enum UrlContext {
    /// A single GRIB2 file addressed by model run/forecast-hour time and a
    /// named product bundle (MRMS, HRRR).
    Grib2Timed { valid_time: ValidTime, product: String },
    /// A single Zarr chunk addressed by its chunk-grid coordinates (AORC).
    ZarrChunk {
        variable_id: String,
        t_chunk: usize,
        lat_chunk: usize,
        lon_chunk: usize,
    },
}

/// Per-source strategy object. The generic point/grid/timeseries/
/// multi-point algorithms in [`crate::fanout`] drive a request by calling
/// only these hooks; nothing else about a source needs to be known
/// upstream.
pub trait SourceAdapter {
    /// The source id this adapter serves, e.g. `"mrms"`.
    fn source_id(&self) -> &str;

    /// Synthesize the URL (or chunk path) for one fetch.
    fn url_for(&self, ctx: &UrlContext) -> Result<String, HydroError>;

    /// Resolve the product bundle to request, honoring a caller override
    /// if given and otherwise falling back to the source's default.
    fn resolve_product(&self, requested: Option<&str>) -> String;

    /// The wrapper compression fetched bytes need before reaching the
    /// format decoder.
    fn decompress_policy(&self) -> DecompressPolicy;

    /// Map a variable id to its location within the source's wire format.
    fn message_selector(&self, variable_id: &str) -> Result<MessageSelector, HydroError>;

    /// Apply the variable's fill-value convention to a raw decoded
    /// sample. Sources with file-embedded scale/offset (NetCDF, Zarr)
    /// apply those during decode; this only handles the fill-value
    /// absent-value convention that's uniform across all formats.
    fn finalize(&self, raw: f64, variable: &VariableDescriptor) -> f64 {
        grid_engine::apply_scaling(raw, 1.0, 0.0, variable.fill_value)
    }

    /// The index along a Zarr array's leading (time) axis that `instant`
    /// falls into, within the store rooted at `store_root_year`. Formats
    /// with no time axis of their own (GRIB2, NetCDF) never call this;
    /// the default is only exercised by a hypothetical Zarr adapter that
    /// doesn't override it, and resolves to the axis origin.
    fn zarr_time_index(&self, _store_root_year: i32, _instant: DateTime<Utc>) -> usize {
        0
    }
}

/// Generic fan-out algorithms shared by every adapter: the "generic base"
/// the per-source hooks above plug into.
pub mod fanout {
    use hydro_common::HydroError;

    /// One location's outcome in a [`multi_point`] fan-out.
    #[derive(Debug, Clone)]
    pub struct LocationResult {
        pub name: String,
        pub value: Result<f64, String>,
    }

    /// Evaluate `fetch_one` independently at each named location. A
    /// failure at one location is captured alongside its name rather than
    /// aborting the rest, matching the time-series fan-out contract in
    /// `grid_engine::time_series`.
    pub fn multi_point<F>(locations: &[(String, f64, f64)], mut fetch_one: F) -> Vec<LocationResult>
    where
        F: FnMut(&str, f64, f64) -> Result<f64, HydroError>,
    {
        locations
            .iter()
            .map(|(name, x, y)| LocationResult {
                name: name.clone(),
                value: fetch_one(name, *x, *y).map_err(|e| e.to_string()),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hydro_common::HydroError;

    #[test]
    fn finalize_default_maps_fill_value_to_nan() {
        struct Stub;
        impl SourceAdapter for Stub {
            fn source_id(&self) -> &str {
                "stub"
            }
            fn url_for(&self, _ctx: &UrlContext) -> Result<String, HydroError> {
                Ok(String::new())
            }
            fn resolve_product(&self, _requested: Option<&str>) -> String {
                String::new()
            }
            fn decompress_policy(&self) -> DecompressPolicy {
                DecompressPolicy::None
            }
            fn message_selector(&self, _variable_id: &str) -> Result<MessageSelector, HydroError> {
                Ok(MessageSelector::NetCdfVariable("x".into()))
            }
        }

        let variable = VariableDescriptor {
            id: "x".into(),
            display_name: "X".into(),
            units: "unit".into(),
            fill_value: Some(-999.0),
        };
        assert!(Stub.finalize(-999.0, &variable).is_nan());
        assert_eq!(Stub.finalize(5.0, &variable), 5.0);
    }

    #[test]
    fn multi_point_captures_per_location_failures() {
        use fanout::multi_point;
        let locations = vec![("a".to_string(), 1.0, 2.0), ("b".to_string(), 3.0, 4.0)];
        let results = multi_point(&locations, |name, _x, _y| {
            if name == "a" {
                Ok(10.0)
            } else {
                Err(HydroError::Cancelled)
            }
        });
        assert_eq!(results.len(), 2);
        assert!(results[0].value.is_ok());
        assert!(results[1].value.is_err());
    }
}

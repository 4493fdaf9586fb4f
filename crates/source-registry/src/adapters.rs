//! Built-in adapters for the sources named in the end-to-end scenarios:
//! MRMS (real-time GRIB2 radar), HRRR (GRIB2, Lambert Conformal grid), and
//! AORC (Zarr, resolution-axis chunk arithmetic).

use chrono::{DateTime, Datelike, TimeZone, Utc};

use crate::{DecompressPolicy, MessageSelector, SourceAdapter, UrlContext};
use hydro_common::HydroError;

/// AORC publishes hourly fields, one Zarr store per calendar year.
const AORC_TEMPORAL_RESOLUTION_SECS: i64 = 3600;

fn unsupported_context(source_id: &str) -> HydroError {
    HydroError::FormatParseError {
        source_id: source_id.to_string(),
        message: "UrlContext variant is not supported by this adapter".into(),
    }
}

fn unknown_variable(source_id: &str, variable_id: &str) -> HydroError {
    HydroError::UnknownVariable {
        source_id: source_id.to_string(),
        variable_id: variable_id.to_string(),
    }
}

/// Multi-Radar Multi-Sensor: real-time GRIB2 radar mosaics, gzip-wrapped,
/// one file per product per 2-minute timestamp.
pub struct MrmsAdapter {
    pub base_url: String,
}

impl SourceAdapter for MrmsAdapter {
    fn source_id(&self) -> &str {
        "mrms"
    }

    fn url_for(&self, ctx: &UrlContext) -> Result<String, HydroError> {
        match ctx {
            UrlContext::Grib2Timed { valid_time, product } => {
                let dt = valid_time.valid_datetime();
                Ok(format!(
                    "{}/{product}/MRMS_{product}_{}-{}.grib2.gz",
                    self.base_url,
                    dt.format("%Y%m%d"),
                    dt.format("%H%M%S"),
                ))
            }
            UrlContext::ZarrChunk { .. } => Err(unsupported_context(self.source_id())),
        }
    }

    fn resolve_product(&self, requested: Option<&str>) -> String {
        requested.unwrap_or("MergedReflectivityQC_00.50").to_string()
    }

    fn decompress_policy(&self) -> DecompressPolicy {
        DecompressPolicy::Gzip
    }

    fn message_selector(&self, variable_id: &str) -> Result<MessageSelector, HydroError> {
        match variable_id {
            "REF" => Ok(MessageSelector::Grib2 {
                discipline: 0,
                category: 15,
                parameter: 0,
            }),
            other => Err(unknown_variable(self.source_id(), other)),
        }
    }
}

/// High-Resolution Rapid Refresh: hourly GRIB2 forecast output on a
/// Lambert Conformal grid, no wrapper compression.
pub struct HrrrAdapter {
    pub base_url: String,
}

impl SourceAdapter for HrrrAdapter {
    fn source_id(&self) -> &str {
        "hrrr"
    }

    fn url_for(&self, ctx: &UrlContext) -> Result<String, HydroError> {
        match ctx {
            UrlContext::Grib2Timed { valid_time, product } => {
                let run = valid_time.reference_time;
                Ok(format!(
                    "{}/hrrr.{}/conus/hrrr.t{}z.wrf{product}f{:02}.grib2",
                    self.base_url,
                    run.format("%Y%m%d"),
                    run.format("%H"),
                    valid_time.forecast_hour,
                ))
            }
            UrlContext::ZarrChunk { .. } => Err(unsupported_context(self.source_id())),
        }
    }

    fn resolve_product(&self, requested: Option<&str>) -> String {
        requested.unwrap_or("sfc").to_string()
    }

    fn decompress_policy(&self) -> DecompressPolicy {
        DecompressPolicy::None
    }

    fn message_selector(&self, variable_id: &str) -> Result<MessageSelector, HydroError> {
        match variable_id {
            "TMP" => Ok(MessageSelector::Grib2 {
                discipline: 0,
                category: 0,
                parameter: 0,
            }),
            other => Err(unknown_variable(self.source_id(), other)),
        }
    }
}

/// Analysis of Record for Calibration: Zarr V2 hourly precipitation/met
/// fields, chunked along time and the two spatial axes.
pub struct AorcAdapter {
    pub base_url: String,
}

impl AorcAdapter {
    /// AORC's Zarr store is laid out per calendar year.
    pub fn dataset_path(&self, year: i32) -> String {
        format!("{}/{year}.zarr", self.base_url)
    }
}

impl SourceAdapter for AorcAdapter {
    fn source_id(&self) -> &str {
        "aorc"
    }

    fn url_for(&self, ctx: &UrlContext) -> Result<String, HydroError> {
        match ctx {
            UrlContext::ZarrChunk {
                variable_id,
                t_chunk,
                lat_chunk,
                lon_chunk,
            } => Ok(format!("{variable_id}/{t_chunk}.{lat_chunk}.{lon_chunk}")),
            UrlContext::Grib2Timed { valid_time, .. } => {
                // AORC has no GRIB2 path, but exposes the dataset's yearly
                // store root so a caller can combine it with a ZarrChunk.
                Ok(self.dataset_path(valid_time.reference_time.year()))
            }
        }
    }

    fn resolve_product(&self, requested: Option<&str>) -> String {
        requested.unwrap_or("v1.1").to_string()
    }

    fn decompress_policy(&self) -> DecompressPolicy {
        // The Zarr chunk itself is the compressed unit; zarr-reader reads
        // the codec out of `.zarray` rather than a policy here.
        DecompressPolicy::None
    }

    fn message_selector(&self, variable_id: &str) -> Result<MessageSelector, HydroError> {
        Ok(MessageSelector::ZarrVariable(variable_id.to_string()))
    }

    /// Hours elapsed since `store_root_year`-01-01T00:00:00Z, floored and
    /// clamped to the axis origin for an instant that precedes it (a
    /// caller requesting a time before the year the store root resolved
    /// to, which `url_for`'s yearly rounding can produce for the first
    /// hour of a year under certain timezone-naive callers).
    fn zarr_time_index(&self, store_root_year: i32, instant: DateTime<Utc>) -> usize {
        let year_start = Utc.with_ymd_and_hms(store_root_year, 1, 1, 0, 0, 0).unwrap();
        let elapsed_secs = (instant - year_start).num_seconds();
        if elapsed_secs <= 0 {
            0
        } else {
            (elapsed_secs / AORC_TEMPORAL_RESOLUTION_SECS) as usize
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use hydro_common::ValidTime;

    #[test]
    fn mrms_url_includes_product_and_timestamp() {
        let adapter = MrmsAdapter {
            base_url: "https://mrms.example.com".into(),
        };
        let valid_time = ValidTime::analysis(Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap());
        let url = adapter
            .url_for(&UrlContext::Grib2Timed {
                valid_time,
                product: adapter.resolve_product(None),
            })
            .unwrap();
        assert_eq!(
            url,
            "https://mrms.example.com/MergedReflectivityQC_00.50/MRMS_MergedReflectivityQC_00.50_20240510-120000.grib2.gz"
        );
    }

    #[test]
    fn mrms_rejects_zarr_chunk_context() {
        let adapter = MrmsAdapter {
            base_url: "https://mrms.example.com".into(),
        };
        let err = adapter.url_for(&UrlContext::ZarrChunk {
            variable_id: "x".into(),
            t_chunk: 0,
            lat_chunk: 0,
            lon_chunk: 0,
        });
        assert!(err.is_err());
    }

    #[test]
    fn hrrr_url_includes_run_hour_and_forecast_hour() {
        let adapter = HrrrAdapter {
            base_url: "https://hrrr.example.com".into(),
        };
        let valid_time = ValidTime::new(Utc.with_ymd_and_hms(2024, 5, 10, 6, 0, 0).unwrap(), 1);
        let url = adapter
            .url_for(&UrlContext::Grib2Timed {
                valid_time,
                product: adapter.resolve_product(Some("sfc")),
            })
            .unwrap();
        assert_eq!(url, "https://hrrr.example.com/hrrr.20240510/conus/hrrr.t06z.wrfsfcf01.grib2");
    }

    #[test]
    fn aorc_chunk_path_uses_chunk_grid_coordinates() {
        let adapter = AorcAdapter {
            base_url: "https://aorc.example.com".into(),
        };
        let path = adapter
            .url_for(&UrlContext::ZarrChunk {
                variable_id: "APCP_surface".into(),
                t_chunk: 2,
                lat_chunk: 5,
                lon_chunk: 9,
            })
            .unwrap();
        assert_eq!(path, "APCP_surface/2.5.9");
    }

    #[test]
    fn aorc_time_index_advances_hourly_from_year_start() {
        let adapter = AorcAdapter {
            base_url: "https://aorc.example.com".into(),
        };
        let year_start = Utc.with_ymd_and_hms(1995, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(adapter.zarr_time_index(1995, year_start), 0);
        assert_eq!(adapter.zarr_time_index(1995, year_start + chrono::Duration::hours(1)), 1);
        assert_eq!(adapter.zarr_time_index(1995, year_start + chrono::Duration::hours(2)), 2);
        // Sub-hour offsets floor to the containing step.
        assert_eq!(adapter.zarr_time_index(1995, year_start + chrono::Duration::minutes(90)), 1);
    }

    #[test]
    fn aorc_time_index_clamps_to_origin_before_year_start() {
        let adapter = AorcAdapter {
            base_url: "https://aorc.example.com".into(),
        };
        let year_start = Utc.with_ymd_and_hms(1995, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(adapter.zarr_time_index(1995, year_start - chrono::Duration::hours(1)), 0);
    }

    #[test]
    fn unknown_variable_is_reported_per_adapter() {
        let adapter = MrmsAdapter {
            base_url: "https://mrms.example.com".into(),
        };
        assert!(adapter.message_selector("NOPE").is_err());
    }
}

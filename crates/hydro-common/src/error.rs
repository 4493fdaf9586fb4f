//! Error taxonomy for the hydro grid client.
//!
//! Every variant carries the source identifier and, where applicable, the
//! URL or cache key that triggered the error, so a caller can log or
//! surface a precise remedy without re-deriving context.

use thiserror::Error;

/// Result type alias using [`HydroError`].
pub type HydroResult<T> = Result<T, HydroError>;

/// Primary error type for hydro grid client operations.
#[derive(Debug, Error)]
pub enum HydroError {
    // === Configuration errors ===
    #[error("unknown source: {source_id}")]
    UnknownSource { source_id: String },

    #[error("unknown dataset '{dataset_id}' for source {source_id}")]
    UnknownDataset {
        source_id: String,
        dataset_id: String,
    },

    #[error("unknown variable '{variable_id}' for source {source_id}")]
    UnknownVariable {
        source_id: String,
        variable_id: String,
    },

    #[error("unknown product '{product}' for source {source_id}")]
    UnknownProduct { source_id: String, product: String },

    #[error("variable '{variable_id}' is not available for this data type on {source_id}")]
    VariableNotAvailableForDataType {
        source_id: String,
        variable_id: String,
    },

    // === Request errors ===
    #[error("point ({lat}, {lon}) is out of domain for source {source_id}")]
    OutOfDomainPoint {
        source_id: String,
        lat: f64,
        lon: f64,
    },

    #[error("bbox is out of domain for source {source_id}")]
    OutOfDomainBbox { source_id: String },

    #[error("time {timestamp} is outside the temporal range of source {source_id}")]
    OutOfTemporalRange {
        source_id: String,
        timestamp: String,
    },

    #[error("invalid date range: start {start} is not before end {end}")]
    InvalidDateRange { start: String, end: String },

    #[error("invalid bbox: {reason}")]
    InvalidBbox { reason: String },

    // === Transport errors ===
    #[error("not found: {url} ({remedy})")]
    NotFound { url: String, remedy: String },

    #[error("forbidden: {url}")]
    Forbidden { url: String },

    #[error("rate limited: {url}")]
    RateLimited { url: String },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("transport error for {url}: {message}")]
    TransportError { url: String, message: String },

    #[error("http error {status} for {url}")]
    HttpError { url: String, status: u16 },

    #[error("all proxies failed for {url}; last error: {last_error} (attempted: {attempted:?})")]
    AllProxiesFailed {
        url: String,
        last_error: String,
        attempted: Vec<String>,
    },

    // === Decode errors ===
    #[error("decompression failed (codec: {codec}): {message}")]
    DecompressionError { codec: String, message: String },

    #[error("format parse error in {source_id}: {message}")]
    FormatParseError { source_id: String, message: String },

    #[error("no message found for variable '{variable_id}' in {source_id}")]
    MessageNotFound {
        source_id: String,
        variable_id: String,
    },

    #[error("data integrity error: {message}")]
    DataIntegrityError { message: String },

    // === Cache errors ===
    #[error("cache full: entry for {key} ({size} bytes) exceeds available budget")]
    CacheFull { key: String, size: u64 },

    #[error("cache corrupt at key {key}: {message}")]
    CacheCorrupt { key: String, message: String },

    // === Lifecycle ===
    #[error("request cancelled")]
    Cancelled,
}

impl HydroError {
    /// A short, stable machine-readable tag for this error variant, handy
    /// for metrics/log correlation without matching on the full enum.
    pub fn tag(&self) -> &'static str {
        match self {
            HydroError::UnknownSource { .. } => "unknown_source",
            HydroError::UnknownDataset { .. } => "unknown_dataset",
            HydroError::UnknownVariable { .. } => "unknown_variable",
            HydroError::UnknownProduct { .. } => "unknown_product",
            HydroError::VariableNotAvailableForDataType { .. } => {
                "variable_not_available_for_data_type"
            }
            HydroError::OutOfDomainPoint { .. } => "out_of_domain_point",
            HydroError::OutOfDomainBbox { .. } => "out_of_domain_bbox",
            HydroError::OutOfTemporalRange { .. } => "out_of_temporal_range",
            HydroError::InvalidDateRange { .. } => "invalid_date_range",
            HydroError::InvalidBbox { .. } => "invalid_bbox",
            HydroError::NotFound { .. } => "not_found",
            HydroError::Forbidden { .. } => "forbidden",
            HydroError::RateLimited { .. } => "rate_limited",
            HydroError::Timeout { .. } => "timeout",
            HydroError::TransportError { .. } => "transport_error",
            HydroError::HttpError { .. } => "http_error",
            HydroError::AllProxiesFailed { .. } => "all_proxies_failed",
            HydroError::DecompressionError { .. } => "decompression_error",
            HydroError::FormatParseError { .. } => "format_parse_error",
            HydroError::MessageNotFound { .. } => "message_not_found",
            HydroError::DataIntegrityError { .. } => "data_integrity_error",
            HydroError::CacheFull { .. } => "cache_full",
            HydroError::CacheCorrupt { .. } => "cache_corrupt",
            HydroError::Cancelled => "cancelled",
        }
    }

    /// Whether this error should be captured per-item in a fan-out
    /// operation (time series, multi-point) rather than aborting the whole
    /// request, per the error propagation policy.
    pub fn is_per_item_capturable(&self) -> bool {
        matches!(
            self,
            HydroError::NotFound { .. }
                | HydroError::Forbidden { .. }
                | HydroError::RateLimited { .. }
                | HydroError::Timeout { .. }
                | HydroError::TransportError { .. }
                | HydroError::HttpError { .. }
                | HydroError::AllProxiesFailed { .. }
                | HydroError::OutOfDomainPoint { .. }
                | HydroError::OutOfDomainBbox { .. }
                | HydroError::OutOfTemporalRange { .. }
        )
    }

    /// Construct the canonical `NotFound` error for a real-time product
    /// whose retention window has likely expired, surfacing a probable
    /// remedy instead of a bare 404.
    pub fn not_found_retention(url: impl Into<String>, retention_hint: &str) -> Self {
        HydroError::NotFound {
            url: url.into(),
            remedy: format!(
                "data for this timestamp may not be published yet, or has aged out of the \
                 real-time retention window ({retention_hint}); check the source's \
                 current-data URL for the latest available time"
            ),
        }
    }
}

impl From<std::io::Error> for HydroError {
    fn from(err: std::io::Error) -> Self {
        HydroError::DataIntegrityError {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for HydroError {
    fn from(err: serde_json::Error) -> Self {
        HydroError::FormatParseError {
            source_id: "unknown".to_string(),
            message: format!("JSON error: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_retention_includes_hint() {
        let err = HydroError::not_found_retention("https://example.com/x.grib2", "24-48 h");
        let message = err.to_string();
        assert!(message.contains("24-48 h"));
        assert_eq!(err.tag(), "not_found");
    }

    #[test]
    fn per_item_capturable_classification() {
        assert!(HydroError::Timeout { url: "u".into() }.is_per_item_capturable());
        assert!(!HydroError::CacheCorrupt {
            key: "k".into(),
            message: "m".into()
        }
        .is_per_item_capturable());
    }
}

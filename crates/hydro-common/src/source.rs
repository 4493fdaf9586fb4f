//! Source and variable descriptors: static metadata about a data provider.

use crate::{BoundingBox, CrsCode};
use serde::{Deserialize, Serialize};

/// The on-the-wire format a source's files are encoded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatKind {
    Grib2,
    NetCdf,
    Zarr,
    GeoTiff,
    Bil,
}

/// Static description of a single variable offered by a source/dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableDescriptor {
    pub id: String,
    pub display_name: String,
    pub units: String,
    /// Value below which a decoded sample is treated as missing/sentinel.
    pub fill_value: Option<f64>,
}

/// Static description of a data source registered with the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub id: String,
    pub display_name: String,
    pub format: FormatKind,
    pub crs: CrsCode,
    pub domain: BoundingBox,
    pub variables: Vec<VariableDescriptor>,
    /// Base URL(s) tried in order when fetching raw files for this source.
    pub base_urls: Vec<String>,
    /// Whether this source is known to reject browser-origin/CORS requests,
    /// requiring proxy fallthrough even for same-process fetches.
    pub requires_proxy: bool,
}

impl SourceDescriptor {
    pub fn variable(&self, variable_id: &str) -> Option<&VariableDescriptor> {
        self.variables.iter().find(|v| v.id == variable_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_source() -> SourceDescriptor {
        SourceDescriptor {
            id: "mrms".into(),
            display_name: "Multi-Radar Multi-Sensor".into(),
            format: FormatKind::Grib2,
            crs: CrsCode::Epsg4326,
            domain: BoundingBox::new(-130.0, 20.0, -60.0, 55.0),
            variables: vec![VariableDescriptor {
                id: "precip_rate".into(),
                display_name: "Precipitation Rate".into(),
                units: "mm/hr".into(),
                fill_value: Some(-999.0),
            }],
            base_urls: vec!["https://example.com/mrms".into()],
            requires_proxy: false,
        }
    }

    #[test]
    fn looks_up_known_variable() {
        let source = sample_source();
        assert!(source.variable("precip_rate").is_some());
        assert!(source.variable("nope").is_none());
    }
}

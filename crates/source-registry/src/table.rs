//! YAML-driven source/variable tables.
//!
//! Source and variable descriptors are static, operator-provided data
//! (spec.md §1 names them an external collaborator), loaded once at
//! startup the same way `model_config.rs`/`layer_config.rs` load their
//! per-model YAML files.

use std::collections::HashMap;

use hydro_common::{HydroError, SourceDescriptor};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct RawSourceTable {
    sources: Vec<SourceDescriptor>,
}

/// A loaded set of source descriptors, keyed by source id.
#[derive(Debug, Clone)]
pub struct SourceTable {
    sources: HashMap<String, SourceDescriptor>,
}

impl SourceTable {
    /// Parse a source table from YAML text (a top-level `sources:` list).
    pub fn from_yaml(yaml: &str) -> Result<Self, HydroError> {
        let raw: RawSourceTable = serde_yaml::from_str(yaml).map_err(|e| HydroError::FormatParseError {
            source_id: "source-table".into(),
            message: e.to_string(),
        })?;
        let sources = raw.sources.into_iter().map(|s| (s.id.clone(), s)).collect();
        Ok(Self { sources })
    }

    pub fn get(&self, source_id: &str) -> Result<&SourceDescriptor, HydroError> {
        self.sources
            .get(source_id)
            .ok_or_else(|| HydroError::UnknownSource {
                source_id: source_id.to_string(),
            })
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_YAML: &str = r#"
sources:
  - id: mrms
    display_name: Multi-Radar Multi-Sensor
    format: grib2
    crs: Epsg4326
    domain:
      min_x: -130.0
      min_y: 20.0
      max_x: -60.0
      max_y: 55.0
    variables:
      - id: REF
        display_name: Reflectivity
        units: dBZ
        fill_value: -999.0
    base_urls:
      - https://mrms.example.com
    requires_proxy: false
"#;

    #[test]
    fn loads_sources_from_yaml() {
        let table = SourceTable::from_yaml(SAMPLE_YAML).unwrap();
        let mrms = table.get("mrms").unwrap();
        assert_eq!(mrms.display_name, "Multi-Radar Multi-Sensor");
        assert_eq!(mrms.variable("REF").unwrap().units, "dBZ");
    }

    #[test]
    fn unknown_source_is_reported() {
        let table = SourceTable::from_yaml(SAMPLE_YAML).unwrap();
        assert!(table.get("nope").is_err());
    }
}

//! Coordinate reference system codes and validity bounds.
//!
//! Every gridded source declares its native CRS so callers can validate a
//! requested point or bbox falls within the projection's valid domain
//! before a fetch is attempted.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Well-known CRS codes used by the sources this client understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrsCode {
    /// WGS84 Geographic (lat/lon in degrees)
    Epsg4326,
    /// Web Mercator (meters)
    Epsg3857,
    /// NAD83 Geographic
    Epsg4269,
    /// NAD83 / Conus Albers (used by 3DEP and some NRCS products)
    Epsg5070,
    /// Polar Stereographic North
    Epsg3413,
    /// Polar Stereographic South
    Epsg3031,
}

impl CrsCode {
    /// Check if this is a geographic (lat/lon) CRS.
    pub fn is_geographic(&self) -> bool {
        matches!(self, CrsCode::Epsg4326 | CrsCode::Epsg4269)
    }
}

impl fmt::Display for CrsCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            CrsCode::Epsg4326 => "EPSG:4326",
            CrsCode::Epsg3857 => "EPSG:3857",
            CrsCode::Epsg4269 => "EPSG:4269",
            CrsCode::Epsg5070 => "EPSG:5070",
            CrsCode::Epsg3413 => "EPSG:3413",
            CrsCode::Epsg3031 => "EPSG:3031",
        };
        write!(f, "{}", code)
    }
}

/// Full CRS definition, carrying valid-domain bounds for request validation.
#[derive(Debug, Clone)]
pub struct Crs {
    pub code: CrsCode,
}

impl Crs {
    pub fn new(code: CrsCode) -> Self {
        Self { code }
    }

    /// Get the valid bounds for this CRS, used to reject out-of-domain
    /// points and bboxes before a fetch is attempted.
    pub fn valid_bounds(&self) -> crate::BoundingBox {
        use crate::BoundingBox;

        match self.code {
            CrsCode::Epsg4326 | CrsCode::Epsg4269 => BoundingBox::new(-180.0, -90.0, 180.0, 90.0),
            CrsCode::Epsg3857 => {
                let max_extent = 20037508.342789244;
                BoundingBox::new(-max_extent, -max_extent, max_extent, max_extent)
            }
            CrsCode::Epsg5070 => BoundingBox::new(-2500000.0, -2500000.0, 2500000.0, 2500000.0),
            CrsCode::Epsg3413 | CrsCode::Epsg3031 => {
                BoundingBox::new(-4000000.0, -4000000.0, 4000000.0, 4000000.0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geographic_classification() {
        assert!(CrsCode::Epsg4326.is_geographic());
        assert!(!CrsCode::Epsg3857.is_geographic());
    }

    #[test]
    fn display_round_trips_code() {
        assert_eq!(CrsCode::Epsg5070.to_string(), "EPSG:5070");
    }

    #[test]
    fn geographic_bounds_cover_whole_globe() {
        let bounds = Crs::new(CrsCode::Epsg4326).valid_bounds();
        assert_eq!(bounds.min_x, -180.0);
        assert_eq!(bounds.max_y, 90.0);
    }
}

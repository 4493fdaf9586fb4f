//! Map projections for non-lat/lon source grids.
//!
//! Only the projection math needed to resolve a point or bbox query onto a
//! source-native grid lives here — this is not a general GIS library.

pub mod lambert;

pub use lambert::LambertConformal;

/// A projection that maps geographic coordinates onto a source's native
/// grid indices and back, so [`grid-engine`](../grid_engine) can reuse one
/// windowing implementation regardless of how a source is projected.
pub trait GridProjection {
    /// Convert geographic (lat, lon) in degrees to fractional grid indices
    /// (i, j). Indices outside `[0, nx) x [0, ny)` indicate the point falls
    /// off the grid.
    fn geo_to_grid(&self, lat_deg: f64, lon_deg: f64) -> (f64, f64);

    /// Convert fractional grid indices back to geographic coordinates.
    fn grid_to_geo(&self, i: f64, j: f64) -> (f64, f64);

    /// Grid dimensions (nx, ny).
    fn dimensions(&self) -> (usize, usize);
}

impl GridProjection for LambertConformal {
    fn geo_to_grid(&self, lat_deg: f64, lon_deg: f64) -> (f64, f64) {
        LambertConformal::geo_to_grid(self, lat_deg, lon_deg)
    }

    fn grid_to_geo(&self, i: f64, j: f64) -> (f64, f64) {
        LambertConformal::grid_to_geo(self, i, j)
    }

    fn dimensions(&self) -> (usize, usize) {
        LambertConformal::dimensions(self)
    }
}

/// An identity projection for already-geographic (EPSG:4326/4269) grids,
/// where grid indices are simply a linear function of lat/lon.
#[derive(Debug, Clone, Copy)]
pub struct GeographicGrid {
    pub first_lat: f64,
    pub first_lon: f64,
    pub dlat: f64,
    pub dlon: f64,
    pub nx: usize,
    pub ny: usize,
}

impl GridProjection for GeographicGrid {
    fn geo_to_grid(&self, lat_deg: f64, lon_deg: f64) -> (f64, f64) {
        (
            (lon_deg - self.first_lon) / self.dlon,
            (lat_deg - self.first_lat) / self.dlat,
        )
    }

    fn grid_to_geo(&self, i: f64, j: f64) -> (f64, f64) {
        (self.first_lat + j * self.dlat, self.first_lon + i * self.dlon)
    }

    fn dimensions(&self) -> (usize, usize) {
        (self.nx, self.ny)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geographic_grid_round_trips() {
        let grid = GeographicGrid {
            first_lat: 90.0,
            first_lon: 0.0,
            dlat: -0.25,
            dlon: 0.25,
            nx: 1440,
            ny: 721,
        };
        let (i, j) = grid.geo_to_grid(45.0, 10.0);
        let (lat, lon) = grid.grid_to_geo(i, j);
        assert!((lat - 45.0).abs() < 1e-9);
        assert!((lon - 10.0).abs() < 1e-9);
    }
}

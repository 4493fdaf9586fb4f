//! Common test fixtures for the hydro grid client workspace.
//!
//! This module provides pre-defined test data representing common
//! scenarios in gridded meteorological/hydrological data access.

/// Common bounding box definitions for testing.
pub mod bbox {
    /// Global bounding box (-180 to 180, -90 to 90)
    pub const GLOBAL: (f64, f64, f64, f64) = (-180.0, -90.0, 180.0, 90.0);

    /// Continental United States bounding box
    pub const CONUS: (f64, f64, f64, f64) = (-130.0, 20.0, -60.0, 55.0);

    /// Europe bounding box
    pub const EUROPE: (f64, f64, f64, f64) = (-15.0, 35.0, 45.0, 72.0);

    /// A small test window (a few grid cells across)
    pub const SMALL_WINDOW: (f64, f64, f64, f64) = (-100.0, 40.0, -99.0, 41.0);

    /// Single point (degenerate bbox)
    pub const POINT: (f64, f64, f64, f64) = (0.0, 0.0, 0.0, 0.0);

    /// Crosses antimeridian (Pacific-centric)
    pub const PACIFIC: (f64, f64, f64, f64) = (160.0, -50.0, -140.0, 50.0);

    /// Invalid bbox (min > max)
    pub const INVALID: (f64, f64, f64, f64) = (10.0, 10.0, 5.0, 5.0);
}

/// Common grid specifications for testing.
pub mod grid {
    /// GFS global grid (0.25 degree resolution)
    pub const GFS_GLOBAL: GridSpec = GridSpec {
        width: 1440,
        height: 721,
        min_lon: 0.0,
        max_lon: 359.75,
        min_lat: -90.0,
        max_lat: 90.0,
    };

    /// HRRR CONUS grid (3km resolution, ~1800x1060)
    pub const HRRR_CONUS: GridSpec = GridSpec {
        width: 1799,
        height: 1059,
        min_lon: -134.09,
        max_lon: -60.92,
        min_lat: 21.14,
        max_lat: 52.62,
    };

    /// MRMS CONUS grid (1km resolution)
    pub const MRMS_CONUS: GridSpec = GridSpec {
        width: 7000,
        height: 3500,
        min_lon: -130.0,
        max_lon: -60.0,
        min_lat: 20.0,
        max_lat: 55.0,
    };

    /// Simple 10x10 test grid
    pub const SIMPLE_10X10: GridSpec = GridSpec {
        width: 10,
        height: 10,
        min_lon: -10.0,
        max_lon: 10.0,
        min_lat: -10.0,
        max_lat: 10.0,
    };

    /// Grid specification for testing.
    #[derive(Debug, Clone, Copy)]
    pub struct GridSpec {
        pub width: usize,
        pub height: usize,
        pub min_lon: f64,
        pub max_lon: f64,
        pub min_lat: f64,
        pub max_lat: f64,
    }

    impl GridSpec {
        /// Returns the total number of grid cells.
        pub fn size(&self) -> usize {
            self.width * self.height
        }

        /// Returns the resolution in degrees.
        pub fn resolution(&self) -> (f64, f64) {
            let dx = (self.max_lon - self.min_lon) / self.width as f64;
            let dy = (self.max_lat - self.min_lat) / self.height as f64;
            (dx, dy)
        }

        /// Returns the bounding box as (min_lon, min_lat, max_lon, max_lat).
        pub fn bbox(&self) -> (f64, f64, f64, f64) {
            (self.min_lon, self.min_lat, self.max_lon, self.max_lat)
        }
    }
}

/// Common time values for testing.
pub mod time {
    /// A fixed reference time for tests (2024-01-15T12:00:00Z)
    pub const REFERENCE_TIME: &str = "2024-01-15T12:00:00Z";

    /// GFS model run times
    pub const GFS_CYCLES: [&str; 4] = ["00", "06", "12", "18"];

    /// HRRR model run times (hourly)
    pub const HRRR_CYCLES: [&str; 24] = [
        "00", "01", "02", "03", "04", "05", "06", "07", "08", "09", "10", "11", "12", "13", "14",
        "15", "16", "17", "18", "19", "20", "21", "22", "23",
    ];

    /// Common forecast hours
    pub const FORECAST_HOURS: [u32; 8] = [0, 1, 3, 6, 12, 24, 48, 120];
}

/// Common query-point locations, useful across decoder and adapter tests.
pub mod coords {
    /// Oklahoma City (land, CONUS interior)
    pub const OKC: (f64, f64) = (-97.5, 35.2);

    /// Denver (high altitude)
    pub const DENVER: (f64, f64) = (-104.99, 39.74);

    /// San Francisco (coastal)
    pub const SAN_FRANCISCO: (f64, f64) = (-122.42, 37.77);

    /// Washington DC (east coast)
    pub const WASHINGTON_DC: (f64, f64) = (-77.04, 38.90);

    /// Chicago (midwest)
    pub const CHICAGO: (f64, f64) = (-87.63, 41.88);

    /// Ocean point (Gulf of Mexico)
    pub const GULF_OCEAN: (f64, f64) = (-92.0, 26.0);

    /// Origin point
    pub const ORIGIN: (f64, f64) = (0.0, 0.0);
}

/// Common variable ids used by the built-in source adapters.
pub mod variables {
    pub const TMP: &str = "TMP";
    pub const UGRD: &str = "UGRD";
    pub const VGRD: &str = "VGRD";
    pub const RH: &str = "RH";
    pub const HGT: &str = "HGT";
    pub const PRMSL: &str = "PRMSL";
    pub const APCP: &str = "APCP";
    pub const REFC: &str = "REFC";
}

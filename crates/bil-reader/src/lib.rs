//! ESRI BIL (Band Interleaved by Line) reader.
//!
//! BIL rasters are a raw binary pixel array plus a plain-text `.hdr`
//! sidecar describing layout (`NROWS`/`NCOLS`/`NBITS`/`BYTEORDER`) and
//! georeferencing (`ULXMAP`/`ULYMAP`/`XDIM`/`YDIM`). There is no
//! compressed container to parse, so this crate is the sidecar parser
//! plus typed little/big-endian reads — the BIL-specific half of the
//! GeoTIFF/ESRI raster conventions `geotiff-reader` covers for TIFF.

use hydro_common::HydroError;

/// Byte order of the pixel data, as declared by `BYTEORDER` in the `.hdr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

/// Pixel sample type, derived from `NBITS` and `PIXELTYPE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelType {
    SignedInt16,
    SignedInt32,
    Float32,
    UnsignedInt8,
}

impl PixelType {
    fn byte_len(self) -> usize {
        match self {
            PixelType::UnsignedInt8 => 1,
            PixelType::SignedInt16 => 2,
            PixelType::SignedInt32 | PixelType::Float32 => 4,
        }
    }
}

/// Parsed `.hdr` sidecar.
#[derive(Debug, Clone, PartialEq)]
pub struct BilHeader {
    pub nrows: u32,
    pub ncols: u32,
    pub nbands: u32,
    pub byte_order: ByteOrder,
    pub pixel_type: PixelType,
    pub ulx_map: f64,
    pub uly_map: f64,
    pub x_dim: f64,
    pub y_dim: f64,
    pub nodata: Option<f64>,
}

impl BilHeader {
    /// Parse a `.hdr` file's text. Keys are case-insensitive and
    /// whitespace-separated (the ESRI convention), one per line.
    pub fn parse(text: &str) -> Result<Self, HydroError> {
        let mut fields = std::collections::HashMap::new();
        for line in text.lines() {
            let mut parts = line.split_whitespace();
            if let (Some(key), Some(value)) = (parts.next(), parts.next()) {
                fields.insert(key.to_ascii_uppercase(), value.to_string());
            }
        }

        let get = |key: &str| -> Result<&String, HydroError> {
            fields.get(key).ok_or_else(|| HydroError::FormatParseError {
                source_id: "bil".into(),
                message: format!("missing required .hdr field {key}"),
            })
        };
        let parse_num = |key: &str| -> Result<f64, HydroError> {
            get(key)?.parse::<f64>().map_err(|e| HydroError::FormatParseError {
                source_id: "bil".into(),
                message: format!("invalid {key}: {e}"),
            })
        };
        let parse_u32 = |key: &str| -> Result<u32, HydroError> {
            get(key)?.parse::<u32>().map_err(|e| HydroError::FormatParseError {
                source_id: "bil".into(),
                message: format!("invalid {key}: {e}"),
            })
        };

        let byte_order = match fields.get("BYTEORDER").map(|s| s.as_str()) {
            Some("M") => ByteOrder::Big,
            _ => ByteOrder::Little,
        };

        let nbits = fields.get("NBITS").map(|s| s.as_str()).unwrap_or("16");
        let pixel_type_tag = fields.get("PIXELTYPE").map(|s| s.as_str());
        let pixel_type = match (nbits, pixel_type_tag) {
            ("8", _) => PixelType::UnsignedInt8,
            ("32", Some("FLOAT")) => PixelType::Float32,
            ("32", _) => PixelType::SignedInt32,
            _ => PixelType::SignedInt16,
        };

        let nbands = fields
            .get("NBANDS")
            .map(|s| s.parse::<u32>().unwrap_or(1))
            .unwrap_or(1);
        let nodata = fields.get("NODATA").and_then(|s| s.parse::<f64>().ok());

        Ok(Self {
            nrows: parse_u32("NROWS")?,
            ncols: parse_u32("NCOLS")?,
            nbands,
            byte_order,
            pixel_type,
            ulx_map: parse_num("ULXMAP")?,
            uly_map: parse_num("ULYMAP")?,
            x_dim: parse_num("XDIM")?,
            y_dim: parse_num("YDIM")?,
            nodata,
        })
    }
}

/// A decoded single-band BIL raster.
pub struct BilRaster {
    pub header: BilHeader,
    values: Vec<f64>,
}

impl BilRaster {
    /// Decode raw BIL pixel bytes using a parsed header. Only
    /// single-band rasters are supported (the workspace's BIL sources —
    /// PRISM climate normals — are single-band).
    pub fn open(header: BilHeader, data: &[u8]) -> Result<Self, HydroError> {
        if header.nbands != 1 {
            return Err(HydroError::FormatParseError {
                source_id: "bil".into(),
                message: format!(
                    "unsupported band count {}; only single-band BIL is supported",
                    header.nbands
                ),
            });
        }

        let pixel_len = header.pixel_type.byte_len();
        let expected_len = header.nrows as usize * header.ncols as usize * pixel_len;
        if data.len() < expected_len {
            return Err(HydroError::DataIntegrityError {
                message: format!(
                    "BIL data is {} bytes, expected at least {expected_len} for {}x{} at {pixel_len} bytes/px",
                    data.len(),
                    header.nrows,
                    header.ncols
                ),
            });
        }

        let values = data[..expected_len]
            .chunks_exact(pixel_len)
            .map(|chunk| read_sample(chunk, header.pixel_type, header.byte_order))
            .collect();

        Ok(Self { header, values })
    }

    /// Raw pixel value at (col, row), or `None` if out of bounds.
    pub fn pixel(&self, col: u32, row: u32) -> Option<f64> {
        if col >= self.header.ncols || row >= self.header.nrows {
            return None;
        }
        Some(self.values[row as usize * self.header.ncols as usize + col as usize])
    }

    /// Value at a geographic point, `NODATA` mapped to `NaN`, or `None` if
    /// outside the raster extent. `ULXMAP`/`ULYMAP` are the center of the
    /// upper-left pixel, per the ESRI BIL convention.
    pub fn value_at_point(&self, x: f64, y: f64) -> Option<f64> {
        let col = ((x - self.header.ulx_map) / self.header.x_dim + 0.5).floor();
        let row = ((self.header.uly_map - y) / self.header.y_dim + 0.5).floor();
        if col < 0.0 || row < 0.0 {
            return None;
        }
        let raw = self.pixel(col as u32, row as u32)?;
        Some(apply_nodata(raw, self.header.nodata))
    }

    /// Read a rectangular pixel window, clamped to the raster's bounds,
    /// row-major with `NODATA` mapped to `NaN`.
    pub fn read_window(&self, col_start: u32, row_start: u32, col_end: u32, row_end: u32) -> Vec<f64> {
        let col_end = col_end.min(self.header.ncols);
        let row_end = row_end.min(self.header.nrows);
        let mut out = Vec::new();
        for row in row_start..row_end {
            for col in col_start..col_end {
                let raw = self.pixel(col, row).unwrap_or(f64::NAN);
                out.push(apply_nodata(raw, self.header.nodata));
            }
        }
        out
    }

    /// Convert a geographic point to fractional (col, row).
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.header.ulx_map) / self.header.x_dim + 0.5,
            (self.header.uly_map - y) / self.header.y_dim + 0.5,
        )
    }
}

fn apply_nodata(raw: f64, nodata: Option<f64>) -> f64 {
    match nodata {
        Some(nd) if (raw - nd).abs() < f64::EPSILON => f64::NAN,
        _ => raw,
    }
}

fn read_sample(chunk: &[u8], pixel_type: PixelType, byte_order: ByteOrder) -> f64 {
    match pixel_type {
        PixelType::UnsignedInt8 => chunk[0] as f64,
        PixelType::SignedInt16 => {
            let bytes = [chunk[0], chunk[1]];
            match byte_order {
                ByteOrder::Little => i16::from_le_bytes(bytes) as f64,
                ByteOrder::Big => i16::from_be_bytes(bytes) as f64,
            }
        }
        PixelType::SignedInt32 => {
            let bytes = [chunk[0], chunk[1], chunk[2], chunk[3]];
            match byte_order {
                ByteOrder::Little => i32::from_le_bytes(bytes) as f64,
                ByteOrder::Big => i32::from_be_bytes(bytes) as f64,
            }
        }
        PixelType::Float32 => {
            let bytes = [chunk[0], chunk[1], chunk[2], chunk[3]];
            match byte_order {
                ByteOrder::Little => f32::from_le_bytes(bytes) as f64,
                ByteOrder::Big => f32::from_be_bytes(bytes) as f64,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> &'static str {
        "NROWS 2\nNCOLS 2\nNBANDS 1\nNBITS 32\nPIXELTYPE FLOAT\nBYTEORDER I\n\
         ULXMAP -105.0\nULYMAP 40.0\nXDIM 0.25\nYDIM 0.25\nNODATA -9999.0\n"
    }

    fn sample_data() -> Vec<u8> {
        let values: [f32; 4] = [1.0, 2.0, -9999.0, 4.0];
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn parses_header_fields() {
        let header = BilHeader::parse(sample_header()).unwrap();
        assert_eq!(header.nrows, 2);
        assert_eq!(header.ncols, 2);
        assert_eq!(header.pixel_type, PixelType::Float32);
        assert_eq!(header.byte_order, ByteOrder::Little);
        assert_eq!(header.nodata, Some(-9999.0));
    }

    #[test]
    fn decodes_pixels_and_maps_nodata() {
        let header = BilHeader::parse(sample_header()).unwrap();
        let raster = BilRaster::open(header, &sample_data()).unwrap();
        assert_eq!(raster.pixel(0, 0), Some(1.0));
        assert_eq!(raster.pixel(0, 1), Some(-9999.0));
    }

    #[test]
    fn value_at_point_maps_nodata_to_nan() {
        let header = BilHeader::parse(sample_header()).unwrap();
        let raster = BilRaster::open(header, &sample_data()).unwrap();
        assert_eq!(raster.value_at_point(-104.99, 39.99), Some(1.0));
        assert!(raster.value_at_point(-104.9, 39.85).unwrap().is_nan());
    }

    #[test]
    fn rejects_truncated_data() {
        let header = BilHeader::parse(sample_header()).unwrap();
        assert!(BilRaster::open(header, &[0u8; 4]).is_err());
    }

    #[test]
    fn read_window_clamps_to_raster_bounds() {
        let header = BilHeader::parse(sample_header()).unwrap();
        let raster = BilRaster::open(header, &sample_data()).unwrap();
        let window = raster.read_window(0, 0, 10, 10);
        assert_eq!(window.len(), 4);
        assert!(window[2].is_nan());
    }

    #[test]
    fn decodes_a_constant_grid() {
        let header = BilHeader::parse(
            "NROWS 6\nNCOLS 6\nNBANDS 1\nNBITS 32\nPIXELTYPE FLOAT\nBYTEORDER I\n\
             ULXMAP -105.0\nULYMAP 40.0\nXDIM 0.25\nYDIM 0.25\nNODATA -9999.0\n",
        )
        .unwrap();
        let grid = test_utils::generators::create_constant_grid(6, 6, 42.0);
        let data: Vec<u8> = grid.iter().flat_map(|v| v.to_le_bytes()).collect();
        let raster = BilRaster::open(header, &data).unwrap();
        for row in 0..6 {
            for col in 0..6 {
                assert_eq!(raster.pixel(col, row), Some(42.0));
            }
        }
    }
}

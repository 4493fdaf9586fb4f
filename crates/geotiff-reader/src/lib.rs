//! GeoTIFF reader: IFD/tile-strip decoding plus the GeoTIFF georeferencing
//! tags (`ModelPixelScaleTag`, `ModelTiepointTag`, `GdalNodata`).
//!
//! The `tiff` crate already handles LZW/Deflate/PackBits decompression and
//! tile-vs-strip chunk layout internally (`Decoder::read_image`); this
//! crate only adds the georeferencing math and the point/window extraction
//! the rest of the workspace needs, the same way `netcdf-reader` wraps
//! `netcdf3` with `cooked` value extraction rather than reimplementing the
//! container format.

use std::io::Cursor;

use hydro_common::HydroError;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;

/// Affine georeferencing derived from a GeoTIFF's tiepoint and pixel-scale
/// tags: `geo_x = origin_x + i * pixel_size_x`, `geo_y = origin_y - j *
/// pixel_size_y` (row 0 is the northernmost row, per the TIFF raster-space
/// convention GDAL and friends follow).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_size_x: f64,
    pub pixel_size_y: f64,
}

impl GeoTransform {
    /// Map a geographic point to fractional pixel coordinates.
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.origin_x) / self.pixel_size_x,
            (self.origin_y - y) / self.pixel_size_y,
        )
    }

    /// Map pixel coordinates back to a geographic point (pixel center).
    pub fn pixel_to_geo(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + (col + 0.5) * self.pixel_size_x,
            self.origin_y - (row + 0.5) * self.pixel_size_y,
        )
    }
}

/// A decoded GeoTIFF raster: one band's worth of `f64` pixel values plus
/// the georeferencing needed to index into it by coordinate.
pub struct GeoTiffRaster {
    pub width: u32,
    pub height: u32,
    pub transform: GeoTransform,
    pub nodata: Option<f64>,
    values: Vec<f64>,
}

impl GeoTiffRaster {
    /// Decode a full GeoTIFF from bytes. Only the first image (IFD) is
    /// read; GeoTIFF rasters in this workspace's sources are single-band,
    /// single-image files.
    pub fn open(bytes: &[u8]) -> Result<Self, HydroError> {
        let mut decoder = Decoder::new(Cursor::new(bytes)).map_err(|e| parse_err(e.to_string()))?;

        let (width, height) = decoder.dimensions().map_err(|e| parse_err(e.to_string()))?;
        let transform = read_geo_transform(&mut decoder)?;
        let nodata = read_nodata(&mut decoder);

        let result = decoder.read_image().map_err(|e| parse_err(e.to_string()))?;
        let values = decoding_result_to_f64(result)?;

        if values.len() != width as usize * height as usize {
            return Err(HydroError::DataIntegrityError {
                message: format!(
                    "GeoTIFF pixel count {} does not match dimensions {width}x{height}",
                    values.len()
                ),
            });
        }

        Ok(Self {
            width,
            height,
            transform,
            nodata,
            values,
        })
    }

    /// Raw pixel value at a (col, row) index, or `None` if out of bounds.
    pub fn pixel(&self, col: u32, row: u32) -> Option<f64> {
        if col >= self.width || row >= self.height {
            return None;
        }
        Some(self.values[row as usize * self.width as usize + col as usize])
    }

    /// Value at a geographic point, with `nodata` mapped to `NaN`, or
    /// `None` if the point falls outside the raster extent.
    pub fn value_at_point(&self, x: f64, y: f64) -> Option<f64> {
        let (col, row) = self.transform.geo_to_pixel(x, y);
        if col < 0.0 || row < 0.0 {
            return None;
        }
        let (col, row) = (col as u32, row as u32);
        let raw = self.pixel(col, row)?;
        Some(apply_nodata(raw, self.nodata))
    }

    /// Values within a pixel window `[col_start, col_end)` x
    /// `[row_start, row_end)`, row-major, with `nodata` mapped to `NaN`.
    pub fn read_window(&self, col_start: u32, row_start: u32, col_end: u32, row_end: u32) -> Vec<f64> {
        let col_end = col_end.min(self.width);
        let row_end = row_end.min(self.height);
        let mut out = Vec::new();
        for row in row_start..row_end {
            for col in col_start..col_end {
                let raw = self.pixel(col, row).unwrap_or(f64::NAN);
                out.push(apply_nodata(raw, self.nodata));
            }
        }
        out
    }
}

fn apply_nodata(raw: f64, nodata: Option<f64>) -> f64 {
    match nodata {
        Some(nd) if (raw - nd).abs() < f64::EPSILON => f64::NAN,
        _ => raw,
    }
}

fn read_geo_transform<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
) -> Result<GeoTransform, HydroError> {
    let pixel_scale = decoder
        .get_tag_f64_vec(Tag::ModelPixelScaleTag)
        .map_err(|e| parse_err(format!("missing ModelPixelScaleTag: {e}")))?;
    let tiepoint = decoder
        .get_tag_f64_vec(Tag::ModelTiepointTag)
        .map_err(|e| parse_err(format!("missing ModelTiepointTag: {e}")))?;

    if pixel_scale.len() < 2 || tiepoint.len() < 6 {
        return Err(HydroError::FormatParseError {
            source_id: "geotiff".into(),
            message: "malformed georeferencing tags".into(),
        });
    }

    // Tiepoint is (raster_x, raster_y, raster_z, model_x, model_y, model_z);
    // this workspace only handles tiepoints anchored at raster (0, 0).
    Ok(GeoTransform {
        origin_x: tiepoint[3],
        origin_y: tiepoint[4],
        pixel_size_x: pixel_scale[0],
        pixel_size_y: pixel_scale[1],
    })
}

fn read_nodata<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Option<f64> {
    decoder
        .get_tag_ascii_string(Tag::GdalNodata)
        .ok()
        .and_then(|s| s.trim_end_matches('\0').trim().parse::<f64>().ok())
}

fn decoding_result_to_f64(result: DecodingResult) -> Result<Vec<f64>, HydroError> {
    Ok(match result {
        DecodingResult::U8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::F32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::F64(v) => v,
        DecodingResult::I8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|x| x as f64).collect(),
    })
}

fn parse_err(message: String) -> HydroError {
    HydroError::FormatParseError {
        source_id: "geotiff".into(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiff::encoder::colortype::Gray32Float;
    use tiff::encoder::TiffEncoder;

    fn sample_bytes() -> Vec<u8> {
        let mut bytes = Cursor::new(Vec::new());
        {
            let mut tiff = TiffEncoder::new(&mut bytes).unwrap();
            let mut image = tiff.new_image::<Gray32Float>(2, 2).unwrap();
            image
                .encoder()
                .write_tag(Tag::ModelPixelScaleTag, &[0.25f64, 0.25, 0.0][..])
                .unwrap();
            image
                .encoder()
                .write_tag(Tag::ModelTiepointTag, &[0.0f64, 0.0, 0.0, -105.0, 40.0, 0.0][..])
                .unwrap();
            image
                .encoder()
                .write_tag(Tag::GdalNodata, "-9999")
                .unwrap();
            image.write_data(&[1.0f32, 2.0, -9999.0, 4.0]).unwrap();
        }
        bytes.into_inner()
    }

    #[test]
    fn decodes_dimensions_and_transform() {
        let raster = GeoTiffRaster::open(&sample_bytes()).unwrap();
        assert_eq!((raster.width, raster.height), (2, 2));
        assert_eq!(raster.transform.origin_x, -105.0);
        assert_eq!(raster.transform.origin_y, 40.0);
        assert_eq!(raster.nodata, Some(-9999.0));
    }

    #[test]
    fn value_at_point_maps_nodata_to_nan() {
        let raster = GeoTiffRaster::open(&sample_bytes()).unwrap();
        assert_eq!(raster.pixel(0, 0), Some(1.0));
        assert!(raster.value_at_point(-104.9, 39.6).unwrap().is_nan());
        assert_eq!(raster.value_at_point(-104.99, 39.99), Some(1.0));
    }

    #[test]
    fn read_window_clamps_to_raster_bounds() {
        let raster = GeoTiffRaster::open(&sample_bytes()).unwrap();
        let window = raster.read_window(0, 0, 10, 10);
        assert_eq!(window.len(), 4);
        assert!(window[2].is_nan());
    }

    #[test]
    fn decodes_a_larger_synthetic_grid() {
        let grid = test_utils::generators::create_temperature_grid(8, 8);
        let mut bytes = Cursor::new(Vec::new());
        {
            let mut tiff = TiffEncoder::new(&mut bytes).unwrap();
            let mut image = tiff.new_image::<Gray32Float>(8, 8).unwrap();
            image
                .encoder()
                .write_tag(Tag::ModelPixelScaleTag, &[0.25f64, 0.25, 0.0][..])
                .unwrap();
            image
                .encoder()
                .write_tag(Tag::ModelTiepointTag, &[0.0f64, 0.0, 0.0, -105.0, 40.0, 0.0][..])
                .unwrap();
            image.write_data(&grid).unwrap();
        }
        let raster = GeoTiffRaster::open(&bytes.into_inner()).unwrap();
        assert_eq!((raster.width, raster.height), (8, 8));
        for (idx, expected) in grid.iter().enumerate() {
            let (col, row) = (idx % 8, idx / 8);
            assert_eq!(raster.pixel(col as u32, row as u32), Some(*expected as f64));
        }
    }
}

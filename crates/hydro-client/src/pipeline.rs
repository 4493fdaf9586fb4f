//! Format-specific decode given already-fetched (and already-decompressed)
//! bytes. Grounded on each format crate's own reader plus
//! `grid_engine::nearest_index` for formats with no embedded
//! georeferencing (NetCDF), reusing `projection::GeographicGrid` the way
//! `crates/wms-common/src/grid.rs` builds an implicit regular grid from a
//! source's declared domain.

use bytes::Bytes;

use hydro_common::{BoundingBox, FormatKind, HydroError};
use projection::{GeographicGrid, GridProjection};
use source_registry::MessageSelector;

/// Decode a single point value out of one fetched file for every format
/// except Zarr, whose chunked layout needs orchestration across several
/// fetches and is handled directly in [`crate::HydroClient`].
pub fn extract_point(
    format: FormatKind,
    bytes: &[u8],
    selector: &MessageSelector,
    domain: &BoundingBox,
    x: f64,
    y: f64,
) -> Result<f64, HydroError> {
    match format {
        FormatKind::Grib2 => grib2_point(bytes, selector, y, x),
        FormatKind::GeoTiff => geotiff_point(bytes, x, y),
        FormatKind::Bil => bil_point(bytes, x, y),
        FormatKind::NetCdf => netcdf_point(bytes, selector, domain, x, y),
        FormatKind::Zarr => Err(HydroError::DataIntegrityError {
            message: "zarr point extraction requires chunk-level orchestration".into(),
        }),
    }
}

fn grib2_point(bytes: &[u8], selector: &MessageSelector, lat: f64, lon: f64) -> Result<f64, HydroError> {
    let (discipline, category, parameter) = match selector {
        MessageSelector::Grib2 {
            discipline,
            category,
            parameter,
        } => (*discipline, *category, *parameter),
        other => {
            return Err(HydroError::FormatParseError {
                source_id: "grib2".into(),
                message: format!("selector {other:?} is not a GRIB2 selector"),
            })
        }
    };

    let mut reader = grib2_parser::Grib2Reader::new(Bytes::copy_from_slice(bytes));
    let mut message = None;
    for parsed in reader.iter_messages() {
        let parsed = parsed.map_err(|e| HydroError::FormatParseError {
            source_id: "grib2".into(),
            message: e.to_string(),
        })?;
        if parsed.indicator.discipline == discipline
            && parsed.product_definition.parameter_category == category
            && parsed.product_definition.parameter_number == parameter
        {
            message = Some(parsed);
            break;
        }
    }
    let message = message.ok_or_else(|| HydroError::MessageNotFound {
        source_id: "grib2".into(),
        variable_id: format!("{discipline}/{category}/{parameter}"),
    })?;

    message
        .value_at_point(lat, lon)
        .map(|v| v as f64)
        .map_err(|e| HydroError::FormatParseError {
            source_id: "grib2".into(),
            message: e.to_string(),
        })
}

fn geotiff_point(bytes: &[u8], x: f64, y: f64) -> Result<f64, HydroError> {
    let raster = geotiff_reader::GeoTiffRaster::open(bytes)?;
    raster.value_at_point(x, y).ok_or(HydroError::OutOfDomainPoint {
        source_id: "geotiff".into(),
        lat: y,
        lon: x,
    })
}

fn bil_point(bytes: &[u8], x: f64, y: f64) -> Result<f64, HydroError> {
    let archive = archive_reader::extract_primary(bytes)?;
    let hdr_bytes = archive.sidecar("hdr").ok_or_else(|| HydroError::FormatParseError {
        source_id: "bil".into(),
        message: "archive has no .hdr sidecar".into(),
    })?;
    let hdr_text = std::str::from_utf8(hdr_bytes).map_err(|e| HydroError::FormatParseError {
        source_id: "bil".into(),
        message: e.to_string(),
    })?;
    let header = bil_reader::BilHeader::parse(hdr_text)?;
    let raster = bil_reader::BilRaster::open(header, &archive.primary_bytes)?;
    raster.value_at_point(x, y).ok_or(HydroError::OutOfDomainPoint {
        source_id: "bil".into(),
        lat: y,
        lon: x,
    })
}

fn netcdf_point(bytes: &[u8], selector: &MessageSelector, domain: &BoundingBox, x: f64, y: f64) -> Result<f64, HydroError> {
    let var_name = match selector {
        MessageSelector::NetCdfVariable(name) => name.clone(),
        other => {
            return Err(HydroError::FormatParseError {
                source_id: "netcdf".into(),
                message: format!("selector {other:?} is not a NetCDF selector"),
            })
        }
    };

    let mut reader = netcdf_reader::NetCdfReader::open(bytes)?;
    let cooked = reader.read_cooked(&var_name)?;
    if cooked.shape.len() < 2 {
        return Err(HydroError::DataIntegrityError {
            message: format!("variable '{var_name}' has fewer than 2 dimensions"),
        });
    }

    let ny = cooked.shape[cooked.shape.len() - 2];
    let nx = cooked.shape[cooked.shape.len() - 1];
    let grid = implicit_grid(domain, nx, ny);
    let (i, j) = grid_engine::nearest_index(&grid, y, x).ok_or(HydroError::OutOfDomainPoint {
        source_id: "netcdf".into(),
        lat: y,
        lon: x,
    })?;
    let idx = j * nx + i;
    cooked.values.get(idx).copied().ok_or(HydroError::DataIntegrityError {
        message: format!("index {idx} out of range for variable '{var_name}'"),
    })
}

/// A rectangular window of decoded values, row-major, north-first.
#[derive(Debug, Clone)]
pub struct GridResult {
    pub values: Vec<f64>,
    pub nx: usize,
    pub ny: usize,
}

/// Decode a rectangular window of values intersecting `window` out of one
/// fetched file, for every format except Zarr (see [`extract_point`]).
pub fn extract_grid(
    format: FormatKind,
    bytes: &[u8],
    selector: &MessageSelector,
    domain: &BoundingBox,
    window: &BoundingBox,
) -> Result<GridResult, HydroError> {
    match format {
        FormatKind::Grib2 => grib2_grid(bytes, selector, domain, window),
        FormatKind::GeoTiff => geotiff_grid(bytes, window),
        FormatKind::Bil => bil_grid(bytes, window),
        FormatKind::NetCdf => netcdf_grid(bytes, selector, domain, window),
        FormatKind::Zarr => Err(HydroError::DataIntegrityError {
            message: "zarr grid extraction requires chunk-level orchestration".into(),
        }),
    }
}

/// Map a geographic window to an inclusive, bounds-clamped pixel window
/// under a grid projection.
fn pixel_window(grid: &dyn GridProjection, window: &BoundingBox, nx: usize, ny: usize) -> (u32, u32, u32, u32) {
    let (i0, j0) = grid.geo_to_grid(window.max_y, window.min_x);
    let (i1, j1) = grid.geo_to_grid(window.min_y, window.max_x);
    let col_start = i0.min(i1).floor().max(0.0) as u32;
    let row_start = j0.min(j1).floor().max(0.0) as u32;
    let col_end = (i0.max(i1).ceil().max(0.0) as u32 + 1).min(nx as u32);
    let row_end = (j0.max(j1).ceil().max(0.0) as u32 + 1).min(ny as u32);
    (col_start, row_start, col_end, row_end)
}

fn grib2_grid(bytes: &[u8], selector: &MessageSelector, domain: &BoundingBox, window: &BoundingBox) -> Result<GridResult, HydroError> {
    let (discipline, category, parameter) = match selector {
        MessageSelector::Grib2 {
            discipline,
            category,
            parameter,
        } => (*discipline, *category, *parameter),
        other => {
            return Err(HydroError::FormatParseError {
                source_id: "grib2".into(),
                message: format!("selector {other:?} is not a GRIB2 selector"),
            })
        }
    };

    let mut reader = grib2_parser::Grib2Reader::new(Bytes::copy_from_slice(bytes));
    let mut message = None;
    for parsed in reader.iter_messages() {
        let parsed = parsed.map_err(|e| HydroError::FormatParseError {
            source_id: "grib2".into(),
            message: e.to_string(),
        })?;
        if parsed.indicator.discipline == discipline
            && parsed.product_definition.parameter_category == category
            && parsed.product_definition.parameter_number == parameter
        {
            message = Some(parsed);
            break;
        }
    }
    let message = message.ok_or_else(|| HydroError::MessageNotFound {
        source_id: "grib2".into(),
        variable_id: format!("{discipline}/{category}/{parameter}"),
    })?;

    let (ny, nx) = message.grid_dims();
    let (nx, ny) = (nx as usize, ny as usize);
    let values = message.unpack_data().map_err(|e| HydroError::FormatParseError {
        source_id: "grib2".into(),
        message: e.to_string(),
    })?;
    let grid = implicit_grid(domain, nx, ny);
    Ok(slice_window(&values.into_iter().map(|v| v as f64).collect::<Vec<_>>(), &grid, window, nx, ny))
}

fn geotiff_grid(bytes: &[u8], window: &BoundingBox) -> Result<GridResult, HydroError> {
    let raster = geotiff_reader::GeoTiffRaster::open(bytes)?;
    let (c0, r0) = raster.transform.geo_to_pixel(window.min_x, window.max_y);
    let (c1, r1) = raster.transform.geo_to_pixel(window.max_x, window.min_y);
    let col_start = c0.min(c1).floor().max(0.0) as u32;
    let row_start = r0.min(r1).floor().max(0.0) as u32;
    let col_end = (c0.max(c1).ceil().max(0.0) as u32 + 1).min(raster.width);
    let row_end = (r0.max(r1).ceil().max(0.0) as u32 + 1).min(raster.height);
    let values = raster.read_window(col_start, row_start, col_end, row_end);
    Ok(GridResult {
        values,
        nx: (col_end - col_start) as usize,
        ny: (row_end - row_start) as usize,
    })
}

fn bil_grid(bytes: &[u8], window: &BoundingBox) -> Result<GridResult, HydroError> {
    let archive = archive_reader::extract_primary(bytes)?;
    let hdr_bytes = archive.sidecar("hdr").ok_or_else(|| HydroError::FormatParseError {
        source_id: "bil".into(),
        message: "archive has no .hdr sidecar".into(),
    })?;
    let hdr_text = std::str::from_utf8(hdr_bytes).map_err(|e| HydroError::FormatParseError {
        source_id: "bil".into(),
        message: e.to_string(),
    })?;
    let header = bil_reader::BilHeader::parse(hdr_text)?;
    let raster = bil_reader::BilRaster::open(header, &archive.primary_bytes)?;
    let (c0, r0) = raster.geo_to_pixel(window.min_x, window.max_y);
    let (c1, r1) = raster.geo_to_pixel(window.max_x, window.min_y);
    let col_start = c0.min(c1).floor().max(0.0) as u32;
    let row_start = r0.min(r1).floor().max(0.0) as u32;
    let col_end = (c0.max(c1).ceil().max(0.0) as u32 + 1).min(raster.header.ncols);
    let row_end = (r0.max(r1).ceil().max(0.0) as u32 + 1).min(raster.header.nrows);
    let values = raster.read_window(col_start, row_start, col_end, row_end);
    Ok(GridResult {
        values,
        nx: (col_end - col_start) as usize,
        ny: (row_end - row_start) as usize,
    })
}

fn netcdf_grid(bytes: &[u8], selector: &MessageSelector, domain: &BoundingBox, window: &BoundingBox) -> Result<GridResult, HydroError> {
    let var_name = match selector {
        MessageSelector::NetCdfVariable(name) => name.clone(),
        other => {
            return Err(HydroError::FormatParseError {
                source_id: "netcdf".into(),
                message: format!("selector {other:?} is not a NetCDF selector"),
            })
        }
    };

    let mut reader = netcdf_reader::NetCdfReader::open(bytes)?;
    let cooked = reader.read_cooked(&var_name)?;
    if cooked.shape.len() < 2 {
        return Err(HydroError::DataIntegrityError {
            message: format!("variable '{var_name}' has fewer than 2 dimensions"),
        });
    }
    let ny = cooked.shape[cooked.shape.len() - 2];
    let nx = cooked.shape[cooked.shape.len() - 1];
    let grid = implicit_grid(domain, nx, ny);
    Ok(slice_window(&cooked.values, &grid, window, nx, ny))
}

fn slice_window(values: &[f64], grid: &GeographicGrid, window: &BoundingBox, nx: usize, ny: usize) -> GridResult {
    let (col_start, row_start, col_end, row_end) = pixel_window(grid, window, nx, ny);
    let mut out = Vec::new();
    for row in row_start..row_end {
        for col in col_start..col_end {
            let idx = row as usize * nx + col as usize;
            out.push(values.get(idx).copied().unwrap_or(f64::NAN));
        }
    }
    GridResult {
        values: out,
        nx: (col_end - col_start) as usize,
        ny: (row_end - row_start) as usize,
    }
}

/// Build the regular lat/lon grid a source's declared domain implies over
/// an `nx`x`ny` array, north-first row order (the convention every format
/// decoder in this workspace already returns rows in).
pub(crate) fn implicit_grid(domain: &BoundingBox, nx: usize, ny: usize) -> GeographicGrid {
    let dlon = (domain.max_x - domain.min_x) / (nx.max(2) - 1) as f64;
    let dlat = (domain.max_y - domain.min_y) / (ny.max(2) - 1) as f64;
    GeographicGrid {
        first_lat: domain.max_y,
        first_lon: domain.min_x,
        dlat: -dlat,
        dlon,
        nx,
        ny,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn implicit_grid_maps_corners_to_edge_indices() {
        let domain = BoundingBox::new(-100.0, 30.0, -90.0, 40.0);
        let grid = implicit_grid(&domain, 11, 11);
        use projection::GridProjection;
        let (i, j) = grid.geo_to_grid(40.0, -100.0);
        assert!(i.abs() < 1e-9);
        assert!(j.abs() < 1e-9);
        let (i, j) = grid.geo_to_grid(30.0, -90.0);
        assert!((i - 10.0).abs() < 1e-9);
        assert!((j - 10.0).abs() < 1e-9);
    }

    #[test]
    fn geotiff_grid_clamps_window_to_raster_bounds() {
        use tiff::encoder::colortype::Gray32Float;
        use tiff::encoder::TiffEncoder;

        let grid_values = test_utils::generators::create_test_grid(4, 4);
        let mut bytes = std::io::Cursor::new(Vec::new());
        {
            let mut tiff = TiffEncoder::new(&mut bytes).unwrap();
            let mut image = tiff.new_image::<Gray32Float>(4, 4).unwrap();
            image
                .encoder()
                .write_tag(tiff::tags::Tag::ModelPixelScaleTag, &[1.0f64, 1.0, 0.0][..])
                .unwrap();
            image
                .encoder()
                .write_tag(
                    tiff::tags::Tag::ModelTiepointTag,
                    &[0.0f64, 0.0, 0.0, -100.0, 40.0, 0.0][..],
                )
                .unwrap();
            image.write_data(&grid_values).unwrap();
        }

        let window = BoundingBox::new(-1000.0, -1000.0, 1000.0, 1000.0);
        let result = geotiff_grid(&bytes.into_inner(), &window).unwrap();
        assert_eq!((result.nx, result.ny), (4, 4));
        assert_eq!(result.values.len(), 16);
    }
}

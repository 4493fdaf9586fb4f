//! Classic / 64-bit-offset NetCDF-3 reader.
//!
//! The pure-Rust `netcdf3` crate only reads from a filesystem path (the
//! NetCDF-3 format requires random access to compute variable offsets), so
//! fetched bytes are spooled to a temporary file before parsing — the same
//! approach the wider NetCDF ecosystem uses when data arrives over the
//! wire rather than already on disk. NetCDF-4 (HDF5-backed) files are out
//! of scope: they require native system libraries this workspace does not
//! carry.

use hydro_common::HydroError;
use netcdf3::{DataSet, DataVector, FileReader};
use std::io::Write;

/// A fetched-and-opened NetCDF-3 dataset.
pub struct NetCdfReader {
    reader: FileReader,
    _temp: tempfile::NamedTempFile,
}

/// A single variable's values after scale/offset/fill have been applied.
#[derive(Debug, Clone)]
pub struct CookedVariable {
    pub values: Vec<f64>,
    pub units: Option<String>,
    pub dims: Vec<String>,
    pub shape: Vec<usize>,
}

impl NetCdfReader {
    /// Parse NetCDF-3 bytes by spooling them to a temp file first.
    pub fn open(bytes: &[u8]) -> Result<Self, HydroError> {
        let mut temp = tempfile::NamedTempFile::new()?;
        temp.write_all(bytes)?;
        temp.flush()?;

        let reader = FileReader::open(temp.path()).map_err(|e| HydroError::FormatParseError {
            source_id: "netcdf".into(),
            message: e.to_string(),
        })?;

        Ok(Self { reader, _temp: temp })
    }

    pub fn data_set(&self) -> &DataSet {
        self.reader.data_set()
    }

    pub fn variable_names(&self) -> Vec<String> {
        self.reader.data_set().get_var_names()
    }

    /// Read a variable and apply its `scale_factor`/`add_offset`/`_FillValue`
    /// attributes: `cooked = raw * scale_factor + add_offset` unless
    /// `raw == fill_value`, in which case the cooked value is `NaN`.
    pub fn read_cooked(&mut self, var_name: &str) -> Result<CookedVariable, HydroError> {
        let data_set = self.reader.data_set();
        let var = data_set
            .get_var(var_name)
            .ok_or_else(|| HydroError::FormatParseError {
                source_id: "netcdf".into(),
                message: format!("variable '{var_name}' not found"),
            })?;

        let dims: Vec<String> = var.dim_names();
        let shape: Vec<usize> = var
            .dim_names()
            .iter()
            .filter_map(|d| data_set.dim_size(d))
            .collect();
        let units = data_set.get_var_attr_as_string(var_name, "units");

        let scale_factor = data_set
            .get_var_attr_f32(var_name, "scale_factor")
            .and_then(|v| v.first().copied())
            .or_else(|| {
                data_set
                    .get_var_attr_f64(var_name, "scale_factor")
                    .and_then(|v| v.first().copied().map(|x| x as f32))
            })
            .unwrap_or(1.0) as f64;
        let add_offset = data_set
            .get_var_attr_f32(var_name, "add_offset")
            .and_then(|v| v.first().copied())
            .or_else(|| {
                data_set
                    .get_var_attr_f64(var_name, "add_offset")
                    .and_then(|v| v.first().copied().map(|x| x as f32))
            })
            .unwrap_or(0.0) as f64;

        let raw = self
            .reader
            .read_var(var_name)
            .map_err(|e| HydroError::FormatParseError {
                source_id: "netcdf".into(),
                message: e.to_string(),
            })?;

        let fill_value = fill_value_for(&self.reader, var_name, &raw);
        let raw_f64 = data_vector_to_f64(&raw);

        let values = raw_f64
            .into_iter()
            .map(|raw_v| match fill_value {
                Some(fill) if (raw_v - fill).abs() < f64::EPSILON => f64::NAN,
                _ => raw_v * scale_factor + add_offset,
            })
            .collect();

        Ok(CookedVariable {
            values,
            units,
            dims,
            shape,
        })
    }
}

fn fill_value_for(reader: &FileReader, var_name: &str, raw: &DataVector) -> Option<f64> {
    let ds = reader.data_set();
    if let Some(v) = ds.get_var_attr_f64(var_name, "_FillValue").and_then(|v| v.first().copied()) {
        return Some(v);
    }
    if let Some(v) = ds.get_var_attr_f32(var_name, "_FillValue").and_then(|v| v.first().copied()) {
        return Some(v as f64);
    }
    // Fall back to the NetCDF default fill value for the variable's storage type.
    match raw {
        DataVector::F32(_) => Some(netcdf3::NC_FILL_F32 as f64),
        DataVector::F64(_) => Some(netcdf3::NC_FILL_F64),
        DataVector::I32(_) => Some(netcdf3::NC_FILL_I32 as f64),
        DataVector::I16(_) => Some(netcdf3::NC_FILL_I16 as f64),
        DataVector::I8(_) => Some(netcdf3::NC_FILL_I8 as f64),
        DataVector::U8(_) => Some(netcdf3::NC_FILL_U8 as f64),
    }
}

fn data_vector_to_f64(v: &DataVector) -> Vec<f64> {
    match v {
        DataVector::F64(vals) => vals.clone(),
        DataVector::F32(vals) => vals.iter().map(|x| *x as f64).collect(),
        DataVector::I32(vals) => vals.iter().map(|x| *x as f64).collect(),
        DataVector::I16(vals) => vals.iter().map(|x| *x as f64).collect(),
        DataVector::I8(vals) => vals.iter().map(|x| *x as f64).collect(),
        DataVector::U8(vals) => vals.iter().map(|x| *x as f64).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netcdf3::{FileWriter, Version};

    fn sample_bytes() -> Vec<u8> {
        let mut ds = DataSet::new();
        ds.add_fixed_dim("x", 3).unwrap();
        ds.add_var_f32("temp", &["x"]).unwrap();
        ds.add_var_attr_f32("temp", "scale_factor", vec![0.1]).unwrap();
        ds.add_var_attr_f32("temp", "add_offset", vec![273.0]).unwrap();
        ds.add_var_attr_string("temp", "units", "K").unwrap();

        let tmp = tempfile::NamedTempFile::new().unwrap();
        let mut writer = FileWriter::open(tmp.path()).unwrap();
        writer.set_def(&ds, Version::Classic, 0).unwrap();
        writer.write_var_f32("temp", &[1.0f32, 2.0, 3.0]).unwrap();
        writer.close().unwrap();
        std::fs::read(tmp.path()).unwrap()
    }

    #[test]
    fn reads_and_applies_scale_and_offset() {
        let bytes = sample_bytes();
        let mut reader = NetCdfReader::open(&bytes).unwrap();
        let cooked = reader.read_cooked("temp").unwrap();
        assert_eq!(cooked.units.as_deref(), Some("K"));
        assert!((cooked.values[0] - 273.1).abs() < 1e-6);
        assert!((cooked.values[2] - 273.3).abs() < 1e-6);
    }
}

//! Zarr V2 array reader: `.zarray`/`.zattrs` sidecar parsing, chunk
//! addressing, and typed decode.
//!
//! A Zarr array is a directory of chunk files named by their chunk
//! coordinates (`.zarray`'s `dimension_separator`, default `.`) plus two
//! JSON sidecars. Chunk bytes are handed to `decompress` the same way
//! GRIB2 section 7 payloads are, then interpreted per `.zarray`'s
//! `dtype` (NumPy type-string convention: endianness, kind, byte width).

use decompress::{decode_with_hint, Codec};
use hydro_common::HydroError;
use serde::Deserialize;
use serde_json::Value;

/// Compression codec named in `.zarray`'s `compressor.id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compressor {
    Zlib,
    Gzip,
    Blosc,
    Zstd,
    None,
}

impl Compressor {
    fn to_codec(self) -> Codec {
        match self {
            Compressor::Zlib => Codec::Zlib,
            Compressor::Gzip => Codec::Gzip,
            Compressor::Blosc => Codec::Blosc,
            Compressor::Zstd => Codec::Zstd,
            Compressor::None => Codec::None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawCompressor {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RawZarray {
    shape: Vec<usize>,
    chunks: Vec<usize>,
    dtype: String,
    compressor: Option<RawCompressor>,
    fill_value: Option<Value>,
    #[serde(default = "default_separator")]
    dimension_separator: String,
}

fn default_separator() -> String {
    ".".to_string()
}

/// Parsed `.zarray` metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ZarrArrayMeta {
    pub shape: Vec<usize>,
    pub chunks: Vec<usize>,
    pub dtype: DType,
    pub compressor: Compressor,
    pub fill_value: Option<f64>,
    pub dimension_separator: char,
}

/// A parsed NumPy-style type string, e.g. `<f4`, `|u1`, `>i2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DType {
    pub big_endian: bool,
    pub kind: char,
    pub byte_width: usize,
}

impl ZarrArrayMeta {
    /// Parse a `.zarray` JSON document.
    pub fn parse(json: &str) -> Result<Self, HydroError> {
        let raw: RawZarray = serde_json::from_str(json).map_err(|e| parse_err(e.to_string()))?;

        let dtype = parse_dtype(&raw.dtype)?;
        let compressor = match raw.compressor {
            None => Compressor::None,
            Some(c) => match c.id.as_str() {
                "zlib" => Compressor::Zlib,
                "gzip" => Compressor::Gzip,
                "blosc" => Compressor::Blosc,
                "zstd" => Compressor::Zstd,
                other => {
                    return Err(HydroError::FormatParseError {
                        source_id: "zarr".into(),
                        message: format!("unsupported compressor id '{other}'"),
                    })
                }
            },
        };
        let fill_value = raw.fill_value.as_ref().and_then(value_as_f64);
        let dimension_separator = raw.dimension_separator.chars().next().unwrap_or('.');

        Ok(Self {
            shape: raw.shape,
            chunks: raw.chunks,
            dtype,
            compressor,
            fill_value,
            dimension_separator,
        })
    }

    /// Number of chunks along each dimension, rounding up for a ragged
    /// final chunk.
    pub fn chunk_grid_shape(&self) -> Vec<usize> {
        self.shape
            .iter()
            .zip(self.chunks.iter())
            .map(|(dim, chunk)| dim.div_ceil(*chunk))
            .collect()
    }

    /// Decompress and typed-decode one chunk's raw bytes into `f64`s, in
    /// the chunk's own C-order.
    pub fn decode_chunk(&self, raw: &[u8]) -> Result<Vec<f64>, HydroError> {
        let decompressed = decode_with_hint(raw, self.compressor.to_codec())?;
        decode_typed(&decompressed, self.dtype)
    }

    /// Apply `.zattrs`-derived scale/offset/fill to a raw decoded value.
    pub fn apply_attrs(&self, raw: f64, attrs: &ZarrAttrs) -> f64 {
        let fill = attrs.fill_value.or(self.fill_value);
        if let Some(fill) = fill {
            if (raw - fill).abs() < f64::EPSILON {
                return f64::NAN;
            }
        }
        raw * attrs.scale_factor + attrs.add_offset
    }
}

fn value_as_f64(value: &Value) -> Option<f64> {
    value.as_f64()
}

fn parse_dtype(dtype: &str) -> Result<DType, HydroError> {
    let mut chars = dtype.chars();
    let first = chars.next().ok_or_else(|| parse_err("empty dtype string".into()))?;
    let (big_endian, kind, rest): (bool, char, &str) = match first {
        '<' => (false, chars.next().ok_or_else(|| parse_err("truncated dtype".into()))?, &dtype[2..]),
        '>' => (true, chars.next().ok_or_else(|| parse_err("truncated dtype".into()))?, &dtype[2..]),
        '|' => (false, chars.next().ok_or_else(|| parse_err("truncated dtype".into()))?, &dtype[2..]),
        other => (false, other, &dtype[1..]),
    };
    let byte_width: usize = rest.parse().map_err(|_| parse_err(format!("invalid dtype width in '{dtype}'")))?;
    Ok(DType {
        big_endian,
        kind,
        byte_width,
    })
}

fn decode_typed(bytes: &[u8], dtype: DType) -> Result<Vec<f64>, HydroError> {
    if bytes.len() % dtype.byte_width != 0 {
        return Err(HydroError::DataIntegrityError {
            message: format!(
                "chunk byte length {} is not a multiple of dtype width {}",
                bytes.len(),
                dtype.byte_width
            ),
        });
    }
    bytes
        .chunks_exact(dtype.byte_width)
        .map(|chunk| decode_one(chunk, dtype))
        .collect()
}

fn decode_one(chunk: &[u8], dtype: DType) -> Result<f64, HydroError> {
    macro_rules! read {
        ($ty:ty, $len:expr) => {{
            let mut buf = [0u8; $len];
            buf.copy_from_slice(chunk);
            (if dtype.big_endian {
                <$ty>::from_be_bytes(buf)
            } else {
                <$ty>::from_le_bytes(buf)
            }) as f64
        }};
    }

    Ok(match (dtype.kind, dtype.byte_width) {
        ('f', 4) => read!(f32, 4),
        ('f', 8) => read!(f64, 8),
        ('i', 1) => chunk[0] as i8 as f64,
        ('i', 2) => read!(i16, 2),
        ('i', 4) => read!(i32, 4),
        ('i', 8) => read!(i64, 8),
        ('u', 1) => chunk[0] as f64,
        ('u', 2) => read!(u16, 2),
        ('u', 4) => read!(u32, 4),
        ('u', 8) => read!(u64, 8),
        (kind, width) => {
            return Err(HydroError::FormatParseError {
                source_id: "zarr".into(),
                message: format!("unsupported dtype kind '{kind}' width {width}"),
            })
        }
    })
}

/// Cooking attributes from `.zattrs` (CF-convention variable attributes).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZarrAttrs {
    pub scale_factor: f64,
    pub add_offset: f64,
    pub fill_value: Option<f64>,
}

impl Default for ZarrAttrs {
    fn default() -> Self {
        Self {
            scale_factor: 1.0,
            add_offset: 0.0,
            fill_value: None,
        }
    }
}

impl ZarrAttrs {
    /// Parse a `.zattrs` JSON document, defaulting any missing CF
    /// attribute (no `_FillValue`/`scale_factor` is a valid, common case).
    pub fn parse(json: &str) -> Result<Self, HydroError> {
        let value: Value = serde_json::from_str(json).map_err(|e| parse_err(e.to_string()))?;
        let obj = value.as_object();
        let get_f64 = |key: &str| obj.and_then(|o| o.get(key)).and_then(Value::as_f64);
        Ok(Self {
            scale_factor: get_f64("scale_factor").unwrap_or(1.0),
            add_offset: get_f64("add_offset").unwrap_or(0.0),
            fill_value: get_f64("_FillValue"),
        })
    }
}

/// The zero-padded chunk key for a set of chunk-grid coordinates, per the
/// Zarr V2 convention (e.g. `[1, 2]` with separator `.` → `"1.2"`).
pub fn chunk_key(chunk_indices: &[usize], separator: char) -> String {
    chunk_indices
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(&separator.to_string())
}

/// Split an array-wide element coordinate into its chunk-grid index and
/// the offset within that chunk.
pub fn nd_index_to_chunk(coord: &[usize], chunk_shape: &[usize]) -> (Vec<usize>, Vec<usize>) {
    coord
        .iter()
        .zip(chunk_shape.iter())
        .map(|(c, shape)| (c / shape, c % shape))
        .unzip()
}

/// Flat, C-order index of `within_chunk` inside a chunk shaped
/// `chunk_shape`, or `None` if any axis is out of range.
pub fn flat_index_in_chunk(within_chunk: &[usize], chunk_shape: &[usize]) -> Option<usize> {
    if within_chunk.len() != chunk_shape.len() {
        return None;
    }
    let mut index = 0usize;
    for (i, shape) in within_chunk.iter().zip(chunk_shape.iter()) {
        if i >= shape {
            return None;
        }
        index = index * shape + i;
    }
    Some(index)
}

fn parse_err(message: String) -> HydroError {
    HydroError::FormatParseError {
        source_id: "zarr".into(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const ZARRAY_JSON: &str = r#"{
        "shape": [4, 4],
        "chunks": [2, 2],
        "dtype": "<f4",
        "compressor": {"id": "gzip"},
        "fill_value": -9999.0,
        "order": "C",
        "zarr_format": 2,
        "dimension_separator": "."
    }"#;

    #[test]
    fn parses_zarray_metadata() {
        let meta = ZarrArrayMeta::parse(ZARRAY_JSON).unwrap();
        assert_eq!(meta.shape, vec![4, 4]);
        assert_eq!(meta.chunks, vec![2, 2]);
        assert_eq!(meta.dtype, DType { big_endian: false, kind: 'f', byte_width: 4 });
        assert_eq!(meta.compressor, Compressor::Gzip);
        assert_eq!(meta.fill_value, Some(-9999.0));
        assert_eq!(meta.chunk_grid_shape(), vec![2, 2]);
    }

    #[test]
    fn decodes_gzip_compressed_chunk() {
        let meta = ZarrArrayMeta::parse(ZARRAY_JSON).unwrap();
        let values: [f32; 4] = [1.0, 2.0, 3.0, -9999.0];
        let raw: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();

        let mut enc = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        enc.write_all(&raw).unwrap();
        let compressed = enc.finish().unwrap();

        let decoded = meta.decode_chunk(&compressed).unwrap();
        assert_eq!(decoded, vec![1.0, 2.0, 3.0, -9999.0]);

        let attrs = ZarrAttrs::default();
        assert!(meta.apply_attrs(decoded[3], &attrs).is_nan());
        assert_eq!(meta.apply_attrs(decoded[0], &attrs), 1.0);
    }

    #[test]
    fn parses_zattrs_scale_and_offset() {
        let attrs = ZarrAttrs::parse(r#"{"scale_factor": 0.1, "add_offset": 273.15}"#).unwrap();
        assert_eq!(attrs.scale_factor, 0.1);
        assert_eq!(attrs.add_offset, 273.15);
        assert_eq!(attrs.fill_value, None);
    }

    #[test]
    fn chunk_key_joins_with_separator() {
        assert_eq!(chunk_key(&[1, 2, 3], '.'), "1.2.3");
        assert_eq!(chunk_key(&[0, 5], '/'), "0/5");
    }

    #[test]
    fn nd_index_splits_into_chunk_and_offset() {
        let (chunk_idx, within) = nd_index_to_chunk(&[3, 5], &[2, 2]);
        assert_eq!(chunk_idx, vec![1, 2]);
        assert_eq!(within, vec![1, 1]);
        assert_eq!(flat_index_in_chunk(&within, &[2, 2]), Some(3));
    }
}

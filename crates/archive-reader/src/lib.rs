//! ZIP archive reading: primary-member selection and sidecar metadata.
//!
//! Some sources (PRISM BIL bundles, certain GeoTIFF distributions) ship a
//! ZIP containing the raster plus its sidecars (`.hdr`, `.prj`, `.stx`).
//! This crate locates the "primary" raster member by extension preference
//! and returns it alongside whatever sidecars were bundled, so
//! `bil-reader`/`geotiff-reader` never need to know they were handed a
//! ZIP in the first place.

use std::io::{Cursor, Read};

use hydro_common::HydroError;
use zip::ZipArchive;

/// Extensions considered "primary" raster members, in preference order:
/// a `.tif` is chosen over a `.bil` if an archive somehow contains both.
const PRIMARY_EXTENSIONS: &[&str] = &["tif", "tiff", "bil"];

/// Extensions treated as sidecar metadata worth surfacing to the caller.
const SIDECAR_EXTENSIONS: &[&str] = &["hdr", "prj", "stx", "xml"];

/// The primary raster member plus any sidecar files found alongside it.
pub struct ExtractedArchive {
    pub primary_name: String,
    pub primary_bytes: Vec<u8>,
    pub sidecars: Vec<(String, Vec<u8>)>,
}

impl ExtractedArchive {
    /// Look up a sidecar by extension (case-insensitive), e.g. `"hdr"`.
    pub fn sidecar(&self, extension: &str) -> Option<&[u8]> {
        self.sidecars
            .iter()
            .find(|(name, _)| extension_of(name).as_deref() == Some(extension))
            .map(|(_, bytes)| bytes.as_slice())
    }
}

/// Open a ZIP archive from bytes and extract the primary raster member
/// plus its sidecars.
pub fn extract_primary(bytes: &[u8]) -> Result<ExtractedArchive, HydroError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(|e| zip_err(e.to_string()))?;

    let primary_name = select_primary_name(&archive).ok_or_else(|| HydroError::FormatParseError {
        source_id: "archive".into(),
        message: "no primary raster member (.tif/.tiff/.bil) found in archive".into(),
    })?;

    let primary_bytes = read_member(&mut archive, &primary_name)?;

    let mut sidecars = Vec::new();
    let sidecar_names: Vec<String> = archive
        .file_names()
        .filter(|name| {
            extension_of(name)
                .map(|ext| SIDECAR_EXTENSIONS.contains(&ext.as_str()))
                .unwrap_or(false)
        })
        .map(|s| s.to_string())
        .collect();
    for name in sidecar_names {
        let bytes = read_member(&mut archive, &name)?;
        sidecars.push((name, bytes));
    }

    Ok(ExtractedArchive {
        primary_name,
        primary_bytes,
        sidecars,
    })
}

fn select_primary_name<R: Read + std::io::Seek>(archive: &ZipArchive<R>) -> Option<String> {
    PRIMARY_EXTENSIONS.iter().find_map(|wanted| {
        archive
            .file_names()
            .find(|name| extension_of(name).as_deref() == Some(*wanted))
            .map(|s| s.to_string())
    })
}

fn read_member<R: Read + std::io::Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Vec<u8>, HydroError> {
    let mut file = archive.by_name(name).map_err(|e| zip_err(e.to_string()))?;
    let mut buf = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut buf)
        .map_err(|e| HydroError::FormatParseError {
            source_id: "archive".into(),
            message: format!("failed to read member {name}: {e}"),
        })?;
    Ok(buf)
}

fn extension_of(name: &str) -> Option<String> {
    name.rsplit('.').next().map(|ext| ext.to_ascii_lowercase())
}

fn zip_err(message: String) -> HydroError {
    HydroError::FormatParseError {
        source_id: "archive".into(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    fn sample_zip() -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut writer = ZipWriter::new(&mut buf);
            let options = FileOptions::default();
            writer.start_file("prism_tmax.bil", options).unwrap();
            writer.write_all(b"raw-pixel-bytes").unwrap();
            writer.start_file("prism_tmax.hdr", options).unwrap();
            writer.write_all(b"NROWS 2\nNCOLS 2\n").unwrap();
            writer.start_file("prism_tmax.prj", options).unwrap();
            writer.write_all(b"PROJCS[...]").unwrap();
            writer.finish().unwrap();
        }
        buf.into_inner()
    }

    #[test]
    fn selects_primary_member_by_extension() {
        let extracted = extract_primary(&sample_zip()).unwrap();
        assert_eq!(extracted.primary_name, "prism_tmax.bil");
        assert_eq!(extracted.primary_bytes, b"raw-pixel-bytes");
    }

    #[test]
    fn collects_sidecar_members() {
        let extracted = extract_primary(&sample_zip()).unwrap();
        assert_eq!(extracted.sidecar("hdr"), Some(&b"NROWS 2\nNCOLS 2\n"[..]));
        assert_eq!(extracted.sidecar("prj"), Some(&b"PROJCS[...]"[..]));
        assert_eq!(extracted.sidecar("stx"), None);
    }

    #[test]
    fn prefers_tif_over_bil_when_both_present() {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut writer = ZipWriter::new(&mut buf);
            let options = FileOptions::default();
            writer.start_file("a.bil", options).unwrap();
            writer.write_all(b"bil-bytes").unwrap();
            writer.start_file("a.tif", options).unwrap();
            writer.write_all(b"tif-bytes").unwrap();
            writer.finish().unwrap();
        }
        let extracted = extract_primary(&buf.into_inner()).unwrap();
        assert_eq!(extracted.primary_name, "a.tif");
    }
}

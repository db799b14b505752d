//! Reading converted scores, plain or compressed (.mxl).
//!
//! An .mxl file is a ZIP archive containing:
//!   - META-INF/container.xml: declares the root MusicXML file path
//!   - <rootfile>.xml: the MusicXML content (e.g., score.xml)
//!   - optionally images, sounds and other files

use std::io::{Cursor, Read};
use std::path::Path;

use zip::ZipArchive;

use crate::error::DataError;

/// Read the MusicXML text of a score file.
/// - `.mxl` → compressed MXL (ZIP archive)
/// - anything else → uncompressed MusicXML
pub fn read_score_xml<P: AsRef<Path>>(path: P) -> Result<String, DataError> {
    let path = path.as_ref();
    let data = std::fs::read(path)
        .map_err(|e| DataError::IoError(format!("failed to read '{}': {e}", path.display())))?;

    match path.extension().and_then(|e| e.to_str()) {
        Some("mxl") => extract_musicxml_from_mxl(&data),
        _ => String::from_utf8(data)
            .map_err(|e| DataError::ParsingError(format!("invalid UTF-8 in MusicXML file: {e}"))),
    }
}

/// Extract the MusicXML content string from .mxl bytes.
pub fn extract_musicxml_from_mxl(data: &[u8]) -> Result<String, DataError> {
    let mut archive = ZipArchive::new(Cursor::new(data))?;

    let root_file_path = read_container_xml(&mut archive)?;

    let mut root_file = archive.by_name(&root_file_path).map_err(|e| {
        DataError::ArchiveError(format!("root file '{root_file_path}' not found in archive: {e}"))
    })?;
    let mut xml = String::new();
    root_file
        .read_to_string(&mut xml)
        .map_err(|e| DataError::ArchiveError(format!("failed to read '{root_file_path}': {e}")))?;

    Ok(xml)
}

/// Find the root MusicXML file: declared in META-INF/container.xml, or else
/// the first .xml/.musicxml entry outside META-INF.
fn read_container_xml(archive: &mut ZipArchive<Cursor<&[u8]>>) -> Result<String, DataError> {
    let container_xml = match archive.by_name("META-INF/container.xml") {
        Ok(mut container_file) => {
            let mut xml = String::new();
            container_file.read_to_string(&mut xml)?;
            Some(xml)
        }
        Err(_) => None,
    }; // mutable borrow of archive is released here

    if let Some(xml) = container_xml {
        let doc = roxmltree::Document::parse(&xml)
            .map_err(|e| DataError::ParsingError(format!("failed to parse container.xml: {e}")))?;
        return doc
            .descendants()
            .filter(|n| n.tag_name().name() == "rootfile")
            .find_map(|n| n.attribute("full-path"))
            .map(str::to_string)
            .ok_or_else(|| DataError::ArchiveError("no rootfile in container.xml".to_string()));
    }

    let names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names
        .iter()
        .find(|name| {
            !name.starts_with("META-INF/") && (name.ends_with(".xml") || name.ends_with(".musicxml"))
        })
        .cloned()
        .ok_or_else(|| {
            DataError::ArchiveError(format!("no MusicXML file found in archive, files: {names:?}"))
        })
}

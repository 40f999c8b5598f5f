use super::types::{FileError, FileType};
use std::path::Path;

pub fn file_type_from_path(path: &Path) -> Result<FileType, FileError> {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match ext.as_deref() {
        Some("nc") => Ok(FileType::NetCDF),
        Some("tif") | Some("tiff") => Ok(FileType::GeoTiff),
        Some("shp") => Ok(FileType::Shapefile),
        Some("geojson") | Some("json") => Ok(FileType::GeoJson),
        Some("gpkg") => Ok(FileType::GeoPackage),
        _ => Err(FileError::UnknownFileType(path.display().to_string())),
    }
}

pub fn require_gridded(path: &Path) -> Result<FileType, FileError> {
    match file_type_from_path(path)? {
        FileType::NetCDF => Ok(FileType::NetCDF),
        found => Err(FileError::WrongKind {
            path: path.display().to_string(),
            found,
            expected: "NetCDF dataset",
        }),
    }
}

pub fn require_boundary(path: &Path) -> Result<FileType, FileError> {
    let found = file_type_from_path(path)?;
    if found.is_vector() {
        Ok(found)
    } else {
        Err(FileError::WrongKind {
            path: path.display().to_string(),
            found,
            expected: "vector boundary file",
        })
    }
}

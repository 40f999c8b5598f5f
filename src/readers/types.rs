use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::time_index::{TimeAxis, TimeAxisError};

pub trait TimeAxisReader {
    fn read_time_axis(&self, source: &GriddedSource) -> Result<TimeAxis, ReadError>;
}

#[derive(Error, Debug)]
pub enum ReadError {
    #[error("GDAL error reading {path}: {source}")]
    Gdal {
        path: String,
        #[source]
        source: gdal::errors::GdalError,
    },

    #[error("{path} has no time dimension for variable '{variable}'")]
    MissingTimeDimension { path: String, variable: String },

    #[error("unsupported time units '{0}', expected seconds since 1970-01-01")]
    UnsupportedUnits(String),

    #[error("malformed time axis: {0}")]
    TimeAxis(#[from] TimeAxisError),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FileError {
    #[error("unknown file type: {0}")]
    UnknownFileType(String),

    #[error("{path} is a {found} file, expected {expected}")]
    WrongKind {
        path: String,
        found: FileType,
        expected: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    NetCDF,
    GeoTiff,
    Shapefile,
    GeoJson,
    GeoPackage,
}

impl FileType {
    pub fn is_vector(&self) -> bool {
        matches!(
            self,
            FileType::Shapefile | FileType::GeoJson | FileType::GeoPackage
        )
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FileType::NetCDF => "NetCDF",
            FileType::GeoTiff => "GeoTIFF",
            FileType::Shapefile => "Shapefile",
            FileType::GeoJson => "GeoJSON",
            FileType::GeoPackage => "GeoPackage",
        };
        write!(f, "{}", name)
    }
}

/// A data variable inside a gridded (multi-dimensional) dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GriddedSource {
    pub path: PathBuf,
    pub variable: String,
}

impl GriddedSource {
    pub fn new<P: AsRef<Path>>(path: P, variable: &str) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            variable: variable.to_string(),
        }
    }

    /// Path GDAL opens to reach the variable, `NETCDF:"file.nc":sst` for NetCDF.
    pub fn gdal_path(&self) -> String {
        let path = self.path.to_string_lossy();
        if path.ends_with(".nc") {
            format!("NETCDF:\"{}\":{}", path, self.variable)
        } else {
            path.to_string()
        }
    }
}

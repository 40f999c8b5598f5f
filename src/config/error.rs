use thiserror::Error;

use crate::readers::FileError;
use crate::time_index::TimeAxisError;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid months: {0}")]
    Months(#[from] TimeAxisError),

    #[error("Invalid input file: {0}")]
    File(#[from] FileError),

    #[error("variable name cannot be empty")]
    EmptyVariable,

    #[error("at least one area is required")]
    NoAreas,

    #[error("area #{0} has an empty output_name")]
    EmptyOutputName(usize),

    #[error("output_name '{0}' must not contain path separators")]
    InvalidOutputName(String),

    #[error("output_name '{0}' is used by more than one area")]
    DuplicateOutputName(String),

    #[error("composite_name '{0}' must be a GeoTIFF file name")]
    InvalidCompositeName(String),

    #[error("output file '{file}' would be written by both {first} and {second}")]
    OutputCollision {
        file: String,
        first: String,
        second: String,
    },
}

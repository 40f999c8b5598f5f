use thiserror::Error;

use crate::config::ConfigError;
use crate::extraction::AreaFailure;
use crate::readers::ReadError;
use crate::table::{AlignmentError, TableError};
use crate::time_index::TimeAxisError;
use crate::toolbox::ToolboxError;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Time axis error: {0}")]
    TimeAxis(#[from] TimeAxisError),

    #[error("Read error: {0}")]
    Read(#[from] ReadError),

    #[error("Table error: {0}")]
    Table(#[from] TableError),

    #[error("Column alignment error: {0}")]
    Alignment(#[from] AlignmentError),

    #[error(transparent)]
    Toolbox(#[from] ToolboxError),

    #[error("no time step of the dataset falls in months {0}")]
    NoMatchingMonths(String),

    #[error("{} of {total} areas failed: {}", .failures.len(), failed_names(.failures))]
    AreasFailed {
        total: usize,
        failures: Vec<AreaFailure>,
    },
}

fn failed_names(failures: &[AreaFailure]) -> String {
    failures
        .iter()
        .map(|f| f.output_name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, ExtractError>;

use gdal::errors::GdalError;
use std::fmt;
use thiserror::Error;

use crate::table::TableError;

/// The external geospatial operations the extraction relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    MakeLayer,
    CompositeBands,
    MaskByBoundary,
    RasterToPoints,
    SampleToPoints,
    TableExport,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::MakeLayer => "make-layer",
            Operation::CompositeBands => "composite-bands",
            Operation::MaskByBoundary => "mask-by-boundary",
            Operation::RasterToPoints => "raster-to-points",
            Operation::SampleToPoints => "sample-to-points",
            Operation::TableExport => "table-export",
        };
        write!(f, "{}", name)
    }
}

#[derive(Error, Debug)]
pub enum ToolboxError {
    #[error("{operation} failed: {source}")]
    Gdal {
        operation: Operation,
        #[source]
        source: GdalError,
    },

    #[error("{operation} failed: {source}")]
    Table {
        operation: Operation,
        #[source]
        source: TableError,
    },

    #[error("{operation} failed: {message}")]
    Failed {
        operation: Operation,
        message: String,
    },

    #[error("{0} requested while the toolbox session is not checked out")]
    NotCheckedOut(Operation),

    #[error("toolbox check-out failed: {0}")]
    CheckOut(String),
}

impl ToolboxError {
    pub fn failed(operation: Operation, message: impl Into<String>) -> Self {
        ToolboxError::Failed {
            operation,
            message: message.into(),
        }
    }

    /// The operation that raised the error, if any.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            ToolboxError::Gdal { operation, .. }
            | ToolboxError::Table { operation, .. }
            | ToolboxError::Failed { operation, .. } => Some(*operation),
            ToolboxError::NotCheckedOut(operation) => Some(*operation),
            ToolboxError::CheckOut(_) => None,
        }
    }
}

/// Tags a lower-level error with the operation it happened in.
pub trait OperationContext<T> {
    fn during(self, operation: Operation) -> Result<T, ToolboxError>;
}

impl<T> OperationContext<T> for Result<T, GdalError> {
    fn during(self, operation: Operation) -> Result<T, ToolboxError> {
        self.map_err(|source| ToolboxError::Gdal { operation, source })
    }
}

impl<T> OperationContext<T> for Result<T, TableError> {
    fn during(self, operation: Operation) -> Result<T, ToolboxError> {
        self.map_err(|source| ToolboxError::Table { operation, source })
    }
}

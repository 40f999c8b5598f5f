use std::path::PathBuf;

use log::{error, info, warn};

use crate::error::ExtractError;

/// Final table written for one area.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaOutput {
    pub output_name: String,
    pub csv: PathBuf,
    pub rows: usize,
    pub columns: Vec<String>,
}

#[derive(Debug)]
pub struct AreaFailure {
    pub output_name: String,
    pub error: ExtractError,
}

/// Outcome of a run: every area either produced an output or failed.
#[derive(Debug)]
pub struct RunReport {
    pub composite: PathBuf,
    pub labels: Vec<String>,
    pub outputs: Vec<AreaOutput>,
    pub failures: Vec<AreaFailure>,
}

impl RunReport {
    pub fn new(composite: PathBuf, labels: Vec<String>) -> Self {
        Self {
            composite,
            labels,
            outputs: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn total(&self) -> usize {
        self.outputs.len() + self.failures.len()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn log_summary(&self) {
        if self.is_success() {
            info!(
                "{} of {} areas written ({} month layers)",
                self.outputs.len(),
                self.total(),
                self.labels.len()
            );
        } else {
            warn!(
                "{} of {} areas written, {} failed ({} month layers)",
                self.outputs.len(),
                self.total(),
                self.failures.len(),
                self.labels.len()
            );
        }
        for output in &self.outputs {
            info!(
                "  {}: {} points -> {}",
                output.output_name,
                output.rows,
                output.csv.display()
            );
        }
        for failure in &self.failures {
            error!("  {}: {}", failure.output_name, failure.error);
        }
    }

    /// Fails with every area failure if any area failed.
    pub fn into_result(self) -> Result<Vec<AreaOutput>, ExtractError> {
        if self.failures.is_empty() {
            Ok(self.outputs)
        } else {
            Err(ExtractError::AreasFailed {
                total: self.total(),
                failures: self.failures,
            })
        }
    }
}

//! Point attribute tables and their delimited-text form.

use std::path::Path;

use log::debug;
use thiserror::Error;

/// Identifier columns that precede the per-layer value columns of a sampled
/// point table.
pub const ID_COLUMNS: [&str; 3] = ["FID", "pointid", "grid_code"];

/// Position of the first value column.
pub const VALUE_COLUMN_OFFSET: usize = ID_COLUMNS.len();

#[derive(Error, Debug)]
pub enum TableError {
    #[error("CSV error on {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("row {row} has {found} fields, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AlignmentError {
    #[error("table has {found} columns, fewer than the {offset} identifier columns")]
    MissingIdColumns { offset: usize, found: usize },

    #[error("table has {found} value columns but {expected} month labels were selected")]
    ColumnCount { expected: usize, found: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl AttributeTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) -> Result<(), TableError> {
        if row.len() != self.columns.len() {
            return Err(TableError::RowWidth {
                row: self.rows.len(),
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Renames the block of columns starting at `offset`, positionally.
    ///
    /// The block must hold exactly `labels.len()` columns; the table is left
    /// untouched otherwise.
    pub fn relabel_value_columns(
        &mut self,
        offset: usize,
        labels: &[String],
    ) -> Result<(), AlignmentError> {
        if self.columns.len() < offset {
            return Err(AlignmentError::MissingIdColumns {
                offset,
                found: self.columns.len(),
            });
        }

        let found = self.columns.len() - offset;
        if found != labels.len() {
            return Err(AlignmentError::ColumnCount {
                expected: labels.len(),
                found,
            });
        }

        for (column, label) in self.columns[offset..].iter_mut().zip(labels) {
            debug!("Renaming column {} -> {}", column, label);
            *column = label.clone();
        }

        Ok(())
    }
}

fn csv_err(path: &Path) -> impl Fn(csv::Error) -> TableError + '_ {
    move |source| TableError::Csv {
        path: path.display().to_string(),
        source,
    }
}

pub fn write_csv<P: AsRef<Path>>(table: &AttributeTable, path: P) -> Result<(), TableError> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path).map_err(csv_err(path))?;

    writer.write_record(&table.columns).map_err(csv_err(path))?;
    for row in &table.rows {
        writer.write_record(row).map_err(csv_err(path))?;
    }
    writer
        .flush()
        .map_err(|e| csv_err(path)(csv::Error::from(e)))?;

    debug!(
        "Wrote {} rows x {} columns to {}",
        table.len(),
        table.columns.len(),
        path.display()
    );
    Ok(())
}

pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<AttributeTable, TableError> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(csv_err(path))?;

    let columns: Vec<String> = reader
        .headers()
        .map_err(csv_err(path))?
        .iter()
        .map(String::from)
        .collect();

    let mut table = AttributeTable::new(columns);
    for record in reader.records() {
        let record = record.map_err(csv_err(path))?;
        table.push_row(record.iter().map(String::from).collect())?;
    }

    Ok(table)
}

//! Feature table: the uploaded CSV as ordered rows of typed cells.
//!
//! Column names, count and order come from the upload itself; nothing here
//! checks them against what a classifier expects.

mod csv_io;
mod value;

pub use value::Value;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("No columns to parse from file")]
    NoColumns,
    #[error("Error tokenizing data. Expected {expected} fields in line {line}, saw {found}")]
    TooManyFields { line: u64, expected: usize, found: usize },
    #[error("row {row} has {found} values, table has {expected} columns")]
    RowWidth { row: usize, expected: usize, found: usize },
    #[error("column '{column}' needs {expected} values, got {found}")]
    ColumnLength { column: String, expected: usize, found: usize },
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("csv export: {0}")]
    Export(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl FeatureTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, TableError> {
        if let Some((row, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != columns.len()) {
            return Err(TableError::RowWidth {
                row,
                expected: columns.len(),
                found: r.len(),
            });
        }
        Ok(Self { columns, rows })
    }

    /// Parse uploaded bytes (header row first). Column types are inferred per column.
    pub fn from_csv(bytes: &[u8]) -> Result<Self, TableError> {
        csv_io::decode(bytes)
    }

    /// Serialize with a header row, `\n` line endings and minimal quoting.
    pub fn to_csv(&self) -> Result<Vec<u8>, TableError> {
        csv_io::encode(self)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// First `n` rows (all of them when shorter).
    pub fn head(&self, n: usize) -> FeatureTable {
        FeatureTable {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// Replace the named column in place, or append it when absent.
    pub fn set_column(&mut self, name: &str, values: Vec<Value>) -> Result<(), TableError> {
        if values.len() != self.rows.len() {
            return Err(TableError::ColumnLength {
                column: name.to_string(),
                expected: self.rows.len(),
                found: values.len(),
            });
        }
        match self.column_index(name) {
            Some(idx) => {
                for (row, v) in self.rows.iter_mut().zip(values) {
                    row[idx] = v;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, v) in self.rows.iter_mut().zip(values) {
                    row.push(v);
                }
            }
        }
        Ok(())
    }
}

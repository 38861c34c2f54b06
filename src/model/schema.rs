//! Expected input columns of an artifact, and encoding of a feature table into model input.

use super::ModelError;
use crate::table::{FeatureTable, Value};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub columns: Vec<ColumnSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(flatten)]
    pub kind: ColumnKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    /// Encoded as the index of the value in `categories`.
    Categorical { categories: Vec<String> },
}

impl FeatureSchema {
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let data = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&data)
            .map_err(|e| ModelError::Artifact(format!("schema {}: {}", path.display(), e)))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Uploaded columns must equal the expected ones by name, count and order.
    pub fn check_columns(&self, columns: &[String]) -> Result<(), ModelError> {
        if self.names().eq(columns.iter().map(String::as_str)) {
            return Ok(());
        }

        let unexpected: Vec<&str> = columns
            .iter()
            .map(String::as_str)
            .filter(|c| !self.names().any(|n| n == *c))
            .collect();
        let missing: Vec<&str> = self
            .names()
            .filter(|n| !columns.iter().any(|c| c.as_str() == *n))
            .collect();

        let detail = if !unexpected.is_empty() || !missing.is_empty() {
            let mut parts = vec!["feature names must match those the model was trained with".to_string()];
            if !unexpected.is_empty() {
                parts.push(format!("unexpected: {}", unexpected.join(", ")));
            }
            if !missing.is_empty() {
                parts.push(format!("missing: {}", missing.join(", ")));
            }
            parts.join("; ")
        } else if columns.len() != self.len() {
            format!(
                "model expects {} features, upload has {}",
                self.len(),
                columns.len()
            )
        } else {
            let (pos, expected, found) = self
                .names()
                .zip(columns.iter().map(String::as_str))
                .enumerate()
                .find(|(_, (n, c))| n != c)
                .map(|(i, (n, c))| (i, n, c))
                .unwrap_or((0, "", ""));
            format!(
                "feature names must be in the same order as during training; column {}: expected '{}', found '{}'",
                pos + 1,
                expected,
                found
            )
        };
        Err(ModelError::SchemaMismatch(detail))
    }

    /// Row-major `[rows, features]` matrix; categorical cells become their vocabulary index.
    pub fn encode(&self, table: &FeatureTable) -> Result<Array2<f32>, ModelError> {
        self.check_columns(table.columns())?;
        let mut data = Vec::with_capacity(table.len() * self.len());
        for (row_idx, row) in table.rows().iter().enumerate() {
            for (spec, value) in self.columns.iter().zip(row) {
                data.push(spec.encode(row_idx, value)?);
            }
        }
        Array2::from_shape_vec((table.len(), self.len()), data)
            .map_err(|e| ModelError::Runtime(format!("input shape: {}", e)))
    }
}

impl ColumnSpec {
    fn encode(&self, row: usize, value: &Value) -> Result<f32, ModelError> {
        if value.is_missing() {
            return Err(ModelError::MissingValue {
                column: self.name.clone(),
                row,
            });
        }
        match &self.kind {
            ColumnKind::Numeric => numeric_cell(&self.name, row, value),
            ColumnKind::Categorical { categories } => {
                let key = value.to_string();
                categories
                    .iter()
                    .position(|c| *c == key)
                    .map(|i| i as f32)
                    .ok_or_else(|| ModelError::UnknownCategory {
                        column: self.name.clone(),
                        row,
                        value: key,
                    })
            }
        }
    }
}

pub(crate) fn numeric_cell(column: &str, row: usize, value: &Value) -> Result<f32, ModelError> {
    match value {
        Value::Missing => Err(ModelError::MissingValue {
            column: column.to_string(),
            row,
        }),
        other => match other.as_f64() {
            Some(x) if x.is_nan() => Err(ModelError::MissingValue {
                column: column.to_string(),
                row,
            }),
            Some(x) if x.is_infinite() || x.abs() > f32::MAX as f64 => Err(ModelError::NonFinite {
                column: column.to_string(),
                row,
                value: other.to_string(),
            }),
            Some(x) => Ok(x as f32),
            None => Err(ModelError::NotNumeric {
                column: column.to_string(),
                row,
                value: other.to_string(),
            }),
        },
    }
}

/// Schema-less encoding: every column must already be numeric.
pub fn encode_numeric(table: &FeatureTable) -> Result<Array2<f32>, ModelError> {
    let mut data = Vec::with_capacity(table.len() * table.width());
    for (row_idx, row) in table.rows().iter().enumerate() {
        for (column, value) in table.columns().iter().zip(row) {
            data.push(numeric_cell(column, row_idx, value)?);
        }
    }
    Array2::from_shape_vec((table.len(), table.width()), data)
        .map_err(|e| ModelError::Runtime(format!("input shape: {}", e)))
}

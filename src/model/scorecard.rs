//! Scorecard artifact: a logistic model stored as JSON.
//!
//! ```json
//! {
//!   "name": "ids-scorecard",
//!   "intercept": -1.5,
//!   "threshold": 0.5,
//!   "columns": [
//!     {"name": "src_bytes", "kind": "numeric", "weight": 0.8, "center": 0.0, "scale": 10000.0},
//!     {"name": "flag", "kind": "categorical", "weights": {"SF": -1.2, "S0": 2.1}}
//!   ]
//! }
//! ```
//!
//! `p(intrusion) = sigmoid(intercept + sum of column terms)`. A numeric term is
//! `weight * (x - center) / scale`; a categorical term is the weight of the
//! observed category, or 0 when the category was never seen.

use super::schema::{numeric_cell, ColumnKind, ColumnSpec, FeatureSchema};
use super::{ClassLabel, ClassProbabilities, Classifier, ModelError};
use crate::table::FeatureTable;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

fn default_threshold() -> f64 {
    0.5
}

fn default_scale() -> f64 {
    1.0
}

#[derive(Debug, Clone, Deserialize)]
struct ScorecardFile {
    #[serde(default)]
    name: Option<String>,
    intercept: f64,
    #[serde(default = "default_threshold")]
    threshold: f64,
    columns: Vec<ScorecardColumn>,
}

#[derive(Debug, Clone, Deserialize)]
struct ScorecardColumn {
    name: String,
    #[serde(flatten)]
    term: Term,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Term {
    Numeric {
        weight: f64,
        #[serde(default)]
        center: f64,
        #[serde(default = "default_scale")]
        scale: f64,
    },
    Categorical {
        weights: BTreeMap<String, f64>,
    },
}

pub struct ScorecardClassifier {
    name: String,
    intercept: f64,
    threshold: f64,
    terms: Vec<Term>,
    schema: FeatureSchema,
}

impl ScorecardClassifier {
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let data = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let fallback = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "scorecard".to_string());
        Self::from_json(&data, &fallback)
    }

    pub fn from_json(data: &str, fallback_name: &str) -> Result<Self, ModelError> {
        let file: ScorecardFile = serde_json::from_str(data)
            .map_err(|e| ModelError::Artifact(format!("scorecard: {}", e)))?;

        if !(file.threshold > 0.0 && file.threshold <= 1.0) {
            return Err(ModelError::Artifact(format!(
                "scorecard threshold {} outside (0, 1]",
                file.threshold
            )));
        }
        if !file.intercept.is_finite() {
            return Err(ModelError::Artifact("scorecard intercept is not finite".into()));
        }
        for col in &file.columns {
            if let Term::Numeric { weight, center, scale } = col.term {
                if scale == 0.0 || !scale.is_finite() || !weight.is_finite() || !center.is_finite() {
                    return Err(ModelError::Artifact(format!(
                        "scorecard column '{}' has an invalid numeric term",
                        col.name
                    )));
                }
            }
        }

        let schema = FeatureSchema {
            columns: file
                .columns
                .iter()
                .map(|c| ColumnSpec {
                    name: c.name.clone(),
                    kind: match &c.term {
                        Term::Numeric { .. } => ColumnKind::Numeric,
                        Term::Categorical { weights } => ColumnKind::Categorical {
                            categories: weights.keys().cloned().collect(),
                        },
                    },
                })
                .collect(),
        };

        Ok(Self {
            name: file.name.unwrap_or_else(|| fallback_name.to_string()),
            intercept: file.intercept,
            threshold: file.threshold,
            terms: file.columns.into_iter().map(|c| c.term).collect(),
            schema,
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Intrusion probability per row.
    fn intrusion_scores(&self, table: &FeatureTable) -> Result<Vec<f64>, ModelError> {
        self.schema.check_columns(table.columns())?;
        let mut out = Vec::with_capacity(table.len());
        for (row_idx, row) in table.rows().iter().enumerate() {
            let mut z = self.intercept;
            for ((spec, term), value) in self.schema.columns.iter().zip(&self.terms).zip(row) {
                z += match term {
                    Term::Numeric { weight, center, scale } => {
                        let x = numeric_cell(&spec.name, row_idx, value)? as f64;
                        weight * (x - center) / scale
                    }
                    Term::Categorical { weights } => {
                        if value.is_missing() {
                            return Err(ModelError::MissingValue {
                                column: spec.name.clone(),
                                row: row_idx,
                            });
                        }
                        weights.get(&value.to_string()).copied().unwrap_or(0.0)
                    }
                };
            }
            out.push(sigmoid(z));
        }
        Ok(out)
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl Classifier for ScorecardClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn schema(&self) -> Option<&FeatureSchema> {
        Some(&self.schema)
    }

    fn predict(&self, table: &FeatureTable) -> Result<Vec<ClassLabel>, ModelError> {
        Ok(self
            .intrusion_scores(table)?
            .into_iter()
            .map(|p| {
                if p >= self.threshold {
                    ClassLabel::Intrusion
                } else {
                    ClassLabel::Normal
                }
            })
            .collect())
    }

    fn predict_proba(&self, table: &FeatureTable) -> Result<Vec<ClassProbabilities>, ModelError> {
        Ok(self
            .intrusion_scores(table)?
            .into_iter()
            .map(ClassProbabilities::from_intrusion)
            .collect())
    }
}

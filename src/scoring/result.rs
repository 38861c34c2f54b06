//! Merges classifier outputs into the uploaded table and counts classes.

use super::ScoringError;
use crate::model::{ClassLabel, ClassProbabilities};
use crate::table::{FeatureTable, Value};
use serde::Serialize;

pub const PREDICTION_COLUMN: &str = "prediction";
pub const PROBABILITY_COLUMN: &str = "attack_probability";

/// Class counts for one processed upload. `normal + intrusion == total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub normal: usize,
    pub intrusion: usize,
    pub total: usize,
}

impl Summary {
    pub fn from_labels(labels: &[ClassLabel]) -> Self {
        let intrusion = labels.iter().filter(|l| **l == ClassLabel::Intrusion).count();
        Self {
            normal: labels.len() - intrusion,
            intrusion,
            total: labels.len(),
        }
    }
}

/// The uploaded table plus `prediction` and `attack_probability`, row order unchanged.
#[derive(Debug, Clone)]
pub struct PredictionResult {
    pub table: FeatureTable,
    pub labels: Vec<ClassLabel>,
    /// Rounded intrusion probability per row, as written to the table.
    pub attack_probabilities: Vec<f64>,
    pub summary: Summary,
}

impl PredictionResult {
    pub fn to_csv(&self) -> Result<Vec<u8>, ScoringError> {
        Ok(self.table.to_csv()?)
    }
}

/// Round to 4 decimals; exact halves go to the even neighbour.
pub fn round4(p: f64) -> f64 {
    (p * 10_000.0).round_ties_even() / 10_000.0
}

pub fn assemble(
    table: &FeatureTable,
    labels: Vec<ClassLabel>,
    probabilities: &[ClassProbabilities],
) -> Result<PredictionResult, ScoringError> {
    let rows = table.len();
    if labels.len() != rows || probabilities.len() != rows {
        return Err(ScoringError::RowCount {
            rows,
            labels: labels.len(),
            probabilities: probabilities.len(),
        });
    }

    let mut attack_probabilities = Vec::with_capacity(rows);
    for (row, p) in probabilities.iter().enumerate() {
        if !p.intrusion.is_finite() {
            return Err(ScoringError::InvalidProbability {
                row,
                value: p.intrusion,
            });
        }
        attack_probabilities.push(round4(p.intrusion.clamp(0.0, 1.0)));
    }

    let mut out = table.clone();
    out.set_column(
        PREDICTION_COLUMN,
        labels.iter().map(|l| Value::text(l.as_str())).collect(),
    )?;
    out.set_column(
        PROBABILITY_COLUMN,
        attack_probabilities.iter().map(|&p| Value::Float(p)).collect(),
    )?;

    Ok(PredictionResult {
        table: out,
        summary: Summary::from_labels(&labels),
        labels,
        attack_probabilities,
    })
}

//! Upload scoring: decode → predict → assemble, with every failure folded into one error.

mod pipeline;
mod result;

pub use pipeline::ScoringPipeline;
pub use result::{
    assemble, round4, PredictionResult, Summary, PREDICTION_COLUMN, PROBABILITY_COLUMN,
};

use crate::model::ModelError;
use crate::table::TableError;
use thiserror::Error;

/// Download name of the scored CSV.
pub const EXPORT_FILE_NAME: &str = "ids_predictions.csv";

/// Shown above the raw error text whenever scoring an upload fails.
pub const USER_MESSAGE: &str =
    "Prediction failed. Most likely: your CSV columns don't match what the model expects.";

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("Found array with 0 sample(s); the upload has a header but no records")]
    NoRows,
    #[error("classifier returned {labels} labels and {probabilities} probabilities for {rows} rows")]
    RowCount {
        rows: usize,
        labels: usize,
        probabilities: usize,
    },
    #[error("attack probability in row {row} is {value}")]
    InvalidProbability { row: usize, value: f64 },
}

impl ScoringError {
    /// Raw error text shown under [`USER_MESSAGE`].
    pub fn detail(&self) -> String {
        self.to_string()
    }

    /// Stable short tag for logs and API bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            ScoringError::Table(_) => "decode",
            ScoringError::Model(_) | ScoringError::NoRows => "predict",
            ScoringError::RowCount { .. } | ScoringError::InvalidProbability { .. } => "assemble",
        }
    }
}

//! Scoring pipeline: uploaded bytes → feature table → classifier → result table.

use super::result::{assemble, PredictionResult};
use super::ScoringError;
use crate::model::Classifier;
use crate::table::FeatureTable;
use std::sync::Arc;
use tracing::debug;

/// Holds the process-wide classifier handle; cheap to clone.
#[derive(Clone)]
pub struct ScoringPipeline {
    classifier: Arc<dyn Classifier>,
}

impl ScoringPipeline {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self { classifier }
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<FeatureTable, ScoringError> {
        Ok(FeatureTable::from_csv(bytes)?)
    }

    /// Run both classifier capabilities on the full table and merge the outputs.
    pub fn score(&self, table: &FeatureTable) -> Result<PredictionResult, ScoringError> {
        if table.is_empty() {
            return Err(ScoringError::NoRows);
        }
        let labels = self.classifier.predict(table)?;
        let probabilities = self.classifier.predict_proba(table)?;
        debug!(
            model = %self.classifier.name(),
            rows = table.len(),
            "classifier outputs received"
        );
        assemble(table, labels, &probabilities)
    }

    pub fn run(&self, bytes: &[u8]) -> Result<PredictionResult, ScoringError> {
        let table = self.decode(bytes)?;
        self.score(&table)
    }
}

//! Pre-trained classifier artifacts.
//!
//! An artifact is used only through the [`Classifier`] capability pair: one
//! class label per row and one two-class probability distribution per row.
//! Two artifact formats load behind it: ONNX graphs (`.onnx`) run with ONNX
//! Runtime, and JSON logistic scorecards (`.json`).

pub mod nsl_kdd;
mod onnx;
mod schema;
mod scorecard;

pub use onnx::OnnxClassifier;
pub use schema::{encode_numeric, ColumnKind, ColumnSpec, FeatureSchema};
pub use scorecard::ScorecardClassifier;

use crate::config::ModelConfig;
use crate::table::FeatureTable;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported artifact type: {} (expected .onnx or .json)", .0.display())]
    UnsupportedArtifact(PathBuf),
    #[error("invalid artifact: {0}")]
    Artifact(String),
    #[error("{0}")]
    SchemaMismatch(String),
    #[error("could not convert '{value}' to float in column '{column}' (row {row})")]
    NotNumeric { column: String, row: usize, value: String },
    #[error("Input contains NaN: column '{column}' is empty in row {row}")]
    MissingValue { column: String, row: usize },
    #[error("Input contains infinity or a value too large: '{value}' in column '{column}' (row {row})")]
    NonFinite { column: String, row: usize, value: String },
    #[error("found unknown category '{value}' in column '{column}' (row {row})")]
    UnknownCategory { column: String, row: usize, value: String },
    #[error("model produced class {0}; expected 0 (normal) or 1 (intrusion)")]
    UnexpectedClass(i64),
    #[error("unexpected model output: {0}")]
    Output(String),
    #[error("inference runtime: {0}")]
    Runtime(String),
}

/// Predicted class of one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClassLabel {
    Normal,
    Intrusion,
}

impl ClassLabel {
    pub fn from_code(code: i64) -> Result<Self, ModelError> {
        match code {
            0 => Ok(ClassLabel::Normal),
            1 => Ok(ClassLabel::Intrusion),
            other => Err(ModelError::UnexpectedClass(other)),
        }
    }

    pub fn code(self) -> i64 {
        match self {
            ClassLabel::Normal => 0,
            ClassLabel::Intrusion => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ClassLabel::Normal => "NORMAL",
            ClassLabel::Intrusion => "INTRUSION",
        }
    }
}

/// Probability mass per class for one record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassProbabilities {
    pub normal: f64,
    pub intrusion: f64,
}

impl ClassProbabilities {
    pub fn from_intrusion(p: f64) -> Self {
        Self {
            normal: 1.0 - p,
            intrusion: p,
        }
    }
}

/// Capability interface of a loaded artifact. Implementations are immutable
/// after load and shared across requests.
pub trait Classifier: Send + Sync {
    fn name(&self) -> &str;

    /// Expected input columns, when the artifact declares them.
    fn schema(&self) -> Option<&FeatureSchema>;

    /// One label per input row, in row order.
    fn predict(&self, table: &FeatureTable) -> Result<Vec<ClassLabel>, ModelError>;

    /// One distribution per input row, in row order.
    fn predict_proba(&self, table: &FeatureTable) -> Result<Vec<ClassProbabilities>, ModelError>;
}

/// Load the configured artifact. Called once at startup; any error is fatal.
pub fn load_artifact(config: &ModelConfig) -> Result<Arc<dyn Classifier>, ModelError> {
    let path = &config.path;
    let bytes = std::fs::read(path).map_err(|source| ModelError::Io {
        path: path.clone(),
        source,
    })?;
    let sha256 = format!("{:x}", Sha256::digest(&bytes));

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    let classifier: Arc<dyn Classifier> = match ext.as_deref() {
        Some("onnx") => {
            let schema = config
                .schema_path
                .as_deref()
                .map(FeatureSchema::load)
                .transpose()?;
            Arc::new(OnnxClassifier::load(path, schema, config.onnx_threads)?)
        }
        Some("json") => Arc::new(ScorecardClassifier::load(path)?),
        _ => return Err(ModelError::UnsupportedArtifact(path.clone())),
    };

    info!(
        model = %classifier.name(),
        path = %path.display(),
        sha256 = %sha256,
        features = ?classifier.schema().map(|s| s.len()),
        "classifier artifact loaded"
    );
    Ok(classifier)
}

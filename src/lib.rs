//! NSL-KDD intrusion detection demo: upload network records, score each one
//! as Normal or Intrusion with a pre-trained classifier.
//!
//! Modular structure:
//! - [`table`] — Feature table decoded from the uploaded CSV, and CSV export
//! - [`model`] — Classifier capability trait, ONNX and scorecard artifacts
//! - [`scoring`] — Predict + assemble pipeline, class summary
//! - [`web`] — axum router, upload handlers, HTML page
//! - [`logging`] — Structured logging
//! - [`config`] — JSON configuration

pub mod config;
pub mod table;
pub mod model;
pub mod scoring;
pub mod web;
pub mod logging;

pub use config::DemoConfig;
pub use table::{FeatureTable, Value};
pub use model::{load_artifact, ClassLabel, ClassProbabilities, Classifier};
pub use scoring::{PredictionResult, ScoringPipeline, Summary};
pub use web::{router, AppState};
pub use logging::StructuredLogger;

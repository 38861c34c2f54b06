//! ONNX Runtime classifier. Input: `[rows, features]` f32. Outputs: a label
//! tensor and a probability output, either a `[rows, 2]` tensor or a
//! `seq(map(int64, float))` as written by zipmap-style exporters.

use super::schema::{encode_numeric, FeatureSchema};
use super::{ClassLabel, ClassProbabilities, Classifier, ModelError};
use crate::table::FeatureTable;
use ort::memory::Allocator;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, DynValue, Tensor};
use std::fmt::Display;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

fn runtime<E: Display>(e: E) -> ModelError {
    ModelError::Runtime(e.to_string())
}

fn output<E: Display>(e: E) -> ModelError {
    ModelError::Output(e.to_string())
}

pub struct OnnxClassifier {
    name: String,
    /// `run` needs exclusive access; the session itself is never replaced.
    session: Mutex<Session>,
    input_name: String,
    label_output: String,
    proba_output: String,
    schema: Option<FeatureSchema>,
}

impl OnnxClassifier {
    /// Build a session from `path`. Without a schema every uploaded column is
    /// fed as-is and must be numeric.
    pub fn load(path: &Path, schema: Option<FeatureSchema>, threads: usize) -> Result<Self, ModelError> {
        if let Err(e) = ort::init().with_name("ids-demo").commit() {
            warn!(error = %e, "ONNX Runtime environment init failed; using the default environment");
        }

        let invalid = |e: &dyn Display| ModelError::Artifact(format!("{}: {}", path.display(), e));
        let session = Session::builder()
            .map_err(|e| invalid(&e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| invalid(&e))?
            .with_intra_threads(threads.max(1))
            .map_err(|e| invalid(&e))?
            .commit_from_file(path)
            .map_err(|e| invalid(&e))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .ok_or_else(|| ModelError::Artifact("model declares no inputs".into()))?;
        if session.outputs.len() < 2 {
            return Err(ModelError::Artifact(format!(
                "model declares {} output(s); a label and a probability output are required",
                session.outputs.len()
            )));
        }
        let label_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("label"))
            .unwrap_or(&session.outputs[0])
            .name
            .clone();
        let proba_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .unwrap_or(&session.outputs[session.outputs.len() - 1])
            .name
            .clone();

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "onnx".to_string());
        info!(
            model = %name,
            input = %input_name,
            label_output = %label_output,
            proba_output = %proba_output,
            threads,
            "ONNX session ready"
        );

        Ok(Self {
            name,
            session: Mutex::new(session),
            input_name,
            label_output,
            proba_output,
            schema,
        })
    }

    fn input(&self, table: &FeatureTable) -> Result<Tensor<f32>, ModelError> {
        let features = match &self.schema {
            Some(schema) => schema.encode(table)?,
            None => encode_numeric(table)?,
        };
        Tensor::from_array(features).map_err(runtime)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Session>, ModelError> {
        self.session
            .lock()
            .map_err(|_| ModelError::Runtime("session lock poisoned".into()))
    }
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn schema(&self) -> Option<&FeatureSchema> {
        self.schema.as_ref()
    }

    fn predict(&self, table: &FeatureTable) -> Result<Vec<ClassLabel>, ModelError> {
        let input = self.input(table)?;
        let mut session = self.lock()?;
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input])
            .map_err(runtime)?;
        let value = outputs
            .get(self.label_output.as_str())
            .ok_or_else(|| ModelError::Output(format!("missing output '{}'", self.label_output)))?;

        let codes = extract_class_codes(value)?;
        if codes.len() != table.len() {
            return Err(ModelError::Output(format!(
                "{} labels for {} rows",
                codes.len(),
                table.len()
            )));
        }
        debug!(rows = codes.len(), "onnx labels extracted");
        codes.into_iter().map(ClassLabel::from_code).collect()
    }

    fn predict_proba(&self, table: &FeatureTable) -> Result<Vec<ClassProbabilities>, ModelError> {
        let input = self.input(table)?;
        let mut session = self.lock()?;
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input])
            .map_err(runtime)?;
        let value = outputs
            .get(self.proba_output.as_str())
            .ok_or_else(|| ModelError::Output(format!("missing output '{}'", self.proba_output)))?;

        let probs = extract_probabilities(value, table.len())?;
        debug!(rows = probs.len(), "onnx probabilities extracted");
        Ok(probs)
    }
}

/// Label output as class codes: int64 tensor, or float tensor rounded.
fn extract_class_codes(value: &DynValue) -> Result<Vec<i64>, ModelError> {
    if let Ok((_, data)) = value.try_extract_tensor::<i64>() {
        return Ok(data.to_vec());
    }
    if let Ok((_, data)) = value.try_extract_tensor::<f32>() {
        return Ok(data.iter().map(|v| v.round() as i64).collect());
    }
    Err(ModelError::Output("label output is neither an int64 nor a float tensor".into()))
}

/// Probability output as per-row distributions.
fn extract_probabilities(value: &DynValue, rows: usize) -> Result<Vec<ClassProbabilities>, ModelError> {
    if let Ok((shape, data)) = value.try_extract_tensor::<f32>() {
        let dims: Vec<i64> = shape.iter().copied().collect();
        return match dims.as_slice() {
            [n, 2] if *n as usize == rows => Ok(data
                .chunks_exact(2)
                .map(|c| ClassProbabilities {
                    normal: c[0] as f64,
                    intrusion: c[1] as f64,
                })
                .collect()),
            [n, 1] | [n] if *n as usize == rows => Ok(data
                .iter()
                .map(|&p| ClassProbabilities::from_intrusion(p as f64))
                .collect()),
            _ => Err(ModelError::Output(format!(
                "probability tensor has shape {:?}, expected [{}, 2]",
                dims, rows
            ))),
        };
    }

    let dtype = value.dtype();
    if DynSequenceValueType::can_downcast(&dtype) {
        return extract_from_sequence_map(value, rows);
    }
    Err(ModelError::Output(
        "probability output is neither a float tensor nor a sequence of maps".into(),
    ))
}

/// seq(map(int64, float)): one map per row, keyed by class code.
fn extract_from_sequence_map(value: &DynValue, rows: usize) -> Result<Vec<ClassProbabilities>, ModelError> {
    let allocator = Allocator::default();
    let sequence = value.downcast_ref::<DynSequenceValueType>().map_err(output)?;
    let maps = sequence
        .try_extract_sequence::<DynMapValueType>(&allocator)
        .map_err(output)?;
    if maps.len() != rows {
        return Err(ModelError::Output(format!(
            "{} probability maps for {} rows",
            maps.len(),
            rows
        )));
    }

    let mut out = Vec::with_capacity(rows);
    for map in &maps {
        let kv_pairs = map.try_extract_key_values::<i64, f32>().map_err(output)?;
        let mut probs = ClassProbabilities {
            normal: 0.0,
            intrusion: 0.0,
        };
        for (class_id, prob) in kv_pairs {
            match class_id {
                0 => probs.normal = prob as f64,
                1 => probs.intrusion = prob as f64,
                other => return Err(ModelError::UnexpectedClass(other)),
            }
        }
        out.push(probs);
    }
    Ok(out)
}

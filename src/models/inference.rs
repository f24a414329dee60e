//! Inference engine for reoperation risk prediction

use crate::config::AppConfig;
use crate::models::importance::ImportanceRanking;
use crate::models::loader::{ArtifactLoader, LoadedArtifact, ProbabilitySource};
use crate::schema::InputRecord;
use crate::types::PredictionReport;
use anyhow::{Context, Result};
use ort::memory::Allocator;
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType};
use std::sync::RwLock;
use tracing::{debug, warn};

/// Inference engine wrapping the single loaded classifier artifact.
///
/// The artifact is loaded once at startup and never reloaded; the lock only
/// exists because ONNX session runs need exclusive access, the artifact
/// itself is read-only for the process lifetime.
pub struct InferenceEngine {
    model: RwLock<LoadedArtifact>,
}

impl InferenceEngine {
    /// Create an engine from configuration. A missing or corrupt artifact is
    /// fatal here; the caller must not render the form without an engine.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let loader = ArtifactLoader::with_threads(config.model.onnx_threads)?;
        let model = loader.load(&config.model.artifact_path)?;

        Ok(Self {
            model: RwLock::new(model),
        })
    }

    /// Build an engine around an already-loaded artifact.
    pub fn from_artifact(model: LoadedArtifact) -> Self {
        Self {
            model: RwLock::new(model),
        }
    }

    /// True when predictions go through the plain-predict fallback.
    pub fn is_approximate(&self) -> bool {
        self.model.read().map(|m| m.is_approximate()).unwrap_or(false)
    }

    /// Run inference on an input record and produce a prediction report.
    ///
    /// The record already holds its values in schema order; `to_features`
    /// re-asserts that order, so whatever built the record cannot change the
    /// column order seen by the model.
    pub fn predict(&self, record: &InputRecord) -> Result<PredictionReport> {
        let features = record.to_features();
        let mut model = self
            .model
            .write()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        let approximate = model.is_approximate();
        let probability = Self::run_model(&mut model, &features)?;

        debug!(
            probability = probability,
            approximate = approximate,
            "Inference complete"
        );

        Ok(PredictionReport::from_probability(probability, approximate))
    }

    /// Rank the artifact's importance weights against the schema, if the
    /// artifact carries any. `Ok(None)` means no weights are available;
    /// an `Err` (length mismatch) is recoverable and rendered as a warning.
    pub fn importance_ranking(&self) -> Result<Option<ImportanceRanking>> {
        let model = self
            .model
            .read()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        match &model.importance {
            Some(vector) => ImportanceRanking::rank(vector).map(Some),
            None => Ok(None),
        }
    }

    /// Run the session and extract the positive-class probability.
    fn run_model(model: &mut LoadedArtifact, features: &[f32]) -> Result<f64> {
        use ort::value::Tensor;

        // Input tensor shape [1, num_features]
        let shape = vec![1_i64, features.len() as i64];
        let input_tensor = Tensor::from_array((shape, features.to_vec()))
            .context("Failed to create input tensor")?;

        let input_name = model.input_name.clone();
        let probability = model.probability.clone();

        let outputs = model.session.run(ort::inputs![&input_name => input_tensor])?;

        match &probability {
            ProbabilitySource::PredictProba { output_name } => {
                Self::extract_probability(&outputs, output_name)
            }
            ProbabilitySource::PlainPredict { output_name } => {
                Self::extract_plain_prediction(&outputs, output_name)
            }
        }
    }

    /// Extract the positive-class probability from the probability output.
    /// Handles both tensor outputs (XGBoost, random forest exports) and
    /// seq(map) outputs (sklearn ZipMap exports).
    fn extract_probability(
        outputs: &ort::session::SessionOutputs,
        output_name: &str,
    ) -> Result<f64> {
        if let Some(output) = outputs.get(output_name) {
            let dtype = output.dtype();

            if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
                let dims: Vec<i64> = shape.iter().copied().collect();
                let prob = positive_class_probability(&dims, data);
                debug!(output = %output_name, prob = prob, "Extracted from tensor");
                return Ok(prob);
            }

            if DynSequenceValueType::can_downcast(&dtype) {
                if let Ok(prob) = Self::extract_from_sequence_map(output) {
                    return Ok(prob);
                }
            }
        }

        // The named output was missing or unreadable; try the others.
        for (name, output) in outputs.iter() {
            if name.contains("label") {
                continue;
            }

            let dtype = output.dtype();

            if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
                let dims: Vec<i64> = shape.iter().copied().collect();
                let prob = positive_class_probability(&dims, data);
                debug!(output = %name, prob = prob, "Extracted from tensor (fallback)");
                return Ok(prob);
            }

            if DynSequenceValueType::can_downcast(&dtype) {
                if let Ok(prob) = Self::extract_from_sequence_map(&output) {
                    return Ok(prob);
                }
            }
        }

        anyhow::bail!("Could not extract a probability from any model output")
    }

    /// Extract the plain prediction and hand it back as if it were a
    /// probability. The output is usually an integer class label.
    fn extract_plain_prediction(
        outputs: &ort::session::SessionOutputs,
        output_name: &str,
    ) -> Result<f64> {
        let output = outputs
            .get(output_name)
            .ok_or_else(|| anyhow::anyhow!("Prediction output '{}' missing", output_name))?;

        if let Ok((_, data)) = output.try_extract_tensor::<f32>() {
            return data
                .first()
                .map(|&v| v as f64)
                .ok_or_else(|| anyhow::anyhow!("Prediction output is empty"));
        }

        if let Ok((_, data)) = output.try_extract_tensor::<i64>() {
            return data
                .first()
                .map(|&v| v as f64)
                .ok_or_else(|| anyhow::anyhow!("Prediction output is empty"));
        }

        anyhow::bail!("Prediction output '{}' has an unsupported type", output_name)
    }

    /// Extract the positive-class probability from seq(map(int64, float)),
    /// the format sklearn-onnx ZipMap exports use.
    fn extract_from_sequence_map(output: &ort::value::DynValue) -> Result<f64> {
        let allocator = Allocator::default();

        let sequence = output
            .downcast_ref::<DynSequenceValueType>()
            .map_err(|e| anyhow::anyhow!("Failed to downcast to sequence: {}", e))?;

        let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;

        if maps.is_empty() {
            return Err(anyhow::anyhow!("Empty sequence"));
        }

        // Single-row input, so a single map of class -> probability
        let map_value = &maps[0];
        let kv_pairs = map_value.try_extract_key_values::<i64, f32>()?;

        for (class_id, prob) in &kv_pairs {
            if *class_id == 1 {
                debug!(prob = *prob, "Extracted from seq(map)");
                return Ok(*prob as f64);
            }
        }

        // No positive class entry; invert the negative class if present
        for (class_id, prob) in &kv_pairs {
            if *class_id == 0 {
                return Ok(1.0 - *prob as f64);
            }
        }

        Err(anyhow::anyhow!("No probability found in map"))
    }
}

/// Pick the positive-class probability out of a tensor output.
fn positive_class_probability(dims: &[i64], data: &[f32]) -> f64 {
    if dims.len() == 2 {
        let num_classes = dims[1] as usize;
        if num_classes >= 2 {
            // [batch, num_classes] - positive class is index 1
            return data[1] as f64;
        } else if num_classes == 1 {
            // [batch, 1] - single probability
            return data[0] as f64;
        }
    } else if dims.len() == 1 {
        let num_classes = dims[0] as usize;
        if num_classes >= 2 {
            return data[1] as f64;
        } else if num_classes == 1 {
            return data[0] as f64;
        }
    }

    // Fallback: return last value
    let prob = data.last().map(|&v| v as f64).unwrap_or(0.5);
    warn!(dims = ?dims, prob = prob, "Unexpected tensor shape, using last value");
    prob
}

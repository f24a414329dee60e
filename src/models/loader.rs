//! ONNX artifact loader with load-time capability resolution.
//!
//! The classifier is an opaque pre-trained artifact; which operations it
//! supports varies by export. Rather than probing per call, every capability
//! is resolved exactly once here: the probability output is located by name,
//! and importance weights are read from the artifact's custom metadata
//! (`feature_importances` first, then `coef`).

use crate::models::importance::{ImportanceSource, ImportanceVector};
use anyhow::{Context, Result};
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::path::Path;
use tracing::{info, warn};

/// How the positive-class probability is obtained from the artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbabilitySource {
    /// The artifact exposes a calibrated probability output
    PredictProba { output_name: String },
    /// Only a plain class prediction is available; its output is used as if
    /// it were a probability. A class label is not a calibrated probability,
    /// so predictions through this path are flagged approximate.
    PlainPredict { output_name: String },
}

/// Loaded classifier artifact with its resolved capabilities
pub struct LoadedArtifact {
    /// ONNX Runtime session
    pub session: Session,
    /// Input name for the model
    pub input_name: String,
    /// Resolved probability capability
    pub probability: ProbabilitySource,
    /// Importance weights, when the artifact carries them
    pub importance: Option<ImportanceVector>,
}

impl LoadedArtifact {
    /// True when predictions go through the plain-predict fallback.
    pub fn is_approximate(&self) -> bool {
        matches!(self.probability, ProbabilitySource::PlainPredict { .. })
    }
}

/// Loader for the classifier artifact
pub struct ArtifactLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ArtifactLoader {
    /// Create a new loader with default settings (1 thread)
    pub fn new() -> Result<Self> {
        Self::with_threads(1)
    }

    /// Create a new loader with specified number of threads
    pub fn with_threads(onnx_threads: usize) -> Result<Self> {
        // Initialize ONNX Runtime
        ort::init().commit()?;
        info!(onnx_threads = onnx_threads, "ONNX Runtime initialized");
        Ok(Self { onnx_threads })
    }

    /// Load the classifier artifact and resolve its capabilities.
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<LoadedArtifact> {
        let path = path.as_ref();

        info!(path = %path.display(), threads = self.onnx_threads, "Loading classifier artifact");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(self.onnx_threads)?
            .commit_from_file(path)
            .context(format!("Failed to load classifier artifact from {:?}", path))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let probability = Self::resolve_probability_source(&session);
        let importance = Self::resolve_importance(&session)?;

        info!(
            input = %input_name,
            probability = ?probability,
            importance = importance.as_ref().map(|v| v.source.to_string()),
            "Artifact loaded, capabilities resolved"
        );

        Ok(LoadedArtifact {
            session,
            input_name,
            probability,
            importance,
        })
    }

    /// Locate the probability output by name, falling back to the plain
    /// prediction output when none exists.
    fn resolve_probability_source(session: &Session) -> ProbabilitySource {
        if let Some(output) = session.outputs.iter().find(|o| o.name.contains("prob")) {
            return ProbabilitySource::PredictProba {
                output_name: output.name.clone(),
            };
        }

        // No probability output. Prefer the label output, else the last one.
        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name.contains("label") || o.name.contains("output"))
            .map(|o| o.name.clone())
            .unwrap_or_else(|| {
                session
                    .outputs
                    .last()
                    .map(|o| o.name.clone())
                    .unwrap_or_else(|| "label".to_string())
            });

        warn!(
            output = %output_name,
            "Artifact has no probability output; plain predictions will be \
             treated as probabilities and flagged approximate"
        );

        ProbabilitySource::PlainPredict { output_name }
    }

    /// Read importance weights from custom metadata, trying feature
    /// importances first, then linear coefficients. A malformed payload is
    /// logged and treated as absent rather than failing the load.
    fn resolve_importance(session: &Session) -> Result<Option<ImportanceVector>> {
        let metadata = session
            .metadata()
            .context("Failed to read artifact metadata")?;

        let candidates = [
            ("feature_importances", ImportanceSource::FeatureImportances),
            ("coef", ImportanceSource::Coefficients),
        ];

        for (key, source) in candidates {
            let Some(json) = metadata.custom(key)? else {
                continue;
            };
            match ImportanceVector::from_metadata_json(source, &json) {
                Ok(vector) => {
                    info!(source = %source, count = vector.weights.len(), "Importance weights resolved");
                    return Ok(Some(vector));
                }
                Err(e) => {
                    warn!(key = key, error = %e, "Ignoring malformed importance metadata");
                }
            }
        }

        info!("Artifact carries no importance metadata");
        Ok(None)
    }
}

impl Default for ArtifactLoader {
    fn default() -> Self {
        Self { onnx_threads: 1 }
    }
}

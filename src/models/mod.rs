//! Model loading and inference components

pub mod importance;
pub mod inference;
pub mod loader;

pub use importance::{ImportanceRanking, ImportanceSource, ImportanceVector};
pub use inference::InferenceEngine;
pub use loader::{ArtifactLoader, LoadedArtifact, ProbabilitySource};

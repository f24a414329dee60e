//! Unplanned Reoperation Risk Prediction Console
//!
//! Loads a pre-trained ONNX classifier once at startup, renders a bounded
//! parameter form, and on request predicts the reoperation risk probability
//! together with a ranked feature-importance view when the artifact
//! provides one.

pub mod config;
pub mod console;
pub mod models;
pub mod schema;
pub mod types;

pub use config::AppConfig;
pub use console::Session;
pub use models::inference::InferenceEngine;
pub use schema::{InputRecord, ParameterSpec, PARAMETERS};
pub use types::{PredictionReport, RiskLevel};

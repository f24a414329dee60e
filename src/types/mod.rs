//! Type definitions for the risk prediction console

pub mod prediction;

pub use prediction::{PredictionReport, RiskLevel};

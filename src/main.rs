//! Reoperation Risk Prediction Console - Main Entry Point
//!
//! Loads the classifier artifact, then runs the interactive form session.
//! A missing or corrupt artifact halts the process before any form is shown.

use anyhow::{Context, Result};
use reop_risk::{config::AppConfig, console::Session, models::InferenceEngine};
use std::io;
use tracing::info;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("reop_risk=info".parse()?),
        )
        .with_writer(io::stderr)
        .init();

    info!("Starting reoperation risk prediction console");

    // Load configuration
    let config = AppConfig::load()?;
    info!(
        artifact = %config.model.artifact_path,
        "Configuration loaded successfully"
    );

    // Load the classifier artifact. Failure here is fatal to the session:
    // the form is never rendered without a loaded model.
    let engine = InferenceEngine::new(&config).with_context(|| {
        format!(
            "Cannot start: failed to load classifier artifact '{}'. \
             Ensure the file exists and is a valid ONNX model, then restart.",
            config.model.artifact_path
        )
    })?;

    if engine.is_approximate() {
        info!("Artifact lacks a probability output; predictions will be flagged approximate");
    }

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut session = Session::new(engine, config.display.color);
    session.run(stdin.lock(), stdout.lock())?;

    info!("Session ended");
    Ok(())
}

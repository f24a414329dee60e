//! Terminal rendering and the interactive session loop.
//!
//! Every render function is a pure function from current state to text, so
//! one interaction re-renders everything from scratch and the same inputs
//! always produce the same output.

use crate::models::importance::ImportanceRanking;
use crate::models::InferenceEngine;
use crate::schema::{self, InputRecord, PARAMETERS};
use crate::types::{PredictionReport, RiskLevel};
use anyhow::{bail, Result};
use std::io::{BufRead, Write};
use tracing::warn;

const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const RESET: &str = "\x1b[0m";

/// One parsed user command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Set the parameter at `index` to `value`
    Set { index: usize, value: i64 },
    /// Run a prediction on the current values
    Predict,
    /// Restore all parameters to their schema defaults
    Reset,
    /// Re-render the form
    Show,
    /// Render the coded-variable legend
    Legend,
    /// Render command help and parameter descriptions
    Help,
    /// End the session
    Quit,
}

impl Command {
    /// Parse a command line. Unknown commands and malformed arguments are
    /// recoverable errors rendered back to the user.
    pub fn parse(line: &str) -> Result<Self> {
        let mut parts = line.split_whitespace();
        let Some(verb) = parts.next() else {
            bail!("Empty command; type 'help' for commands");
        };

        match verb {
            "set" => {
                let index: usize = parts
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("Usage: set <index> <value>"))?
                    .parse()
                    .map_err(|_| anyhow::anyhow!("Index must be a number"))?;
                let value: i64 = parts
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("Usage: set <index> <value>"))?
                    .parse()
                    .map_err(|_| anyhow::anyhow!("Value must be an integer"))?;
                Ok(Command::Set { index, value })
            }
            "predict" => Ok(Command::Predict),
            "reset" => Ok(Command::Reset),
            "show" => Ok(Command::Show),
            "legend" => Ok(Command::Legend),
            "help" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => bail!("Unknown command '{other}'; type 'help' for commands"),
        }
    }
}

/// Render the page title.
pub fn render_title() -> String {
    let mut out = String::new();
    out.push_str("╔══════════════════════════════════════════════════════════════╗\n");
    out.push_str("║       Unplanned Reoperation Risk Prediction System           ║\n");
    out.push_str("╚══════════════════════════════════════════════════════════════╝\n");
    out
}

/// Render the parameter form as a two-column grid of bounded inputs.
pub fn render_form(record: &InputRecord) -> String {
    let mut out = String::from("Patient Parameters\n");

    let cells: Vec<String> = PARAMETERS
        .iter()
        .enumerate()
        .map(|(i, param)| {
            let value = record.get(i).unwrap_or(param.default);
            format!(
                "[{:2}] {:<24} [{}-{}] = {}",
                i, param.name, param.min, param.max, value
            )
        })
        .collect();

    for row in cells.chunks(2) {
        match row {
            [left, right] => out.push_str(&format!("  {:<40} {}\n", left, right)),
            [left] => out.push_str(&format!("  {}\n", left)),
            _ => {}
        }
    }

    out.push_str("\nCommands: set <index> <value> | predict | reset | legend | help | quit\n");
    out
}

/// Render the prediction results panel.
pub fn render_report(report: &PredictionReport, color: bool) -> String {
    let label = report.risk_level.to_string();
    let colored_label = if color {
        let code = match report.risk_level {
            RiskLevel::High => RED,
            RiskLevel::Low => GREEN,
        };
        format!("{code}{label}{RESET}")
    } else {
        label.clone()
    };

    let mut out = String::from("──────────────────────────────────────────────\n");
    out.push_str("Prediction Results\n");
    out.push_str(&format!("  Verdict:                  {colored_label}\n"));
    out.push_str(&format!(
        "  Reoperation Probability:  {}\n",
        report.probability_percent()
    ));
    if report.approximate {
        out.push_str(
            "  ⚠ The model exposes no probability output; the figure above is \
             a raw class prediction, not a calibrated probability.\n",
        );
    }
    out.push_str(&format!(
        "  Report {} at {}\n",
        report.report_id,
        report.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out
}

/// Render the importance ranking as a text bar chart plus a table.
pub fn render_importance(ranking: &ImportanceRanking) -> String {
    let mut out = String::from("──────────────────────────────────────────────\n");
    out.push_str(&format!("Key Risk Factors ({})\n", ranking.source));

    let max_abs = ranking
        .entries
        .iter()
        .map(|(_, w)| w.abs())
        .fold(0.0_f64, f64::max);

    for (name, weight) in &ranking.entries {
        let bar_len = if max_abs > 0.0 {
            ((weight.abs() / max_abs) * 30.0).round() as usize
        } else {
            0
        };
        let bar: String = "█".repeat(bar_len);
        out.push_str(&format!("  {:<24} {}\n", name, bar));
    }

    out.push_str(&format!("\n  {:>4}  {:<24} {:>10}\n", "Rank", "Feature", "Weight"));
    for (rank, (name, weight)) in ranking.entries.iter().enumerate() {
        out.push_str(&format!("  {:>4}  {:<24} {:>10.4}\n", rank + 1, name, weight));
    }

    out
}

/// Render the non-fatal notice shown when no importance ranking exists.
pub fn render_importance_unavailable(reason: &str) -> String {
    format!(
        "──────────────────────────────────────────────\n\
         ⚠ Feature importance not available: {reason}\n\
         The model does not provide feature importance data.\n"
    )
}

/// Render the sidebar block: model metadata and coded-variable legends.
pub fn render_legend() -> String {
    let mut out = String::from("System Documentation\n");
    out.push_str("  Model Information\n");
    out.push_str("    Algorithm:     XGBoost Classifier\n");
    out.push_str("    Training Date: 2023-10-15\n");
    out.push_str("  Variable Codes\n");
    out.push_str("    ASA scores:     0 = Healthy .. 5 = Moribund\n");
    out.push_str("    Tumor location: 1 = Supratentorial extramedullary\n");
    out.push_str("                    2 = Supratentorial intramedullary\n");
    out.push_str("                    3 = Infratentorial extramedullary\n");
    out.push_str("                    4 = Infratentorial intramedullary\n");
    out.push_str("    Tumor type:     1 = Meningioma, 2 = Glioma, 3 = Metastasis,\n");
    out.push_str("                    4 = Acoustic neuroma, 5 = Other\n");
    out
}

/// Render command help and per-parameter descriptions.
pub fn render_help() -> String {
    let mut out = String::from("Commands\n");
    out.push_str("  set <index> <value>  set a parameter (clamped to its range)\n");
    out.push_str("  predict              run the risk prediction\n");
    out.push_str("  reset                restore schema defaults\n");
    out.push_str("  show                 re-render the form\n");
    out.push_str("  legend               show model info and variable codes\n");
    out.push_str("  quit                 end the session\n\n");
    out.push_str("Parameters\n");
    for (i, param) in PARAMETERS.iter().enumerate() {
        out.push_str(&format!(
            "  [{:2}] {:<24} {}\n",
            i, param.name, param.description
        ));
    }
    out
}

/// Interactive session: transient parameter values plus the loaded engine.
pub struct Session {
    engine: InferenceEngine,
    record: InputRecord,
    color: bool,
}

impl Session {
    pub fn new(engine: InferenceEngine, color: bool) -> Self {
        Self {
            engine,
            record: InputRecord::defaults(),
            color,
        }
    }

    /// Current parameter values.
    pub fn record(&self) -> &InputRecord {
        &self.record
    }

    /// Handle one command line, returning the text to display. Recoverable
    /// errors come back as rendered messages; the session stays usable.
    pub fn handle(&mut self, line: &str) -> String {
        let command = match Command::parse(line) {
            Ok(command) => command,
            Err(e) => return format!("✗ {e}\n"),
        };

        match command {
            Command::Set { index, value } => match self.record.set(index, value) {
                Ok(stored) => {
                    let name = PARAMETERS[index].name;
                    if stored != value {
                        format!("{name} = {stored} (clamped from {value})\n")
                    } else {
                        format!("{name} = {stored}\n")
                    }
                }
                Err(e) => format!("✗ {e}\n"),
            },
            Command::Predict => self.predict(),
            Command::Reset => {
                self.record = InputRecord::defaults();
                render_form(&self.record)
            }
            Command::Show => render_form(&self.record),
            Command::Legend => render_legend(),
            Command::Help => render_help(),
            Command::Quit => String::new(),
        }
    }

    /// Run a prediction and render the results panel, then the importance
    /// view. A prediction error leaves the form usable; an importance error
    /// never hides the prediction result.
    fn predict(&self) -> String {
        let report = match self.engine.predict(&self.record) {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "Prediction failed");
                return format!(
                    "✗ Prediction failed: {e:#}\n  Check your input values and try again.\n"
                );
            }
        };

        let mut out = render_report(&report, self.color);
        match self.engine.importance_ranking() {
            Ok(Some(ranking)) => out.push_str(&render_importance(&ranking)),
            Ok(None) => out.push_str(&render_importance_unavailable(
                "the model exposes neither feature importances nor coefficients",
            )),
            Err(e) => {
                warn!(error = %e, "Importance retrieval failed");
                out.push_str(&render_importance_unavailable(&format!("{e:#}")));
            }
        }
        out
    }

    /// Drive the session over arbitrary reader/writer pairs until `quit`
    /// or end of input.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> Result<()> {
        writeln!(output, "{}", render_title())?;
        writeln!(output, "{}", render_form(&self.record))?;

        for line in input.lines() {
            let line = line?;
            if matches!(Command::parse(&line), Ok(Command::Quit)) {
                break;
            }
            writeln!(output, "{}", self.handle(&line))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_parsing() {
        assert_eq!(
            Command::parse("set 3 1").unwrap(),
            Command::Set { index: 3, value: 1 }
        );
        assert_eq!(Command::parse("predict").unwrap(), Command::Predict);
        assert_eq!(Command::parse("  quit ").unwrap(), Command::Quit);
        assert!(Command::parse("").is_err());
        assert!(Command::parse("set").is_err());
        assert!(Command::parse("set x 1").is_err());
        assert!(Command::parse("frobnicate").is_err());
    }

    #[test]
    fn test_form_lists_every_parameter() {
        let form = render_form(&InputRecord::defaults());
        for param in &PARAMETERS {
            assert!(form.contains(param.name), "form missing {}", param.name);
        }
        assert!(form.contains("[0-5]")); // ASA / mFI-5 range shown
    }

    #[test]
    fn test_form_is_idempotent() {
        let record = InputRecord::defaults();
        assert_eq!(render_form(&record), render_form(&record));
    }

    #[test]
    fn test_report_rendering_high_risk() {
        let report = PredictionReport::from_probability(0.73, false);
        let text = render_report(&report, false);
        assert!(text.contains("High Risk"));
        assert!(text.contains("73.0%"));
        assert!(!text.contains("raw class prediction"));
    }

    #[test]
    fn test_report_rendering_boundary_is_low_risk() {
        let report = PredictionReport::from_probability(0.5, false);
        let text = render_report(&report, false);
        assert!(text.contains("Low Risk"));
        assert!(text.contains("50.0%"));
    }

    #[test]
    fn test_report_color_cue() {
        let high = PredictionReport::from_probability(0.9, true);
        let text = render_report(&high, true);
        assert!(text.contains(RED));
        assert!(text.contains("raw class prediction"));

        let low = PredictionReport::from_probability(0.1, false);
        assert!(render_report(&low, true).contains(GREEN));
    }

    #[test]
    fn test_importance_rendering_sorted_with_bars() {
        use crate::models::importance::{ImportanceSource, ImportanceVector};

        let vector = ImportanceVector {
            source: ImportanceSource::FeatureImportances,
            weights: vec![0.1, 0.3, 0.05, 0.02, 0.08, 0.04, 0.06, 0.07, 0.09, 0.15, 0.04],
        };
        let ranking = ImportanceRanking::rank(&vector).unwrap();
        let text = render_importance(&ranking);

        let asa = text.find("ASA scores").unwrap();
        let mfi = text.find("mFI-5").unwrap();
        assert!(asa < mfi, "highest weight must render first");
        assert!(text.contains('█'));
    }

    #[test]
    fn test_importance_unavailable_is_a_warning() {
        let text = render_importance_unavailable("no importance data");
        assert!(text.contains("⚠"));
        assert!(text.contains("no importance data"));
    }

    #[test]
    fn test_legend_covers_coded_variables() {
        let legend = render_legend();
        assert!(legend.contains("ASA scores"));
        assert!(legend.contains("Meningioma"));
        assert!(legend.contains("Infratentorial intramedullary"));
    }

    #[test]
    fn test_help_covers_descriptions() {
        let help = render_help();
        for param in &PARAMETERS {
            assert!(help.contains(param.description));
        }
    }
}

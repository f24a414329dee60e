//! Feature importance ranking from artifact metadata.
//!
//! Tree classifiers export per-feature importances, linear models export
//! coefficients. Either is resolved once at artifact load and ranked against
//! the parameter schema on demand; a model may carry neither, in which case
//! the ranking is simply unavailable.

use crate::schema;
use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::fmt;

/// Where the importance weights came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportanceSource {
    /// Per-feature importances (tree ensembles)
    FeatureImportances,
    /// Linear coefficients, first class row (linear models)
    Coefficients,
}

impl fmt::Display for ImportanceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportanceSource::FeatureImportances => write!(f, "feature importances"),
            ImportanceSource::Coefficients => write!(f, "linear coefficients"),
        }
    }
}

/// Raw importance weights as resolved from the artifact, schema order.
#[derive(Debug, Clone)]
pub struct ImportanceVector {
    pub source: ImportanceSource,
    pub weights: Vec<f64>,
}

impl ImportanceVector {
    /// Parse an importance vector from a metadata JSON payload.
    ///
    /// Feature importances are a flat array. Coefficients may be flat or
    /// nested per class; for the nested form the first row is taken.
    pub fn from_metadata_json(source: ImportanceSource, json: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(json).context("Importance metadata is not valid JSON")?;

        let row: &Value = match (&value, source) {
            (Value::Array(items), ImportanceSource::Coefficients)
                if items.first().map(Value::is_array).unwrap_or(false) =>
            {
                &items[0]
            }
            (Value::Array(_), _) => &value,
            _ => bail!("Importance metadata is not a JSON array"),
        };

        let weights: Vec<f64> = row
            .as_array()
            .map(|items| items.iter().filter_map(Value::as_f64).collect())
            .unwrap_or_default();

        if weights.is_empty() {
            bail!("Importance metadata array is empty or non-numeric");
        }

        Ok(Self { source, weights })
    }
}

/// Importance weights paired with parameter names, sorted descending.
#[derive(Debug, Clone)]
pub struct ImportanceRanking {
    pub source: ImportanceSource,
    pub entries: Vec<(String, f64)>,
}

impl ImportanceRanking {
    /// Pair the weights with the schema names (order-aligned) and sort
    /// descending by weight. The vector length must match the schema.
    pub fn rank(vector: &ImportanceVector) -> Result<Self> {
        let names = schema::parameter_names();
        if vector.weights.len() != names.len() {
            bail!(
                "Importance vector has {} entries, schema has {}",
                vector.weights.len(),
                names.len()
            );
        }

        let mut entries: Vec<(String, f64)> = names
            .iter()
            .zip(&vector.weights)
            .map(|(name, &weight)| (name.to_string(), weight))
            .collect();
        entries.sort_by(|a, b| b.1.total_cmp(&a.1));

        Ok(Self {
            source: vector.source,
            entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flat_importances() {
        let json = "[0.1, 0.3, 0.05, 0.02, 0.08, 0.04, 0.06, 0.07, 0.09, 0.15, 0.04]";
        let vector =
            ImportanceVector::from_metadata_json(ImportanceSource::FeatureImportances, json)
                .unwrap();
        assert_eq!(vector.weights.len(), 11);
        assert_eq!(vector.weights[1], 0.3);
    }

    #[test]
    fn test_parse_nested_coefficients_takes_first_row() {
        let json = "[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]";
        let vector =
            ImportanceVector::from_metadata_json(ImportanceSource::Coefficients, json).unwrap();
        assert_eq!(vector.weights, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for json in ["not json", "{\"a\": 1}", "[]", "[\"x\"]"] {
            assert!(
                ImportanceVector::from_metadata_json(ImportanceSource::FeatureImportances, json)
                    .is_err(),
                "accepted {json:?}"
            );
        }
    }

    #[test]
    fn test_ranking_sorts_descending() {
        let weights = vec![0.1, 0.3, 0.05, 0.02, 0.08, 0.04, 0.06, 0.07, 0.09, 0.15, 0.04];
        let vector = ImportanceVector {
            source: ImportanceSource::FeatureImportances,
            weights,
        };

        let ranking = ImportanceRanking::rank(&vector).unwrap();
        assert_eq!(ranking.entries.len(), 11);
        assert_eq!(ranking.entries[0].0, "ASA scores");
        assert_eq!(ranking.entries[0].1, 0.3);
        assert_eq!(ranking.entries[1].0, "mFI-5");
        for pair in ranking.entries.windows(2) {
            assert!(pair[0].1 >= pair[1].1);
        }
    }

    #[test]
    fn test_ranking_rejects_length_mismatch() {
        let vector = ImportanceVector {
            source: ImportanceSource::Coefficients,
            weights: vec![1.0, 2.0],
        };
        assert!(ImportanceRanking::rank(&vector).is_err());
    }
}

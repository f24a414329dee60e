//! Parameter schema and input record for reoperation risk inference.
//!
//! The schema is the fixed, ordered definition of the clinical parameters the
//! classifier was trained on. Declaration order defines the column order of
//! the feature vector handed to the model; feeding columns in any other order
//! silently maps values to the wrong features.

use anyhow::{bail, Result};
use std::collections::HashMap;

/// One entry of the parameter schema: bounds, default, and help text.
#[derive(Debug, Clone, Copy)]
pub struct ParameterSpec {
    /// Parameter name as used during model training
    pub name: &'static str,
    /// Inclusive lower bound
    pub min: i64,
    /// Inclusive upper bound
    pub max: i64,
    /// Value the form is seeded with
    pub default: i64,
    /// Human-readable description shown as contextual help
    pub description: &'static str,
}

impl ParameterSpec {
    /// Clamp a raw value into this parameter's [min, max] range.
    pub fn clamp(&self, value: i64) -> i64 {
        value.clamp(self.min, self.max)
    }
}

/// The parameter schema, in the exact column order the model expects.
pub const PARAMETERS: [ParameterSpec; 11] = [
    ParameterSpec {
        name: "Sex",
        min: 0,
        max: 1,
        default: 0,
        description: "Patient gender (0=Female, 1=Male)",
    },
    ParameterSpec {
        name: "ASA scores",
        min: 0,
        max: 5,
        default: 2,
        description: "ASA physical status classification",
    },
    ParameterSpec {
        name: "tumor location",
        min: 1,
        max: 4,
        default: 2,
        description: "Tumor location code (1-4)",
    },
    ParameterSpec {
        name: "Benign or malignant",
        min: 0,
        max: 1,
        default: 0,
        description: "Tumor nature (0=Benign, 1=Malignant)",
    },
    ParameterSpec {
        name: "Admitted to NICU",
        min: 0,
        max: 1,
        default: 0,
        description: "NICU admission status",
    },
    ParameterSpec {
        name: "Duration of surgery",
        min: 0,
        max: 1,
        default: 0,
        description: "Surgery duration category",
    },
    ParameterSpec {
        name: "diabetes",
        min: 0,
        max: 1,
        default: 0,
        description: "Diabetes mellitus status",
    },
    ParameterSpec {
        name: "CHF",
        min: 0,
        max: 1,
        default: 0,
        description: "Congestive heart failure",
    },
    ParameterSpec {
        name: "Functional dependencies",
        min: 0,
        max: 1,
        default: 0,
        description: "Functional dependencies",
    },
    ParameterSpec {
        name: "mFI-5",
        min: 0,
        max: 5,
        default: 1,
        description: "Modified Frailty Index",
    },
    ParameterSpec {
        name: "Type of tumor",
        min: 1,
        max: 5,
        default: 2,
        description: "Tumor type code (1-5)",
    },
];

/// Number of parameters in the schema.
pub fn parameter_count() -> usize {
    PARAMETERS.len()
}

/// Parameter names in schema order.
pub fn parameter_names() -> Vec<&'static str> {
    PARAMETERS.iter().map(|p| p.name).collect()
}

/// A single row of parameter values, held in schema order.
///
/// Construction always re-projects into declaration order, so the iteration
/// order of the source mapping never leaks into the feature vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRecord {
    values: Vec<i64>,
}

impl InputRecord {
    /// Build a record seeded with the schema defaults.
    pub fn defaults() -> Self {
        Self {
            values: PARAMETERS.iter().map(|p| p.default).collect(),
        }
    }

    /// Build a record from a name-keyed mapping, re-projecting into schema
    /// order. Every schema parameter must be present; unknown names are
    /// rejected.
    pub fn from_map(map: &HashMap<String, i64>) -> Result<Self> {
        for name in map.keys() {
            if !PARAMETERS.iter().any(|p| p.name == name) {
                bail!("Unknown parameter: {name}");
            }
        }

        let mut values = Vec::with_capacity(PARAMETERS.len());
        for param in &PARAMETERS {
            match map.get(param.name) {
                Some(&v) => values.push(param.clamp(v)),
                None => bail!("Missing parameter: {}", param.name),
            }
        }
        Ok(Self { values })
    }

    /// Current value of the parameter at `index` (schema order).
    pub fn get(&self, index: usize) -> Option<i64> {
        self.values.get(index).copied()
    }

    /// Set the parameter at `index`, clamped to its schema bounds.
    /// Returns the stored value.
    pub fn set(&mut self, index: usize, value: i64) -> Result<i64> {
        let param = PARAMETERS
            .get(index)
            .ok_or_else(|| anyhow::anyhow!("No parameter at index {index}"))?;
        let clamped = param.clamp(value);
        self.values[index] = clamped;
        Ok(clamped)
    }

    /// Values in schema order.
    pub fn values(&self) -> &[i64] {
        &self.values
    }

    /// Feature vector for model input, in schema order.
    pub fn to_features(&self) -> Vec<f32> {
        self.values.iter().map(|&v| v as f32).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_shape() {
        assert_eq!(parameter_count(), 11);
        assert_eq!(parameter_names().len(), 11);
        assert_eq!(PARAMETERS[0].name, "Sex");
        assert_eq!(PARAMETERS[10].name, "Type of tumor");
    }

    #[test]
    fn test_bounds_are_sane() {
        for param in &PARAMETERS {
            assert!(param.min <= param.max, "{} has inverted bounds", param.name);
            assert!(
                (param.min..=param.max).contains(&param.default),
                "{} default out of range",
                param.name
            );
        }
    }

    #[test]
    fn test_defaults_match_schema() {
        let record = InputRecord::defaults();
        assert_eq!(record.values(), &[0, 2, 2, 0, 0, 0, 0, 0, 0, 1, 2]);
    }

    #[test]
    fn test_from_map_reprojects_into_schema_order() {
        // Insert in reverse schema order; the record must come out in
        // declaration order regardless.
        let mut map = HashMap::new();
        for (i, param) in PARAMETERS.iter().enumerate().rev() {
            map.insert(param.name.to_string(), i as i64 % 2);
        }

        let record = InputRecord::from_map(&map).unwrap();
        for (i, param) in PARAMETERS.iter().enumerate() {
            assert_eq!(record.get(i).unwrap(), param.clamp(i as i64 % 2));
        }
    }

    #[test]
    fn test_from_map_rejects_missing_and_unknown() {
        let mut map = HashMap::new();
        map.insert("Sex".to_string(), 1);
        assert!(InputRecord::from_map(&map).is_err());

        let mut map: HashMap<String, i64> = PARAMETERS
            .iter()
            .map(|p| (p.name.to_string(), p.default))
            .collect();
        map.insert("not a parameter".to_string(), 0);
        assert!(InputRecord::from_map(&map).is_err());
    }

    #[test]
    fn test_set_clamps_to_bounds() {
        let mut record = InputRecord::defaults();

        // ASA scores: [0, 5]
        assert_eq!(record.set(1, 99).unwrap(), 5);
        assert_eq!(record.set(1, -3).unwrap(), 0);
        // tumor location: [1, 4]
        assert_eq!(record.set(2, 0).unwrap(), 1);
        assert!(record.set(11, 1).is_err());
    }

    #[test]
    fn test_feature_vector_order() {
        let mut record = InputRecord::defaults();
        record.set(0, 1).unwrap();
        record.set(9, 4).unwrap();

        let features = record.to_features();
        assert_eq!(features.len(), 11);
        assert_eq!(features[0], 1.0); // Sex
        assert_eq!(features[1], 2.0); // ASA scores default
        assert_eq!(features[9], 4.0); // mFI-5
    }
}

//! Feature vector validation.
//!
//! Malformed vectors are reported, never raised: a failed validation is an
//! expected outcome the caller surfaces to the clinician.

use crate::core::features::{FeatureMap, FeatureVector};
use crate::core::schema::{Demographic, FeatureKey, EXERCISE_COUNT, FEATURE_COUNT};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Clinically expected age bounds, inclusive.
pub const MIN_AGE: f64 = 5.0;
pub const MAX_AGE: f64 = 15.0;

/// A single violation found in a feature vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationIssue {
    MissingDemographic { name: String },
    MissingExercise { name: String },
    WrongCount { actual: usize, expected: usize },
    AgeOutOfRange { value: f64 },
    NonBinary { name: String, value: f64 },
    NonFinite { name: String },
}

impl ValidationIssue {
    /// Name of the missing feature, if this issue is a missing key.
    pub fn missing_key(&self) -> Option<&str> {
        match self {
            ValidationIssue::MissingDemographic { name }
            | ValidationIssue::MissingExercise { name } => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::MissingDemographic { name } => {
                write!(f, "Falta feature demográfica: {name}")
            }
            ValidationIssue::MissingExercise { name } => {
                write!(f, "Falta feature de ejercicio: {name}")
            }
            ValidationIssue::WrongCount { actual, expected } => {
                write!(f, "Total de features incorrecto: {actual} (esperado: {expected})")
            }
            ValidationIssue::AgeOutOfRange { value } => {
                write!(f, "Edad fuera de rango: {value} (esperado: {MIN_AGE}-{MAX_AGE})")
            }
            ValidationIssue::NonBinary { name, value } => {
                write!(f, "{name} debe ser 0 o 1, recibido: {value}")
            }
            ValidationIssue::NonFinite { name } => {
                write!(f, "{name} no es un número finito")
            }
        }
    }
}

/// Outcome of validating a feature vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Human-readable description of every issue.
    pub fn descriptions(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    /// Names of all missing features.
    pub fn missing_keys(&self) -> Vec<&str> {
        self.errors
            .iter()
            .filter_map(ValidationIssue::missing_key)
            .collect()
    }
}

/// Validate a name-keyed feature map.
pub fn validate_features(features: &FeatureMap) -> ValidationReport {
    let mut errors = Vec::new();

    for demographic in Demographic::ALL {
        if !features.contains_key(demographic.name()) {
            errors.push(ValidationIssue::MissingDemographic {
                name: demographic.name().to_string(),
            });
        }
    }

    for ordinal in 1..=EXERCISE_COUNT as u8 {
        for key in FeatureKey::for_exercise(ordinal) {
            let name = key.name();
            if !features.contains_key(&name) {
                errors.push(ValidationIssue::MissingExercise { name });
            }
        }
    }

    if features.len() != FEATURE_COUNT {
        errors.push(ValidationIssue::WrongCount {
            actual: features.len(),
            expected: FEATURE_COUNT,
        });
    }

    for (name, value) in features {
        if !value.is_finite() {
            errors.push(ValidationIssue::NonFinite { name: name.clone() });
        }
    }

    if let Some(&age) = features.get(Demographic::Age.name()) {
        if age.is_finite() && !(MIN_AGE..=MAX_AGE).contains(&age) {
            errors.push(ValidationIssue::AgeOutOfRange { value: age });
        }
    }

    for demographic in Demographic::ALL.into_iter().filter(|d| d.is_binary()) {
        if let Some(&value) = features.get(demographic.name()) {
            if value.is_finite() && value != 0.0 && value != 1.0 {
                errors.push(ValidationIssue::NonBinary {
                    name: demographic.name().to_string(),
                    value,
                });
            }
        }
    }

    ValidationReport {
        is_valid: errors.is_empty(),
        errors,
    }
}

/// Validate an assembled vector.
pub fn validate_vector(vector: &FeatureVector) -> ValidationReport {
    validate_features(&vector.to_map())
}

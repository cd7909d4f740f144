//! Feature assembly from evaluation telemetry.
//!
//! This module turns a child profile and the per-exercise counters of an
//! evaluation into the fixed 196-slot vector consumed by the classifier.
//! Exercises without data are filled with a dataset-average profile.

use crate::core::schema::{Demographic, FeatureKey, Metric, EXERCISE_COUNT, FEATURE_COUNT};
use crate::evaluation::types::{EvaluationInput, ExerciseTelemetry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// String-keyed form of a feature vector, used at serialization boundaries.
pub type FeatureMap = BTreeMap<String, f64>;

/// Raw scores are divided by this before entering the model.
const SCORE_SCALE: f64 = 100.0;

/// Percentages are divided by this to obtain 0-1 ratios.
const PERCENT_SCALE: f64 = 100.0;

/// Errors converting a [`FeatureMap`] into a [`FeatureVector`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FeatureError {
    #[error("missing feature: {0}")]
    Missing(String),
    #[error("unknown feature: {0}")]
    Unknown(String),
}

/// A complete feature vector in canonical schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: [f64; FEATURE_COUNT],
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self {
            values: [0.0; FEATURE_COUNT],
        }
    }
}

impl FeatureVector {
    pub fn get(&self, key: FeatureKey) -> f64 {
        self.values[key.index()]
    }

    pub fn set(&mut self, key: FeatureKey, value: f64) {
        self.values[key.index()] = value;
    }

    /// Values in canonical order.
    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Values of one metric across all exercises, ordinal 1 first.
    pub fn metric_series(&self, metric: Metric) -> Vec<f64> {
        (1..=EXERCISE_COUNT as u8)
            .filter_map(|ordinal| FeatureKey::exercise(ordinal, metric))
            .map(|key| self.get(key))
            .collect()
    }

    /// Name-keyed copy of the vector.
    pub fn to_map(&self) -> FeatureMap {
        FeatureKey::all()
            .map(|key| (key.name(), self.get(key)))
            .collect()
    }

    /// Build a vector from a name-keyed map. Every schema key must be present
    /// and no other key may appear.
    pub fn try_from_map(map: &FeatureMap) -> Result<Self, FeatureError> {
        if let Some(name) = map.keys().find(|name| FeatureKey::parse(name).is_none()) {
            return Err(FeatureError::Unknown(name.clone()));
        }

        let mut vector = Self::default();
        for key in FeatureKey::all() {
            let name = key.name();
            let value = map.get(&name).ok_or(FeatureError::Missing(name))?;
            vector.set(key, *value);
        }
        Ok(vector)
    }
}

/// Values substituted for exercises without telemetry.
///
/// These approximate dataset-average behaviour. Zero-filling would push the
/// classifier toward pathological patterns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaddingProfile {
    pub clicks: f64,
    pub hits: f64,
    pub misses: f64,
    /// Already normalized (raw score / 100)
    pub score: f64,
    /// Ratio 0-1
    pub accuracy: f64,
    /// Ratio 0-1
    pub missrate: f64,
}

impl Default for PaddingProfile {
    fn default() -> Self {
        Self {
            clicks: 3.5,
            hits: 2.8,
            misses: 0.7,
            score: 0.05,
            accuracy: 0.80,
            missrate: 0.20,
        }
    }
}

impl PaddingProfile {
    fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Clicks => self.clicks,
            Metric::Hits => self.hits,
            Metric::Misses => self.misses,
            Metric::Score => self.score,
            Metric::Accuracy => self.accuracy,
            Metric::Missrate => self.missrate,
        }
    }
}

/// Result of feature assembly.
#[derive(Debug, Clone)]
pub struct AssembledFeatures {
    pub vector: FeatureVector,
    /// Number of exercises backed by real telemetry
    pub real_exercises: usize,
    /// Ordinals filled from the padding profile
    pub padded_ordinals: Vec<u8>,
    /// Ordinals present in the input but outside 1-32
    pub ignored_ordinals: Vec<u8>,
}

impl AssembledFeatures {
    pub fn padded_exercises(&self) -> usize {
        self.padded_ordinals.len()
    }
}

/// Assemble the 196-feature vector for an evaluation.
pub fn assemble_features(input: &EvaluationInput, padding: &PaddingProfile) -> AssembledFeatures {
    let mut vector = FeatureVector::default();

    let child = &input.child;
    vector.set(FeatureKey::Demographic(Demographic::Age), f64::from(child.age));
    vector.set(
        FeatureKey::Demographic(Demographic::GenderMale),
        binary(child.is_male),
    );
    vector.set(
        FeatureKey::Demographic(Demographic::NativelangYes),
        binary(child.native_language_match),
    );
    vector.set(
        FeatureKey::Demographic(Demographic::OtherlangYes),
        binary(child.has_other_languages),
    );

    let mut real_exercises = 0;
    let mut padded_ordinals = Vec::new();

    for ordinal in 1..=EXERCISE_COUNT as u8 {
        match input.exercises.get(&ordinal) {
            Some(telemetry) => {
                for key in FeatureKey::for_exercise(ordinal) {
                    vector.set(key, exercise_value(telemetry, key));
                }
                real_exercises += 1;
                if ordinal % 5 == 0 {
                    tracing::debug!(
                        ordinal,
                        clicks = telemetry.clicks,
                        hits = telemetry.hits,
                        accuracy = telemetry.accuracy_percent,
                        "exercise telemetry"
                    );
                }
            }
            None => {
                for key in FeatureKey::for_exercise(ordinal) {
                    if let FeatureKey::Exercise { metric, .. } = key {
                        vector.set(key, padding.value(metric));
                    }
                }
                padded_ordinals.push(ordinal);
            }
        }
    }

    let ignored_ordinals: Vec<u8> = input
        .exercises
        .keys()
        .copied()
        .filter(|ordinal| !(1..=EXERCISE_COUNT as u8).contains(ordinal))
        .collect();
    if !ignored_ordinals.is_empty() {
        tracing::warn!(?ignored_ordinals, "ignoring exercises outside 1-{EXERCISE_COUNT}");
    }

    if padded_ordinals.is_empty() {
        tracing::info!(real_exercises, "assembled features from complete evaluation");
    } else {
        tracing::warn!(
            real_exercises,
            padded_exercises = padded_ordinals.len(),
            "evaluation incomplete, missing exercises filled with dataset averages"
        );
    }

    AssembledFeatures {
        vector,
        real_exercises,
        padded_ordinals,
        ignored_ordinals,
    }
}

fn binary(flag: bool) -> f64 {
    if flag {
        1.0
    } else {
        0.0
    }
}

fn exercise_value(telemetry: &ExerciseTelemetry, key: FeatureKey) -> f64 {
    match key {
        FeatureKey::Exercise { metric, .. } => match metric {
            Metric::Clicks => f64::from(telemetry.clicks),
            Metric::Hits => f64::from(telemetry.hits),
            Metric::Misses => f64::from(telemetry.misses),
            Metric::Score => telemetry.score as f64 / SCORE_SCALE,
            Metric::Accuracy => telemetry.accuracy_percent / PERCENT_SCALE,
            Metric::Missrate => telemetry.missrate_percent / PERCENT_SCALE,
        },
        FeatureKey::Demographic(_) => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::types::ChildProfile;

    fn child() -> ChildProfile {
        ChildProfile {
            age: 9,
            is_male: true,
            native_language_match: true,
            has_other_languages: false,
        }
    }

    fn telemetry(accuracy: f64, missrate: f64) -> ExerciseTelemetry {
        ExerciseTelemetry {
            clicks: 5,
            hits: 5,
            misses: 0,
            score: 250,
            accuracy_percent: accuracy,
            missrate_percent: missrate,
        }
    }

    #[test]
    fn test_demographics() {
        let input = EvaluationInput::new(child());
        let assembled = assemble_features(&input, &PaddingProfile::default());
        let v = &assembled.vector;

        assert_eq!(v.get(FeatureKey::Demographic(Demographic::Age)), 9.0);
        assert_eq!(v.get(FeatureKey::Demographic(Demographic::GenderMale)), 1.0);
        assert_eq!(v.get(FeatureKey::Demographic(Demographic::NativelangYes)), 1.0);
        assert_eq!(v.get(FeatureKey::Demographic(Demographic::OtherlangYes)), 0.0);
    }

    #[test]
    fn test_feature_count_independent_of_completeness() {
        for completed in [0u8, 1, 16, 31, 32] {
            let mut input = EvaluationInput::new(child());
            for ordinal in 1..=completed {
                input.exercises.insert(ordinal, telemetry(90.0, 10.0));
            }
            let assembled = assemble_features(&input, &PaddingProfile::default());
            assert_eq!(assembled.vector.to_map().len(), FEATURE_COUNT);
            assert_eq!(assembled.real_exercises, usize::from(completed));
            assert_eq!(
                assembled.padded_exercises(),
                EXERCISE_COUNT - usize::from(completed)
            );
        }
    }

    #[test]
    fn test_normalization() {
        let input = EvaluationInput::new(child()).with_exercise(4, telemetry(100.0, 0.0));
        let assembled = assemble_features(&input, &PaddingProfile::default());
        let v = &assembled.vector;

        let key = |metric| FeatureKey::exercise(4, metric).unwrap();
        assert_eq!(v.get(key(Metric::Accuracy)), 1.0);
        assert_eq!(v.get(key(Metric::Missrate)), 0.0);
        assert_eq!(v.get(key(Metric::Score)), 2.5);
        assert_eq!(v.get(key(Metric::Clicks)), 5.0);
    }

    #[test]
    fn test_padding_uses_dataset_averages() {
        let input = EvaluationInput::new(child());
        let assembled = assemble_features(&input, &PaddingProfile::default());
        let v = &assembled.vector;

        let key = |metric| FeatureKey::exercise(12, metric).unwrap();
        assert_eq!(v.get(key(Metric::Clicks)), 3.5);
        assert_eq!(v.get(key(Metric::Hits)), 2.8);
        assert_eq!(v.get(key(Metric::Misses)), 0.7);
        assert_eq!(v.get(key(Metric::Score)), 0.05);
        assert_eq!(v.get(key(Metric::Accuracy)), 0.80);
        assert_eq!(v.get(key(Metric::Missrate)), 0.20);
        assert_eq!(assembled.padded_ordinals, (1..=32).collect::<Vec<u8>>());
    }

    #[test]
    fn test_inconsistent_telemetry_is_kept() {
        let odd = ExerciseTelemetry {
            clicks: 2,
            hits: 3,
            misses: 4,
            score: 0,
            accuracy_percent: 150.0,
            missrate_percent: 200.0,
        };
        let input = EvaluationInput::new(child()).with_exercise(1, odd);
        let v = assemble_features(&input, &PaddingProfile::default()).vector;

        assert_eq!(v.get(FeatureKey::exercise(1, Metric::Hits).unwrap()), 3.0);
        assert_eq!(v.get(FeatureKey::exercise(1, Metric::Misses).unwrap()), 4.0);
        assert_eq!(v.get(FeatureKey::exercise(1, Metric::Accuracy).unwrap()), 1.5);
    }

    #[test]
    fn test_out_of_range_ordinals_are_ignored() {
        let input = EvaluationInput::new(child())
            .with_exercise(0, telemetry(50.0, 50.0))
            .with_exercise(40, telemetry(50.0, 50.0));
        let assembled = assemble_features(&input, &PaddingProfile::default());

        assert_eq!(assembled.real_exercises, 0);
        assert_eq!(assembled.ignored_ordinals, vec![0, 40]);
    }

    #[test]
    fn test_map_conversion() {
        let input = EvaluationInput::new(child()).with_exercise(2, telemetry(80.0, 20.0));
        let vector = assemble_features(&input, &PaddingProfile::default()).vector;

        let mut map = vector.to_map();
        assert_eq!(FeatureVector::try_from_map(&map), Ok(vector));

        map.remove("Hits2");
        assert_eq!(
            FeatureVector::try_from_map(&map),
            Err(FeatureError::Missing("Hits2".to_string()))
        );

        map.insert("Hits2".to_string(), 1.0);
        map.insert("Speed2".to_string(), 1.0);
        assert_eq!(
            FeatureVector::try_from_map(&map),
            Err(FeatureError::Unknown("Speed2".to_string()))
        );
    }

    #[test]
    fn test_metric_series() {
        let input = EvaluationInput::new(child()).with_exercise(1, telemetry(100.0, 0.0));
        let vector = assemble_features(&input, &PaddingProfile::default()).vector;
        let accuracy = vector.metric_series(Metric::Accuracy);

        assert_eq!(accuracy.len(), EXERCISE_COUNT);
        assert_eq!(accuracy[0], 1.0);
        assert_eq!(accuracy[1], 0.80);
    }
}

//! Synthetic artifact set shared by the integration tests.
//!
//! The classifier is a single sigmoid unit weighting every `Accuracy<i>` by
//! -0.5 and every `Missrate<i>` by +0.5 behind an identity scaler. Features
//! are listed in reverse canonical order so column reordering is exercised.

#![allow(dead_code)]

use dislexia_predictor::core::schema::{FeatureKey, Metric};
use dislexia_predictor::evaluation::{ChildProfile, EvaluationInput, ExerciseTelemetry};
use serde_json::json;
use std::path::Path;

pub const VERSION: &str = "v2.2";
pub const THRESHOLD: f64 = 0.635;

pub fn model_columns() -> Vec<FeatureKey> {
    let mut keys: Vec<FeatureKey> = FeatureKey::all().collect();
    keys.reverse();
    keys
}

fn weight(key: FeatureKey) -> f64 {
    match key {
        FeatureKey::Exercise {
            metric: Metric::Accuracy,
            ..
        } => -0.5,
        FeatureKey::Exercise {
            metric: Metric::Missrate,
            ..
        } => 0.5,
        _ => 0.0,
    }
}

pub struct Fixture {
    pub scaler_version: String,
    pub scale: Vec<f64>,
    pub threshold: Option<f64>,
    pub calibration: Option<serde_json::Value>,
    pub metrics: bool,
}

impl Default for Fixture {
    fn default() -> Self {
        Self {
            scaler_version: VERSION.to_string(),
            scale: vec![1.0; 196],
            threshold: Some(THRESHOLD),
            calibration: None,
            metrics: true,
        }
    }
}

impl Fixture {
    pub fn write(&self, dir: &Path) {
        let columns = model_columns();
        let weights: Vec<Vec<f64>> = columns.iter().map(|&key| vec![weight(key)]).collect();
        let names: Vec<String> = columns.iter().map(|key| key.name()).collect();

        let mut classifier = json!({
            "version": VERSION,
            "architecture": "Deep Feedforward Neural Network",
            "layers": [{"weights": weights, "bias": [0.0], "activation": "sigmoid"}],
            "metrics": {
                "roc_auc": 0.8210,
                "precision": 0.4167,
                "recall": 0.6019,
                "f1_score": 0.4924,
                "accuracy": 0.8671
            }
        });
        if !self.metrics {
            classifier.as_object_mut().unwrap().remove("metrics");
        }
        let scaler = json!({
            "version": self.scaler_version,
            "mean": vec![0.0; 196],
            "scale": self.scale,
        });

        std::fs::write(dir.join("classifier.json"), classifier.to_string()).unwrap();
        std::fs::write(dir.join("scaler.json"), scaler.to_string()).unwrap();
        std::fs::write(dir.join("features.json"), json!({ "features": names }).to_string())
            .unwrap();
        if let Some(threshold) = self.threshold {
            std::fs::write(
                dir.join("threshold.json"),
                json!({ "optimal_threshold_f1": threshold }).to_string(),
            )
            .unwrap();
        }
        if let Some(calibration) = &self.calibration {
            std::fs::write(dir.join("calibration.json"), calibration.to_string()).unwrap();
        }
    }
}

pub fn write_artifacts(dir: &Path) {
    Fixture::default().write(dir);
}

pub fn child() -> ChildProfile {
    ChildProfile {
        age: 9,
        is_male: true,
        native_language_match: true,
        has_other_languages: false,
    }
}

pub fn telemetry(accuracy: f64, missrate: f64) -> ExerciseTelemetry {
    ExerciseTelemetry {
        clicks: 5,
        hits: 5,
        misses: 0,
        score: 250,
        accuracy_percent: accuracy,
        missrate_percent: missrate,
    }
}

/// Every exercise played at the same accuracy and miss rate.
pub fn uniform_evaluation(accuracy: f64, missrate: f64) -> EvaluationInput {
    (1..=32).fold(EvaluationInput::new(child()), |input, ordinal| {
        input.with_exercise(ordinal, telemetry(accuracy, missrate))
    })
}

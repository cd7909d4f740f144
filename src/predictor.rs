//! Predictor: turns a feature vector into a clinician-facing result.
//!
//! Every call returns a well-formed outcome. A missing model switches to
//! simulation scoring, an inference error becomes an error-flagged result.

use crate::core::features::{assemble_features, FeatureVector};
use crate::core::report::{
    FeatureCoverage, ModelInfo, PredictionFailure, PredictionOutcome, PredictionResult,
    PredictorMode, ScreeningReport,
};
use crate::core::risk::{self, RiskBands, SIMULATION_DISCLAIMER};
use crate::core::schema::{Metric, FEATURE_COUNT};
use crate::core::validation::validate_vector;
use crate::evaluation::{EvaluationInput, EvaluationSummary};
use crate::model::{global_cache, Calibration, LoadedModel, ModelCache, ModelState};
use crate::transparency::{SharedTransparencyLog, TransparencyLog};
use statrs::statistics::Statistics;
use std::sync::Arc;

/// Version reported when no model is loaded.
pub const REFERENCE_MODEL_VERSION: &str = "v2.2";

/// Architecture reported when no model is loaded.
pub const REFERENCE_ARCHITECTURE: &str = "Deep Feedforward Neural Network";

const SIMULATION_THRESHOLD: f64 = 0.5;
const SIMULATION_CONFIDENCE: f64 = 0.6;

/// Scores feature vectors against the cached model.
#[derive(Debug, Clone)]
pub struct Predictor {
    cache: Arc<ModelCache>,
    log: Option<SharedTransparencyLog>,
}

impl Predictor {
    pub fn new(cache: Arc<ModelCache>) -> Self {
        Self { cache, log: None }
    }

    /// Predictor backed by the process-wide cache.
    pub fn global() -> Self {
        Self::new(global_cache())
    }

    /// Count outcomes in a transparency log.
    pub fn with_log(mut self, log: SharedTransparencyLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn cache(&self) -> &Arc<ModelCache> {
        &self.cache
    }

    /// Calibration in effect: the model's when loaded, the fallback otherwise.
    pub fn calibration(&self) -> Calibration {
        match self.cache.ensure_loaded() {
            ModelState::Ready(model) => model.calibration.clone(),
            ModelState::Degraded(_) => self.cache.fallback_calibration().clone(),
        }
    }

    /// Score a feature vector.
    pub fn predict(&self, vector: &FeatureVector) -> PredictionOutcome {
        let state = self.cache.ensure_loaded();
        self.predict_with(&state, vector)
    }

    fn predict_with(&self, state: &ModelState, vector: &FeatureVector) -> PredictionOutcome {
        match state {
            ModelState::Ready(model) => self.score(model, vector),
            ModelState::Degraded(_) => {
                self.record(|log| log.record_simulated());
                PredictionOutcome::Scored(simulate(vector, &self.cache.fallback_calibration().risk_bands))
            }
        }
    }

    fn score(&self, model: &LoadedModel, vector: &FeatureVector) -> PredictionOutcome {
        let probability = match model.predict_proba(vector) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = %e, version = %model.version, "inference failed");
                self.record(|log| log.record_inference_failure());
                return PredictionOutcome::Failed(PredictionFailure::new(e));
            }
        };

        let threshold = model.threshold;
        let positive = risk::is_positive(probability, threshold);
        let confidence = risk::confidence(probability, threshold);
        let level = model.calibration.risk_bands.classify(probability);

        tracing::info!(
            probability,
            threshold,
            positive,
            risk = %level,
            "prediction"
        );
        self.record(|log| log.record_scored());

        PredictionOutcome::Scored(PredictionResult {
            has_dyslexia: positive,
            probability,
            probability_percent: risk::as_percent(probability),
            confidence,
            confidence_percent: risk::as_percent(confidence),
            risk_level: level,
            classification: risk::classification_label(positive).to_string(),
            threshold_used: threshold,
            recommendation: risk::recommendation(positive, probability, level).to_string(),
            disclaimer: risk::disclaimer(model.calibration.validated_accuracy),
            model_version: Some(model.version.clone()),
            simulated: None,
        })
    }

    /// Describe the model currently backing predictions.
    pub fn model_info(&self) -> ModelInfo {
        match self.cache.ensure_loaded() {
            ModelState::Ready(model) => ModelInfo {
                loaded: true,
                mode: PredictorMode::Production,
                version: model.version.clone(),
                total_features: FEATURE_COUNT,
                threshold: model.threshold,
                architecture: model.architecture.clone(),
                metrics: model.metrics,
                degraded_reason: None,
            },
            ModelState::Degraded(reason) => ModelInfo {
                loaded: false,
                mode: PredictorMode::Simulation,
                version: REFERENCE_MODEL_VERSION.to_string(),
                total_features: FEATURE_COUNT,
                threshold: SIMULATION_THRESHOLD,
                architecture: REFERENCE_ARCHITECTURE.to_string(),
                metrics: None,
                degraded_reason: Some(reason),
            },
        }
    }

    /// Screen a whole evaluation: summarize, assemble, validate, predict.
    pub fn screen(&self, input: &EvaluationInput) -> ScreeningReport {
        self.record(|log| log.record_screening());
        let summary = EvaluationSummary::from_input(input);

        let state = self.cache.ensure_loaded();
        let padding = match &state {
            ModelState::Ready(model) => model.calibration.padding.clone(),
            ModelState::Degraded(_) => self.cache.fallback_calibration().padding.clone(),
        };

        let assembled = assemble_features(input, &padding);
        self.record(|log| log.record_padded_exercises(assembled.padded_exercises() as u64));

        let validation = validate_vector(&assembled.vector);
        if !validation.is_valid {
            tracing::warn!(
                evaluation_id = ?input.evaluation_id,
                errors = validation.errors.len(),
                "feature vector rejected"
            );
            self.record(|log| log.record_validation_failure());
            return ScreeningReport::rejected(summary, validation.descriptions());
        }

        let prediction = self.predict_with(&state, &assembled.vector);
        let coverage = FeatureCoverage {
            real_exercises: assembled.real_exercises,
            padded_exercises: assembled.padded_exercises(),
        };
        ScreeningReport::scored(summary, coverage, prediction, self.model_info())
    }

    fn record(&self, f: impl FnOnce(&TransparencyLog)) {
        if let Some(log) = &self.log {
            f(log);
        }
    }
}

/// Simulated score used when no model is available.
///
/// Probability is one minus the mean exercise accuracy, so poor performance
/// still reads as higher risk.
pub fn simulate(vector: &FeatureVector, bands: &RiskBands) -> PredictionResult {
    let accuracy = vector.metric_series(Metric::Accuracy);
    let mean_accuracy = if accuracy.is_empty() {
        0.0
    } else {
        accuracy.iter().mean()
    };
    let probability = if mean_accuracy.is_finite() {
        (1.0 - mean_accuracy).clamp(0.0, 1.0)
    } else {
        SIMULATION_THRESHOLD
    };

    let positive = risk::is_positive(probability, SIMULATION_THRESHOLD);
    let level = bands.classify(probability);

    tracing::warn!(probability, "simulated prediction");

    PredictionResult {
        has_dyslexia: positive,
        probability,
        probability_percent: risk::as_percent(probability),
        confidence: SIMULATION_CONFIDENCE,
        confidence_percent: risk::as_percent(SIMULATION_CONFIDENCE),
        risk_level: level,
        classification: risk::classification_label(positive).to_string(),
        threshold_used: SIMULATION_THRESHOLD,
        recommendation: format!(
            "PREDICCIÓN SIMULADA (accuracy promedio: {:.1}%). {}",
            mean_accuracy * 100.0,
            risk::recommendation(positive, probability, level)
        ),
        disclaimer: SIMULATION_DISCLAIMER.to_string(),
        model_version: None,
        simulated: Some(true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::features::PaddingProfile;
    use crate::core::risk::RiskLevel;
    use crate::core::schema::FeatureKey;
    use crate::evaluation::{ChildProfile, ExerciseTelemetry};
    use crate::transparency::create_shared_log;
    use tempfile::TempDir;

    fn child() -> ChildProfile {
        ChildProfile {
            age: 9,
            is_male: true,
            native_language_match: true,
            has_other_languages: false,
        }
    }

    fn vector_with_accuracy(accuracy: f64) -> FeatureVector {
        let mut vector = assemble_features(&EvaluationInput::new(child()), &PaddingProfile::default()).vector;
        for ordinal in 1..=32 {
            vector.set(FeatureKey::exercise(ordinal, Metric::Accuracy).unwrap(), accuracy);
        }
        vector
    }

    fn degraded_predictor(dir: &TempDir) -> Predictor {
        let cache = Arc::new(ModelCache::new(dir.path(), Calibration::default()));
        cache.force_failed("no model");
        Predictor::new(cache)
    }

    #[test]
    fn test_simulation_from_accuracy() {
        let result = simulate(&vector_with_accuracy(0.1), &RiskBands::default());

        assert!((result.probability - 0.9).abs() < 1e-9);
        assert!(result.has_dyslexia);
        assert_eq!(result.risk_level, RiskLevel::High);
        assert_eq!(result.confidence, 0.6);
        assert_eq!(result.threshold_used, 0.5);
        assert_eq!(result.simulated, Some(true));
        assert!(result
            .recommendation
            .starts_with("PREDICCIÓN SIMULADA (accuracy promedio: 10.0%)"));
        assert!(result.disclaimer.starts_with("MODO SIMULACIÓN"));
    }

    #[test]
    fn test_simulation_good_performance() {
        let result = simulate(&vector_with_accuracy(0.95), &RiskBands::default());
        assert!(!result.has_dyslexia);
        assert_eq!(result.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_degraded_predict_never_fails() {
        let dir = TempDir::new().unwrap();
        let log = create_shared_log();
        let predictor = degraded_predictor(&dir).with_log(log.clone());

        let outcome = predictor.predict(&vector_with_accuracy(0.5));
        let result = outcome.result().expect("simulated result");
        assert!(result.is_simulated());
        assert_eq!(log.stats().simulated_predictions, 1);
    }

    #[test]
    fn test_degraded_model_info() {
        let dir = TempDir::new().unwrap();
        let info = degraded_predictor(&dir).model_info();

        assert!(!info.loaded);
        assert_eq!(info.mode, PredictorMode::Simulation);
        assert_eq!(info.version, REFERENCE_MODEL_VERSION);
        assert_eq!(info.total_features, 196);
        assert_eq!(info.degraded_reason.as_deref(), Some("no model"));
        assert!(info.metrics.is_none());

        let json = serde_json::to_value(&info).unwrap();
        assert!(json.get("metricas").is_none());
        assert_eq!(json["motivo"], "no model");
    }

    #[test]
    fn test_screen_rejects_out_of_range_age() {
        let dir = TempDir::new().unwrap();
        let log = create_shared_log();
        let predictor = degraded_predictor(&dir).with_log(log.clone());

        let mut young = child();
        young.age = 3;
        let telemetry = ExerciseTelemetry {
            clicks: 5,
            hits: 5,
            misses: 0,
            score: 100,
            accuracy_percent: 100.0,
            missrate_percent: 0.0,
        };
        let input = EvaluationInput::new(young).with_exercise(1, telemetry);
        let report = predictor.screen(&input);

        assert!(!report.success);
        assert_eq!(report.error.as_deref(), Some("Features inválidas"));
        assert!(report.prediction.is_none());
        assert!(report.validation_errors[0].contains("Edad"));
        assert_eq!(log.stats().validation_failures, 1);
        assert_eq!(log.stats().padded_exercises, 31);
    }
}

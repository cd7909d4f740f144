//! Result types handed back to the persistence and report layer.
//!
//! Field names follow the wire contract consumed by the clinician-facing
//! reports, so they are Spanish on the wire and English in Rust.

use crate::core::risk::RiskLevel;
use crate::evaluation::EvaluationSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The name of this producer.
pub const PRODUCER_NAME: &str = "dislexia-predictor";

/// A scored prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    #[serde(rename = "tiene_dislexia")]
    pub has_dyslexia: bool,
    #[serde(rename = "probabilidad")]
    pub probability: f64,
    #[serde(rename = "probabilidad_porcentaje")]
    pub probability_percent: f64,
    #[serde(rename = "confianza")]
    pub confidence: f64,
    #[serde(rename = "confianza_porcentaje")]
    pub confidence_percent: f64,
    #[serde(rename = "nivel_riesgo")]
    pub risk_level: RiskLevel,
    #[serde(rename = "clasificacion")]
    pub classification: String,
    #[serde(rename = "umbral_utilizado")]
    pub threshold_used: f64,
    #[serde(rename = "recomendacion")]
    pub recommendation: String,
    pub disclaimer: String,
    /// Version of the artifact set that produced the score
    #[serde(rename = "version_modelo", default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    /// Present and true only for simulated scores
    #[serde(rename = "simulacion", default, skip_serializing_if = "Option::is_none")]
    pub simulated: Option<bool>,
}

impl PredictionResult {
    pub fn is_simulated(&self) -> bool {
        self.simulated == Some(true)
    }
}

/// Error-flagged response returned when inference fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionFailure {
    pub error: bool,
    #[serde(rename = "mensaje")]
    pub message: String,
    #[serde(rename = "tiene_dislexia")]
    pub has_dyslexia: Option<bool>,
    #[serde(rename = "probabilidad")]
    pub probability: Option<f64>,
}

impl PredictionFailure {
    pub fn new(detail: impl std::fmt::Display) -> Self {
        Self {
            error: true,
            message: format!("Error al realizar la predicción: {detail}"),
            has_dyslexia: None,
            probability: None,
        }
    }
}

/// What the predictor hands back. Always well-formed, never a raised error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictionOutcome {
    Scored(PredictionResult),
    Failed(PredictionFailure),
}

impl PredictionOutcome {
    pub fn result(&self) -> Option<&PredictionResult> {
        match self {
            PredictionOutcome::Scored(result) => Some(result),
            PredictionOutcome::Failed(_) => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, PredictionOutcome::Failed(_))
    }
}

/// Performance figures recorded when the model was validated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub roc_auc: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub accuracy: f64,
}

/// Operating mode of the predictor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredictorMode {
    #[serde(rename = "producción")]
    Production,
    #[serde(rename = "simulación")]
    Simulation,
}

/// Description of the model currently backing predictions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    #[serde(rename = "modelo_cargado")]
    pub loaded: bool,
    #[serde(rename = "modo")]
    pub mode: PredictorMode,
    pub version: String,
    pub total_features: usize,
    #[serde(rename = "umbral")]
    pub threshold: f64,
    #[serde(rename = "arquitectura")]
    pub architecture: String,
    /// Validation metrics shipped with the loaded model, if any
    #[serde(rename = "metricas", default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<ModelMetrics>,
    /// Why the model is unavailable, in simulation mode
    #[serde(rename = "motivo", default, skip_serializing_if = "Option::is_none")]
    pub degraded_reason: Option<String>,
}

/// How the feature vector of a screening was put together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureCoverage {
    #[serde(rename = "ejercicios_reales")]
    pub real_exercises: usize,
    #[serde(rename = "ejercicios_rellenados")]
    pub padded_exercises: usize,
}

/// Producer metadata stamped on every report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
}

impl Default for Producer {
    fn default() -> Self {
        Self {
            name: PRODUCER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Full result of screening one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningReport {
    pub report_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub producer: Producer,
    pub success: bool,
    #[serde(rename = "evaluacion")]
    pub evaluation: EvaluationSummary,
    #[serde(rename = "cobertura", default, skip_serializing_if = "Option::is_none")]
    pub coverage: Option<FeatureCoverage>,
    #[serde(rename = "prediccion", default, skip_serializing_if = "Option::is_none")]
    pub prediction: Option<PredictionOutcome>,
    #[serde(rename = "modelo_info", default, skip_serializing_if = "Option::is_none")]
    pub model_info: Option<ModelInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(
        rename = "errores_validacion",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub validation_errors: Vec<String>,
}

impl ScreeningReport {
    /// Report for an evaluation that produced a prediction.
    pub fn scored(
        evaluation: EvaluationSummary,
        coverage: FeatureCoverage,
        prediction: PredictionOutcome,
        model_info: ModelInfo,
    ) -> Self {
        Self {
            report_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            producer: Producer::default(),
            success: true,
            evaluation,
            coverage: Some(coverage),
            prediction: Some(prediction),
            model_info: Some(model_info),
            error: None,
            validation_errors: Vec::new(),
        }
    }

    /// Report for an evaluation whose features did not validate.
    pub fn rejected(evaluation: EvaluationSummary, validation_errors: Vec<String>) -> Self {
        Self {
            report_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            producer: Producer::default(),
            success: false,
            evaluation,
            coverage: None,
            prediction: None,
            model_info: None,
            error: Some("Features inválidas".to_string()),
            validation_errors,
        }
    }

    /// Convert to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Convert to a pretty-printed JSON string.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

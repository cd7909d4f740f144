//! Decision procedure applied to a model probability.
//!
//! Classification uses the tuned threshold shipped with the model. The risk
//! bands are a separate, coarser scale meant for communicating gradation to
//! clinicians; they do not depend on the threshold.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Negative results below this probability get the "clear result" wording.
pub const CLEAR_RESULT_CEILING: f64 = 0.2;

/// Validated accuracy of the reference model, quoted in the disclaimer.
pub const REFERENCE_ACCURACY: f64 = 0.86;

/// Three-level risk communication tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    #[serde(rename = "BAJO")]
    Low,
    #[serde(rename = "MEDIO")]
    Medium,
    #[serde(rename = "ALTO")]
    High,
}

impl RiskLevel {
    pub fn label(self) -> &'static str {
        match self {
            RiskLevel::Low => "BAJO",
            RiskLevel::Medium => "MEDIO",
            RiskLevel::High => "ALTO",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Probability cut points for the risk bands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskBands {
    /// Probabilities at or above this are at least MEDIUM
    pub medium_from: f64,
    /// Probabilities at or above this are HIGH
    pub high_from: f64,
}

impl Default for RiskBands {
    fn default() -> Self {
        Self {
            medium_from: 0.35,
            high_from: 0.75,
        }
    }
}

impl RiskBands {
    /// Cut points must be ordered and lie within [0, 1].
    pub fn is_well_formed(&self) -> bool {
        (0.0..=1.0).contains(&self.medium_from)
            && (0.0..=1.0).contains(&self.high_from)
            && self.medium_from <= self.high_from
    }

    pub fn classify(&self, probability: f64) -> RiskLevel {
        if probability < self.medium_from {
            RiskLevel::Low
        } else if probability < self.high_from {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }
}

/// Positive (risk present) iff the probability reaches the threshold.
pub fn is_positive(probability: f64, threshold: f64) -> bool {
    probability >= threshold
}

/// Confidence in the classification, in [0, 1].
///
/// Distance above the threshold is scaled by `1 - threshold`, distance below
/// it by `threshold`, so both sides reach 1.0 at the extremes.
pub fn confidence(probability: f64, threshold: f64) -> f64 {
    let (distance, span) = if is_positive(probability, threshold) {
        (probability - threshold, 1.0 - threshold)
    } else {
        (threshold - probability, threshold)
    };

    if span <= 0.0 {
        return 1.0;
    }
    (distance / span).clamp(0.0, 1.0)
}

/// Human-readable classification label.
pub fn classification_label(positive: bool) -> &'static str {
    if positive {
        "Dislexia Detectada"
    } else {
        "Sin Dislexia"
    }
}

/// Clinical recommendation for a classified probability.
pub fn recommendation(positive: bool, probability: f64, level: RiskLevel) -> &'static str {
    match (positive, level) {
        (true, RiskLevel::High) => {
            "Se recomienda encarecidamente una evaluación neuropsicológica completa \
             por parte de un profesional especializado. Los indicadores sugieren una \
             alta probabilidad de dislexia que requiere atención profesional inmediata \
             para desarrollar un plan de intervención personalizado."
        }
        (true, RiskLevel::Medium) => {
            "Se sugiere realizar una evaluación profesional más detallada. \
             Los resultados indican indicadores de dislexia que deberían ser \
             confirmados por un especialista. Considere programar una consulta \
             con un neuropsicólogo para obtener un diagnóstico preciso."
        }
        (true, RiskLevel::Low) => {
            "Aunque los indicadores sugieren la presencia de dislexia, la probabilidad \
             es relativamente baja. Se recomienda mantener seguimiento del desarrollo \
             cognitivo y considerar una evaluación profesional si las dificultades persisten."
        }
        (false, _) if probability < CLEAR_RESULT_CEILING => {
            "Los resultados no indican signos significativos de dislexia. \
             El desempeño en las evaluaciones cognitivas se encuentra dentro \
             de los rangos esperados. Se recomienda continuar con el seguimiento \
             regular del desarrollo académico."
        }
        (false, _) => {
            "Aunque no se detectó dislexia, algunos indicadores están cerca del umbral. \
             Se recomienda mantener seguimiento y considerar reforzar las áreas \
             que mostraron un desempeño ligeramente por debajo del promedio."
        }
    }
}

/// Disclaimer attached to every model-backed result.
pub fn disclaimer(validated_accuracy: f64) -> String {
    format!(
        "IMPORTANTE: Este análisis es una herramienta de apoyo basada en inteligencia artificial \
         y NO constituye un diagnóstico médico oficial. Los resultados deben ser interpretados \
         por un profesional de la salud calificado (neuropsicólogo, psicólogo educativo o \
         especialista en dislexia). Este sistema tiene una precisión aproximada del {:.0}% según \
         validaciones con datasets de referencia, pero puede variar según el caso individual. \
         Siempre consulte con un profesional antes de tomar decisiones sobre el tratamiento.",
        validated_accuracy * 100.0
    )
}

/// Disclaimer attached to simulated results.
pub const SIMULATION_DISCLAIMER: &str =
    "MODO SIMULACIÓN: El modelo real no está disponible. Esta es una predicción de prueba.";

/// Round to two decimals, as shown in reports.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Ratio in [0, 1] expressed as a percentage with two decimals.
pub fn as_percent(ratio: f64) -> f64 {
    round2(ratio * 100.0)
}

//! Core screening logic.
//!
//! This module contains:
//! - The compile-time feature schema
//! - Feature assembly from evaluation telemetry
//! - Feature validation
//! - The threshold and risk-band decision procedure
//! - Result types for the report layer

pub mod features;
pub mod report;
pub mod risk;
pub mod schema;
pub mod validation;

// Re-export commonly used types
pub use features::{
    assemble_features, AssembledFeatures, FeatureError, FeatureMap, FeatureVector, PaddingProfile,
};
pub use report::{
    FeatureCoverage, ModelInfo, ModelMetrics, PredictionFailure, PredictionOutcome,
    PredictionResult, PredictorMode, ScreeningReport, PRODUCER_NAME,
};
pub use risk::{RiskBands, RiskLevel};
pub use schema::{Demographic, FeatureKey, Metric, EXERCISE_COUNT, FEATURE_COUNT};
pub use validation::{validate_features, validate_vector, ValidationIssue, ValidationReport};

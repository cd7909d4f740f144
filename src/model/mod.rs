//! Classifier artifacts, inference, and the process-wide model cache.
//!
//! The artifact set on disk is versioned as a unit:
//! - `classifier.json`: dense network weights
//! - `scaler.json`: standard-scaler statistics
//! - `features.json`: the 196 feature names in model column order
//! - `threshold.json`: the tuned decision threshold
//! - `calibration.json` (optional): risk bands, padding profile, validated accuracy

pub mod artifacts;
pub mod cache;
pub mod network;

use std::path::PathBuf;

pub use artifacts::{
    Calibration, ClassifierArtifact, LayerArtifact, ScalerArtifact, CALIBRATION_FILE,
    CLASSIFIER_FILE, DEFAULT_THRESHOLD, FEATURES_FILE, SCALER_FILE, THRESHOLD_FILE,
};
pub use cache::{
    global_cache, install_global_cache, CacheStatus, LoadedModel, ModelCache, ModelState,
};
pub use network::{Activation, Classifier, ColumnOrder, StandardScaler};

/// Errors loading the artifact set. Any of these puts the cache in the
/// load-failed state.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("artifact not found: {}", .0.display())]
    Missing(PathBuf),
    #[error("failed to read {}: {}", path.display(), source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {}", path.display(), source)]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("classifier version {classifier} does not match scaler version {scaler}")]
    VersionMismatch { classifier: String, scaler: String },
    #[error("invalid feature list: {0}")]
    FeatureList(String),
    #[error("invalid classifier: {0}")]
    Classifier(String),
    #[error("invalid scaler: {0}")]
    Scaler(String),
}

/// Errors raised while scoring a vector with a loaded model.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InferenceError {
    #[error("input has {actual} columns, model expects {expected}")]
    ShapeMismatch { actual: usize, expected: usize },
    #[error("non-finite value after {stage}")]
    NonFinite { stage: &'static str },
    #[error("classifier produced {0} outputs, expected 1")]
    OutputArity(usize),
}

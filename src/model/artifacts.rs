//! On-disk artifact formats and their loaders.

use crate::core::features::PaddingProfile;
use crate::core::report::ModelMetrics;
use crate::core::risk::{RiskBands, REFERENCE_ACCURACY};
use crate::model::network::Activation;
use crate::model::ModelError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CLASSIFIER_FILE: &str = "classifier.json";
pub const SCALER_FILE: &str = "scaler.json";
pub const FEATURES_FILE: &str = "features.json";
pub const THRESHOLD_FILE: &str = "threshold.json";
pub const CALIBRATION_FILE: &str = "calibration.json";

/// Threshold used when `threshold.json` is absent or unusable.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// One dense layer. `weights` is indexed `[input][output]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerArtifact {
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
    pub activation: Activation,
}

/// Serialized classifier network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierArtifact {
    pub version: String,
    #[serde(default = "default_architecture")]
    pub architecture: String,
    pub layers: Vec<LayerArtifact>,
    /// Metrics recorded when this version was validated
    #[serde(default)]
    pub metrics: Option<ModelMetrics>,
}

fn default_architecture() -> String {
    "Deep Feedforward Neural Network".to_string()
}

/// Serialized standard scaler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalerArtifact {
    pub version: String,
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

/// `features.json` is either `{"features": [...]}` or a bare list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum FeatureListFile {
    Wrapped { features: Vec<String> },
    Bare(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct ThresholdFile {
    optimal_threshold_f1: f64,
}

/// Values that accompany a model version but are not learned weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    pub risk_bands: RiskBands,
    pub padding: PaddingProfile,
    /// Accuracy quoted in the disclaimer (0-1)
    pub validated_accuracy: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            risk_bands: RiskBands::default(),
            padding: PaddingProfile::default(),
            validated_accuracy: REFERENCE_ACCURACY,
        }
    }
}

/// `calibration.json` as written; absent fields come from the configured
/// calibration.
#[derive(Debug, Deserialize)]
struct CalibrationFile {
    risk_bands: Option<RiskBands>,
    padding: Option<PaddingProfile>,
    validated_accuracy: Option<f64>,
}

/// Read and parse a required JSON artifact.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ModelError> {
    if !path.exists() {
        return Err(ModelError::Missing(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ModelError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load the feature names in model column order.
pub fn load_feature_names(dir: &Path) -> Result<Vec<String>, ModelError> {
    let file: FeatureListFile = read_json(&dir.join(FEATURES_FILE))?;
    Ok(match file {
        FeatureListFile::Wrapped { features } => features,
        FeatureListFile::Bare(features) => features,
    })
}

/// Load the tuned threshold, falling back to [`DEFAULT_THRESHOLD`].
///
/// Any value in the closed interval [0, 1] is used as given.
pub fn load_threshold(dir: &Path) -> f64 {
    let path = dir.join(THRESHOLD_FILE);
    match read_json::<ThresholdFile>(&path) {
        Ok(file) if (0.0..=1.0).contains(&file.optimal_threshold_f1) => {
            let threshold = file.optimal_threshold_f1;
            if threshold == 0.0 || threshold == 1.0 {
                tracing::warn!(
                    threshold,
                    path = %path.display(),
                    "threshold makes one class unreachable"
                );
            }
            threshold
        }
        Ok(file) => {
            tracing::warn!(
                threshold = file.optimal_threshold_f1,
                path = %path.display(),
                "threshold outside [0, 1], using {DEFAULT_THRESHOLD}"
            );
            DEFAULT_THRESHOLD
        }
        Err(e) => {
            tracing::warn!("{e}, using threshold {DEFAULT_THRESHOLD}");
            DEFAULT_THRESHOLD
        }
    }
}

/// Load the calibration shipped with the model, or `fallback` when absent.
pub fn load_calibration(dir: &Path, fallback: &Calibration) -> Calibration {
    let path = dir.join(CALIBRATION_FILE);
    if !path.exists() {
        return fallback.clone();
    }

    let file = match read_json::<CalibrationFile>(&path) {
        Ok(file) => file,
        Err(e) => {
            tracing::warn!("{e}, using configured calibration");
            return fallback.clone();
        }
    };

    let risk_bands = match file.risk_bands {
        Some(bands) if bands.is_well_formed() => bands,
        Some(bands) => {
            tracing::warn!(
                ?bands,
                path = %path.display(),
                "malformed risk bands, using configured bands"
            );
            fallback.risk_bands
        }
        None => fallback.risk_bands,
    };
    let validated_accuracy = match file.validated_accuracy {
        Some(accuracy) if (0.0..=1.0).contains(&accuracy) => accuracy,
        Some(accuracy) => {
            tracing::warn!(
                accuracy,
                path = %path.display(),
                "validated accuracy outside [0, 1], using configured value"
            );
            fallback.validated_accuracy
        }
        None => fallback.validated_accuracy,
    };

    Calibration {
        risk_bands,
        padding: file.padding.unwrap_or_else(|| fallback.padding.clone()),
        validated_accuracy,
    }
}

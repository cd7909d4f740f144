//! Dense feed-forward inference with `ndarray`.

use crate::core::features::FeatureVector;
use crate::core::schema::{FeatureKey, FEATURE_COUNT};
use crate::model::artifacts::{ClassifierArtifact, LayerArtifact, ScalerArtifact};
use crate::model::{InferenceError, ModelError};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Element-wise activation applied after a dense layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Relu,
    Sigmoid,
    Tanh,
    Linear,
}

impl Activation {
    fn apply(self, x: f64) -> f64 {
        match self {
            Activation::Relu => x.max(0.0),
            Activation::Sigmoid => sigmoid(x),
            Activation::Tanh => x.tanh(),
            Activation::Linear => x,
        }
    }
}

/// Logistic function, stable for large negative inputs.
fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Maps model columns to canonical feature slots.
///
/// Column `j` of the model input is canonical slot `slots[j]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnOrder {
    slots: Vec<usize>,
}

impl ColumnOrder {
    /// Derive the column order from the feature names the model was trained on.
    pub fn from_names(names: &[String]) -> Result<Self, ModelError> {
        if names.len() != FEATURE_COUNT {
            return Err(ModelError::FeatureList(format!(
                "{} names, expected {FEATURE_COUNT}",
                names.len()
            )));
        }

        let mut seen = [false; FEATURE_COUNT];
        let mut slots = Vec::with_capacity(FEATURE_COUNT);
        for name in names {
            let key = FeatureKey::parse(name)
                .ok_or_else(|| ModelError::FeatureList(format!("unknown feature {name}")))?;
            let slot = key.index();
            if seen[slot] {
                return Err(ModelError::FeatureList(format!("duplicate feature {name}")));
            }
            seen[slot] = true;
            slots.push(slot);
        }
        Ok(Self { slots })
    }

    /// Canonical schema order.
    pub fn canonical() -> Self {
        Self {
            slots: (0..FEATURE_COUNT).collect(),
        }
    }

    /// Lay out a vector in model column order.
    pub fn gather(&self, vector: &FeatureVector) -> Array1<f64> {
        let values = vector.values();
        self.slots.iter().map(|&slot| values[slot]).collect()
    }
}

/// Standard scaler: `(x - mean) / scale`.
#[derive(Debug, Clone)]
pub struct StandardScaler {
    mean: Array1<f64>,
    scale: Array1<f64>,
}

impl StandardScaler {
    pub fn from_artifact(artifact: &ScalerArtifact) -> Result<Self, ModelError> {
        if artifact.mean.len() != FEATURE_COUNT || artifact.scale.len() != FEATURE_COUNT {
            return Err(ModelError::Scaler(format!(
                "mean has {} entries and scale has {}, expected {FEATURE_COUNT}",
                artifact.mean.len(),
                artifact.scale.len()
            )));
        }
        if artifact.mean.iter().any(|m| !m.is_finite()) {
            return Err(ModelError::Scaler("non-finite mean".to_string()));
        }
        if artifact.scale.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(ModelError::Scaler("scale must be finite and positive".to_string()));
        }

        Ok(Self {
            mean: Array1::from(artifact.mean.clone()),
            scale: Array1::from(artifact.scale.clone()),
        })
    }

    pub fn transform(&self, x: &Array1<f64>) -> Result<Array1<f64>, InferenceError> {
        if x.len() != self.mean.len() {
            return Err(InferenceError::ShapeMismatch {
                actual: x.len(),
                expected: self.mean.len(),
            });
        }
        let scaled = (x - &self.mean) / &self.scale;
        if scaled.iter().any(|v| !v.is_finite()) {
            return Err(InferenceError::NonFinite { stage: "scaling" });
        }
        Ok(scaled)
    }
}

#[derive(Debug, Clone)]
struct DenseLayer {
    /// Shape (inputs, outputs)
    weights: Array2<f64>,
    bias: Array1<f64>,
    activation: Activation,
}

impl DenseLayer {
    fn from_artifact(index: usize, artifact: &LayerArtifact) -> Result<Self, ModelError> {
        let inputs = artifact.weights.len();
        let outputs = artifact.bias.len();
        if inputs == 0 || outputs == 0 {
            return Err(ModelError::Classifier(format!("layer {index} is empty")));
        }
        if let Some(row) = artifact.weights.iter().position(|r| r.len() != outputs) {
            return Err(ModelError::Classifier(format!(
                "layer {index} row {row} has {} weights, bias has {outputs}",
                artifact.weights[row].len()
            )));
        }

        let flat: Vec<f64> = artifact.weights.iter().flatten().copied().collect();
        if flat.iter().chain(&artifact.bias).any(|v| !v.is_finite()) {
            return Err(ModelError::Classifier(format!(
                "layer {index} has non-finite parameters"
            )));
        }
        let weights = Array2::from_shape_vec((inputs, outputs), flat)
            .map_err(|e| ModelError::Classifier(format!("layer {index}: {e}")))?;

        Ok(Self {
            weights,
            bias: Array1::from(artifact.bias.clone()),
            activation: artifact.activation,
        })
    }

    fn forward(&self, x: &Array1<f64>) -> Array1<f64> {
        let z = x.dot(&self.weights) + &self.bias;
        z.mapv(|v| self.activation.apply(v))
    }
}

/// Feed-forward binary classifier ending in a single output unit.
#[derive(Debug, Clone)]
pub struct Classifier {
    layers: Vec<DenseLayer>,
}

impl Classifier {
    pub fn from_artifact(artifact: &ClassifierArtifact) -> Result<Self, ModelError> {
        if artifact.layers.is_empty() {
            return Err(ModelError::Classifier("no layers".to_string()));
        }

        let layers = artifact
            .layers
            .iter()
            .enumerate()
            .map(|(i, layer)| DenseLayer::from_artifact(i, layer))
            .collect::<Result<Vec<_>, _>>()?;

        let input_dim = layers[0].weights.nrows();
        if input_dim != FEATURE_COUNT {
            return Err(ModelError::Classifier(format!(
                "input layer takes {input_dim} features, expected {FEATURE_COUNT}"
            )));
        }
        for (i, pair) in layers.windows(2).enumerate() {
            if pair[0].weights.ncols() != pair[1].weights.nrows() {
                return Err(ModelError::Classifier(format!(
                    "layer {} outputs {} values but layer {} takes {}",
                    i,
                    pair[0].weights.ncols(),
                    i + 1,
                    pair[1].weights.nrows()
                )));
            }
        }
        let output_dim = layers[layers.len() - 1].weights.ncols();
        if output_dim != 1 {
            return Err(ModelError::Classifier(format!(
                "output layer has {output_dim} units, expected 1"
            )));
        }

        Ok(Self { layers })
    }

    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    pub fn input_dim(&self) -> usize {
        self.layers.first().map_or(0, |l| l.weights.nrows())
    }

    /// Probability of the positive class for one scaled input row.
    pub fn predict_proba(&self, x: &Array1<f64>) -> Result<f64, InferenceError> {
        if x.len() != self.input_dim() {
            return Err(InferenceError::ShapeMismatch {
                actual: x.len(),
                expected: self.input_dim(),
            });
        }

        let mut activations = x.clone();
        for layer in &self.layers {
            activations = layer.forward(&activations);
        }

        if activations.len() != 1 {
            return Err(InferenceError::OutputArity(activations.len()));
        }
        let probability = activations[0];
        if !probability.is_finite() {
            return Err(InferenceError::NonFinite { stage: "inference" });
        }
        Ok(probability.clamp(0.0, 1.0))
    }
}

//! Process-wide model cache.
//!
//! The artifact set is loaded at most once per process. Readers take a shared
//! lock; the first caller that finds the cache empty takes the load mutex and
//! performs the load while concurrent callers wait for its outcome. A failed
//! load is remembered so the predictor can run in simulation mode without
//! retrying on every request. The owning process id is stamped on the state
//! so a forked worker reloads instead of sharing its parent's handles.

use crate::core::features::FeatureVector;
use crate::core::report::ModelMetrics;
use crate::model::artifacts::{
    self, Calibration, ClassifierArtifact, ScalerArtifact, CLASSIFIER_FILE, SCALER_FILE,
};
use crate::model::network::{Classifier, ColumnOrder, StandardScaler};
use crate::model::{InferenceError, ModelError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, RwLock};

/// A fully loaded, matched artifact set.
#[derive(Debug)]
pub struct LoadedModel {
    pub version: String,
    pub architecture: String,
    pub threshold: f64,
    pub calibration: Calibration,
    pub metrics: Option<ModelMetrics>,
    pub source_dir: PathBuf,
    pub loaded_at: DateTime<Utc>,
    columns: ColumnOrder,
    scaler: StandardScaler,
    classifier: Classifier,
}

impl LoadedModel {
    /// Load and cross-check every artifact in `dir`.
    pub fn load(dir: &Path, fallback: &Calibration) -> Result<Self, ModelError> {
        let classifier_artifact: ClassifierArtifact = artifacts::read_json(&dir.join(CLASSIFIER_FILE))?;
        let scaler_artifact: ScalerArtifact = artifacts::read_json(&dir.join(SCALER_FILE))?;

        if classifier_artifact.version != scaler_artifact.version {
            return Err(ModelError::VersionMismatch {
                classifier: classifier_artifact.version,
                scaler: scaler_artifact.version,
            });
        }

        let names = artifacts::load_feature_names(dir)?;
        let columns = ColumnOrder::from_names(&names)?;
        let scaler = StandardScaler::from_artifact(&scaler_artifact)?;
        let classifier = Classifier::from_artifact(&classifier_artifact)?;
        let threshold = artifacts::load_threshold(dir);
        let calibration = artifacts::load_calibration(dir, fallback);

        tracing::info!(
            version = %classifier_artifact.version,
            layers = classifier.depth(),
            threshold,
            dir = %dir.display(),
            "model loaded"
        );

        Ok(Self {
            version: classifier_artifact.version,
            architecture: classifier_artifact.architecture,
            threshold,
            calibration,
            metrics: classifier_artifact.metrics,
            source_dir: dir.to_path_buf(),
            loaded_at: Utc::now(),
            columns,
            scaler,
            classifier,
        })
    }

    /// Raw probability for a canonical feature vector: reorder, scale, forward.
    pub fn predict_proba(&self, vector: &FeatureVector) -> Result<f64, InferenceError> {
        let columns = self.columns.gather(vector);
        let scaled = self.scaler.transform(&columns)?;
        self.classifier.predict_proba(&scaled)
    }
}

/// What a caller gets from the cache.
#[derive(Debug, Clone)]
pub enum ModelState {
    Ready(Arc<LoadedModel>),
    /// No usable model. Carries the load failure description.
    Degraded(String),
}

impl ModelState {
    pub fn model(&self) -> Option<&Arc<LoadedModel>> {
        match self {
            ModelState::Ready(model) => Some(model),
            ModelState::Degraded(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
enum Slot {
    Unloaded,
    Loading,
    Loaded(Arc<LoadedModel>),
    LoadFailed(String),
}

/// Observable cache state, for status reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CacheStatus {
    Unloaded,
    Loading,
    Loaded { version: String },
    LoadFailed { reason: String },
}

#[derive(Debug)]
struct Stamped {
    slot: Slot,
    pid: u32,
}

/// Lazily loaded, shared model handle.
#[derive(Debug)]
pub struct ModelCache {
    model_dir: PathBuf,
    fallback: Calibration,
    state: RwLock<Stamped>,
    load_lock: Mutex<()>,
}

impl ModelCache {
    pub fn new(model_dir: impl Into<PathBuf>, fallback: Calibration) -> Self {
        Self {
            model_dir: model_dir.into(),
            fallback,
            state: RwLock::new(Stamped {
                slot: Slot::Unloaded,
                pid: std::process::id(),
            }),
            load_lock: Mutex::new(()),
        }
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    /// Calibration used when the model ships none, and in simulation mode.
    pub fn fallback_calibration(&self) -> &Calibration {
        &self.fallback
    }

    /// Return the loaded model, loading it on first use.
    pub fn ensure_loaded(&self) -> ModelState {
        if let Some(state) = self.settled() {
            return state;
        }

        let _guard = self
            .load_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        // Another caller may have finished loading while we waited.
        if let Some(state) = self.settled() {
            return state;
        }

        self.set(Slot::Loading);
        tracing::info!(dir = %self.model_dir.display(), "loading model artifacts");

        match LoadedModel::load(&self.model_dir, &self.fallback) {
            Ok(model) => {
                let model = Arc::new(model);
                self.set(Slot::Loaded(Arc::clone(&model)));
                ModelState::Ready(model)
            }
            Err(e) => {
                let reason = e.to_string();
                tracing::warn!(error = %reason, "model unavailable, predictions will be simulated");
                self.set(Slot::LoadFailed(reason.clone()));
                ModelState::Degraded(reason)
            }
        }
    }

    /// Put the cache in the load-failed state without touching disk.
    pub fn force_failed(&self, reason: impl Into<String>) {
        let _guard = self
            .load_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let reason = reason.into();
        tracing::warn!(%reason, "model cache forced into failed state");
        self.set(Slot::LoadFailed(reason));
    }

    /// Drop the cached outcome so the next call reloads from disk.
    pub fn invalidate(&self) {
        let _guard = self
            .load_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        self.set(Slot::Unloaded);
        tracing::info!("model cache invalidated");
    }

    pub fn status(&self) -> CacheStatus {
        let state = self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        if state.pid != std::process::id() {
            return CacheStatus::Unloaded;
        }
        match &state.slot {
            Slot::Unloaded => CacheStatus::Unloaded,
            Slot::Loading => CacheStatus::Loading,
            Slot::Loaded(model) => CacheStatus::Loaded {
                version: model.version.clone(),
            },
            Slot::LoadFailed(reason) => CacheStatus::LoadFailed {
                reason: reason.clone(),
            },
        }
    }

    /// Settled outcome for this process, if any.
    fn settled(&self) -> Option<ModelState> {
        let state = self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        if state.pid != std::process::id() {
            return None;
        }
        match &state.slot {
            Slot::Loaded(model) => Some(ModelState::Ready(Arc::clone(model))),
            Slot::LoadFailed(reason) => Some(ModelState::Degraded(reason.clone())),
            Slot::Unloaded | Slot::Loading => None,
        }
    }

    fn set(&self, slot: Slot) {
        let mut state = self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        state.slot = slot;
        state.pid = std::process::id();
    }
}

static GLOBAL_CACHE: OnceLock<Arc<ModelCache>> = OnceLock::new();

/// Install the process-wide cache. Returns false if one is already installed.
pub fn install_global_cache(cache: ModelCache) -> bool {
    GLOBAL_CACHE.set(Arc::new(cache)).is_ok()
}

/// The process-wide cache, created from the saved configuration on first use.
pub fn global_cache() -> Arc<ModelCache> {
    GLOBAL_CACHE
        .get_or_init(|| {
            let config = crate::config::Config::load().unwrap_or_else(|e| {
                tracing::warn!("failed to load config, using defaults: {e}");
                crate::config::Config::default()
            });
            Arc::new(ModelCache::new(config.model_dir(), config.calibration.clone()))
        })
        .clone()
}

//! Screening transparency log.
//!
//! Counts what the predictor did (real scores, simulated scores, rejected
//! vectors, padded exercises) without storing any child data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Running counters for the current process.
#[derive(Debug)]
pub struct TransparencyLog {
    /// Number of evaluations screened end to end
    screenings: AtomicU64,
    /// Predictions backed by the real model
    scored_predictions: AtomicU64,
    /// Predictions produced in simulation mode
    simulated_predictions: AtomicU64,
    /// Inference calls that returned an error-flagged result
    inference_failures: AtomicU64,
    /// Feature vectors rejected by the validator
    validation_failures: AtomicU64,
    /// Exercises filled from the padding profile
    padded_exercises: AtomicU64,
    session_start: DateTime<Utc>,
    persist_path: Option<PathBuf>,
}

impl TransparencyLog {
    pub fn new() -> Self {
        Self {
            screenings: AtomicU64::new(0),
            scored_predictions: AtomicU64::new(0),
            simulated_predictions: AtomicU64::new(0),
            inference_failures: AtomicU64::new(0),
            validation_failures: AtomicU64::new(0),
            padded_exercises: AtomicU64::new(0),
            session_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create a log that restores and saves its counters at `path`.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut log = Self::new();
        log.persist_path = Some(path);

        if let Err(e) = log.load() {
            tracing::warn!("could not load previous transparency stats: {e}");
        }

        log
    }

    pub fn record_screening(&self) {
        self.screenings.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_scored(&self) {
        self.scored_predictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_simulated(&self) {
        self.simulated_predictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_inference_failure(&self) {
        self.inference_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_validation_failure(&self) {
        self.validation_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record exercises that had to be padded in one assembly.
    pub fn record_padded_exercises(&self, count: u64) {
        self.padded_exercises.fetch_add(count, Ordering::Relaxed);
    }

    pub fn stats(&self) -> TransparencyStats {
        TransparencyStats {
            screenings: self.screenings.load(Ordering::Relaxed),
            scored_predictions: self.scored_predictions.load(Ordering::Relaxed),
            simulated_predictions: self.simulated_predictions.load(Ordering::Relaxed),
            inference_failures: self.inference_failures.load(Ordering::Relaxed),
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
            padded_exercises: self.padded_exercises.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Screening Statistics:\n\
             - Evaluations screened: {}\n\
             - Predictions from the model: {}\n\
             - Simulated predictions: {}\n\
             - Inference failures: {}\n\
             - Rejected feature vectors: {}\n\
             - Padded exercises: {}\n\
             - Session duration: {} seconds\n\
             \n\
             Data Guarantee:\n\
             - Only counters are recorded\n\
             - No child profiles or telemetry are stored",
            stats.screenings,
            stats.scored_predictions,
            stats.simulated_predictions,
            stats.inference_failures,
            stats.validation_failures,
            stats.padded_exercises,
            stats.session_duration_secs
        )
    }

    /// Save stats to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.stats();
            let persisted = PersistedStats {
                screenings: stats.screenings,
                scored_predictions: stats.scored_predictions,
                simulated_predictions: stats.simulated_predictions,
                inference_failures: stats.inference_failures,
                validation_failures: stats.validation_failures,
                padded_exercises: stats.padded_exercises,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;

            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.screenings
                    .store(persisted.screenings, Ordering::Relaxed);
                self.scored_predictions
                    .store(persisted.scored_predictions, Ordering::Relaxed);
                self.simulated_predictions
                    .store(persisted.simulated_predictions, Ordering::Relaxed);
                self.inference_failures
                    .store(persisted.inference_failures, Ordering::Relaxed);
                self.validation_failures
                    .store(persisted.validation_failures, Ordering::Relaxed);
                self.padded_exercises
                    .store(persisted.padded_exercises, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    /// Reset all counters.
    pub fn reset(&self) {
        self.screenings.store(0, Ordering::Relaxed);
        self.scored_predictions.store(0, Ordering::Relaxed);
        self.simulated_predictions.store(0, Ordering::Relaxed);
        self.inference_failures.store(0, Ordering::Relaxed);
        self.validation_failures.store(0, Ordering::Relaxed);
        self.padded_exercises.store(0, Ordering::Relaxed);
    }
}

impl Default for TransparencyLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of transparency statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransparencyStats {
    pub screenings: u64,
    pub scored_predictions: u64,
    pub simulated_predictions: u64,
    pub inference_failures: u64,
    pub validation_failures: u64,
    pub padded_exercises: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    screenings: u64,
    scored_predictions: u64,
    simulated_predictions: u64,
    inference_failures: u64,
    validation_failures: u64,
    padded_exercises: u64,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared transparency log.
pub type SharedTransparencyLog = Arc<TransparencyLog>;

pub fn create_shared_log() -> SharedTransparencyLog {
    Arc::new(TransparencyLog::new())
}

pub fn create_shared_log_with_persistence(path: PathBuf) -> SharedTransparencyLog {
    Arc::new(TransparencyLog::with_persistence(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_transparency_log_counting() {
        let log = TransparencyLog::new();

        log.record_screening();
        log.record_scored();
        log.record_simulated();
        log.record_simulated();
        log.record_padded_exercises(12);

        let stats = log.stats();
        assert_eq!(stats.screenings, 1);
        assert_eq!(stats.scored_predictions, 1);
        assert_eq!(stats.simulated_predictions, 2);
        assert_eq!(stats.padded_exercises, 12);
    }

    #[test]
    fn test_transparency_log_reset() {
        let log = TransparencyLog::new();

        log.record_validation_failure();
        log.record_inference_failure();
        log.reset();

        let stats = log.stats();
        assert_eq!(stats.validation_failures, 0);
        assert_eq!(stats.inference_failures, 0);
    }

    #[test]
    fn test_persistence_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stats").join("transparency.json");

        let log = TransparencyLog::with_persistence(path.clone());
        log.record_screening();
        log.record_padded_exercises(3);
        log.save().unwrap();

        let restored = TransparencyLog::with_persistence(path);
        let stats = restored.stats();
        assert_eq!(stats.screenings, 1);
        assert_eq!(stats.padded_exercises, 3);
    }

    #[test]
    fn test_summary_format() {
        let summary = TransparencyLog::new().summary();

        assert!(summary.contains("Evaluations screened"));
        assert!(summary.contains("Simulated predictions"));
        assert!(summary.contains("No child profiles"));
    }
}

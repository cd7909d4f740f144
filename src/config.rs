//! Configuration for the screening service.

use crate::evaluation::DEFAULT_REFERENCE_LANGUAGES;
use crate::model::Calibration;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable that overrides the configured model directory.
pub const MODEL_DIR_ENV: &str = "DISLEXIA_MODEL_DIR";

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the model artifact set
    pub model_path: PathBuf,

    /// Path for storing transparency statistics
    pub data_path: PathBuf,

    /// Lower-case fragments that identify the reference native language
    pub reference_languages: Vec<String>,

    /// Risk bands, padding and accuracy used when the model ships no calibration
    pub calibration: Calibration,

    /// Default tracing filter when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dislexia-predictor");

        Self {
            model_path: data_dir.join("model"),
            data_path: data_dir,
            reference_languages: DEFAULT_REFERENCE_LANGUAGES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            calibration: Calibration::default(),
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content).map_err(ConfigError::Parse)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(&config_path, content)?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dislexia-predictor")
            .join("config.json")
    }

    /// Model directory, honouring [`MODEL_DIR_ENV`].
    pub fn model_dir(&self) -> PathBuf {
        match std::env::var_os(MODEL_DIR_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => self.model_path.clone(),
        }
    }

    pub fn transparency_log_path(&self) -> PathBuf {
        self.data_path.join("transparency_stats.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.data_path)?;
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(serde_json::Error),
    #[error("Serialize error: {0}")]
    Serialize(serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::risk::RiskBands;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.reference_languages, vec!["espa", "spanish", "castellano"]);
        assert_eq!(config.calibration.risk_bands, RiskBands::default());
        assert_eq!(config.log_filter, "info");
        assert!(config.transparency_log_path().ends_with("transparency_stats.json"));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"model_path": "/srv/model"}"#).unwrap();
        assert_eq!(config.model_path, PathBuf::from("/srv/model"));
        assert_eq!(config.calibration, Calibration::default());
        assert_eq!(config.reference_languages.len(), 3);
    }
}

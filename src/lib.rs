//! DislexIA predictor - dyslexia risk screening from mini-game telemetry.
//!
//! A child plays 32 short language mini-games. This library turns the
//! per-exercise counters of those sessions, plus four demographic flags, into
//! a risk assessment a clinician can act on.
//!
//! # Guarantees
//!
//! - **Never a diagnosis**: every result carries a disclaimer
//! - **Always an answer**: a missing model yields a clearly labelled simulated
//!   score, an inference failure yields an error-flagged result
//! - **Deterministic**: the same artifacts and vector give the same probability
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      DislexIA Predictor                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │ Evaluation  │──▶│  Features   │──▶│ Validation  │       │
//! │  │ (32 games)  │   │ (196 slots) │   │             │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │                                             │              │
//! │                                             ▼              │
//! │  ┌─────────────┐                     ┌─────────────┐       │
//! │  │ Model Cache │────────────────────▶│  Predictor  │       │
//! │  │ (artifacts) │                     │ (risk/recs) │       │
//! │  └─────────────┘                     └─────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use dislexia_predictor::{ChildProfile, EvaluationInput, Predictor};
//!
//! let child = ChildProfile {
//!     age: 9,
//!     is_male: true,
//!     native_language_match: true,
//!     has_other_languages: false,
//! };
//! let report = Predictor::global().screen(&EvaluationInput::new(child));
//! println!("{}", report.to_json_pretty().unwrap_or_default());
//! ```

pub mod config;
pub mod core;
pub mod evaluation;
pub mod model;
pub mod predictor;
pub mod transparency;

#[cfg(feature = "server")]
pub mod server;

// Re-export key types at crate root for convenience
pub use crate::config::{Config, ConfigError};
pub use crate::core::{
    assemble_features, validate_features, FeatureVector, PredictionOutcome, PredictionResult,
    RiskLevel, ScreeningReport, ValidationReport,
};
pub use evaluation::{ChildProfile, Evaluation, EvaluationInput, ExerciseTelemetry};
pub use model::{global_cache, ModelCache, ModelError, ModelState};
pub use predictor::Predictor;
pub use transparency::{SharedTransparencyLog, TransparencyLog, TransparencyStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Scope declaration that can be displayed to clinicians.
pub const SCOPE_DECLARATION: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║              DISLEXIA PREDICTOR - SCOPE OF USE                   ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  This tool estimates dyslexia risk from cognitive mini-games.    ║
║                                                                  ║
║  ✓ WHAT IT USES:                                                 ║
║    • Age, gender and language background flags                   ║
║    • Clicks, hits, misses and score of each of 32 exercises      ║
║                                                                  ║
║  ✗ WHAT IT IS NOT:                                               ║
║    • A medical diagnosis                                         ║
║    • A replacement for a neuropsychological assessment           ║
║                                                                  ║
║  Every result must be interpreted by a qualified professional.   ║
║  Results marked as simulated were produced without the model.    ║
║                                                                  ║
║  You can view screening statistics anytime with:                 ║
║    dislexia status                                               ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;

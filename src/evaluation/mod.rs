//! Evaluation data model.
//!
//! This module contains:
//! - The input contract handed to the screening core
//! - The session lifecycle used to accumulate telemetry during an evaluation
//! - Evaluation summaries attached to screening reports

pub mod session;
pub mod types;

pub use session::{
    Evaluation, EvaluationError, EvaluationSummary, ExerciseSession, MiniGame, SessionProgress,
    SessionState, SummaryMetrics,
};
pub use types::{
    ChildInput, ChildProfile, ChildRecord, EvaluationInput, ExerciseTelemetry, Gender,
    ScreeningRequest, DEFAULT_REFERENCE_LANGUAGES,
};

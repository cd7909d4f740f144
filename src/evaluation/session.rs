//! Evaluation lifecycle: 32 sequential mini-game sessions per child.
//!
//! Sessions are started, fed answers while the child plays, and closed when
//! the exercise ends or is abandoned. Only completed sessions contribute
//! telemetry; anything else is padded by the feature assembler.

use crate::core::risk::round2;
use crate::core::schema::EXERCISE_COUNT;
use crate::evaluation::types::{ChildProfile, EvaluationInput, ExerciseTelemetry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;
use uuid::Uuid;

/// The rotating pool of mini-games an evaluation cycles through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MiniGame {
    PalabraQueEscuches,
    OrdenarPalabras,
    SeleccionaLaPalabraCorrecta,
    CompletaLaPalabra,
    EscribeElNombreDelObjeto,
    EncuentraElError,
}

impl MiniGame {
    pub const POOL: [MiniGame; 6] = [
        MiniGame::PalabraQueEscuches,
        MiniGame::OrdenarPalabras,
        MiniGame::SeleccionaLaPalabraCorrecta,
        MiniGame::CompletaLaPalabra,
        MiniGame::EscribeElNombreDelObjeto,
        MiniGame::EncuentraElError,
    ];

    /// Game bound to an exercise ordinal (1-based, rotating through the pool).
    pub fn for_ordinal(ordinal: u8) -> Self {
        let slot = usize::from(ordinal.max(1)) - 1;
        Self::POOL[slot % Self::POOL.len()]
    }
}

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    #[serde(rename = "en_proceso")]
    InProgress,
    #[serde(rename = "completada")]
    Completed,
    #[serde(rename = "interrumpida")]
    Abandoned,
}

/// Errors raised by the evaluation lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvaluationError {
    #[error("exercise ordinal {0} is outside 1-{EXERCISE_COUNT}")]
    OrdinalOutOfRange(u8),
    #[error("exercise {0} has already been started")]
    AlreadyStarted(u8),
    #[error("exercise {0} has not been started")]
    NotStarted(u8),
    #[error("exercise {0} is no longer in progress")]
    NotInProgress(u8),
}

/// One play-through of a mini-game within an evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExerciseSession {
    pub ordinal: u8,
    pub game: MiniGame,
    pub state: SessionState,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub clicks: u32,
    pub hits: u32,
    pub misses: u32,
    pub score: i64,
}

impl ExerciseSession {
    fn new(ordinal: u8, game: MiniGame) -> Self {
        Self {
            ordinal,
            game,
            state: SessionState::InProgress,
            started_at: Utc::now(),
            finished_at: None,
            clicks: 0,
            hits: 0,
            misses: 0,
            score: 0,
        }
    }

    /// Record one answer given by the child.
    pub fn record_answer(&mut self, correct: bool, points: i64) -> Result<(), EvaluationError> {
        if self.state != SessionState::InProgress {
            return Err(EvaluationError::NotInProgress(self.ordinal));
        }
        self.clicks += 1;
        if correct {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        self.score = self.score.saturating_add(points);
        Ok(())
    }

    /// Hits over clicks, as a percentage.
    pub fn accuracy_percent(&self) -> f64 {
        percentage(self.hits, self.clicks)
    }

    /// Misses over clicks, as a percentage.
    pub fn missrate_percent(&self) -> f64 {
        percentage(self.misses, self.clicks)
    }

    pub fn is_completed(&self) -> bool {
        self.state == SessionState::Completed
    }

    /// Telemetry in the shape consumed by the feature assembler.
    pub fn telemetry(&self) -> ExerciseTelemetry {
        ExerciseTelemetry {
            clicks: self.clicks,
            hits: self.hits,
            misses: self.misses,
            score: self.score,
            accuracy_percent: self.accuracy_percent(),
            missrate_percent: self.missrate_percent(),
        }
    }

    fn close(&mut self, state: SessionState) -> Result<(), EvaluationError> {
        if self.state != SessionState::InProgress {
            return Err(EvaluationError::NotInProgress(self.ordinal));
        }
        self.state = state;
        self.finished_at = Some(Utc::now());
        Ok(())
    }
}

fn percentage(part: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        f64::from(part) / f64::from(total) * 100.0
    }
}

/// One assessment attempt for one child.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    pub id: Uuid,
    pub child: ChildProfile,
    pub started_at: DateTime<Utc>,
    sessions: BTreeMap<u8, ExerciseSession>,
}

impl Evaluation {
    pub fn new(child: ChildProfile) -> Self {
        Self {
            id: Uuid::new_v4(),
            child,
            started_at: Utc::now(),
            sessions: BTreeMap::new(),
        }
    }

    /// Start the exercise at `ordinal` with the game assigned by the rotation.
    pub fn start_exercise(&mut self, ordinal: u8) -> Result<&mut ExerciseSession, EvaluationError> {
        if !(1..=EXERCISE_COUNT as u8).contains(&ordinal) {
            return Err(EvaluationError::OrdinalOutOfRange(ordinal));
        }
        if self.sessions.contains_key(&ordinal) {
            return Err(EvaluationError::AlreadyStarted(ordinal));
        }
        let session = ExerciseSession::new(ordinal, MiniGame::for_ordinal(ordinal));
        Ok(self.sessions.entry(ordinal).or_insert(session))
    }

    /// Mutable access to a started session.
    pub fn session_mut(&mut self, ordinal: u8) -> Result<&mut ExerciseSession, EvaluationError> {
        self.sessions
            .get_mut(&ordinal)
            .ok_or(EvaluationError::NotStarted(ordinal))
    }

    pub fn session(&self, ordinal: u8) -> Option<&ExerciseSession> {
        self.sessions.get(&ordinal)
    }

    /// Close an exercise normally.
    pub fn complete_exercise(&mut self, ordinal: u8) -> Result<(), EvaluationError> {
        self.session_mut(ordinal)?.close(SessionState::Completed)
    }

    /// Close an exercise the child did not finish.
    pub fn abandon_exercise(&mut self, ordinal: u8) -> Result<(), EvaluationError> {
        self.session_mut(ordinal)?.close(SessionState::Abandoned)
    }

    /// Number of sessions in the completed state.
    pub fn completed_count(&self) -> usize {
        self.sessions.values().filter(|s| s.is_completed()).count()
    }

    /// True once all 32 exercises are completed.
    pub fn is_ready_to_score(&self) -> bool {
        self.completed_count() == EXERCISE_COUNT
    }

    /// Convert to the scoring input. Only completed sessions are included.
    pub fn to_input(&self) -> EvaluationInput {
        EvaluationInput {
            evaluation_id: Some(self.id.to_string()),
            child: self.child.clone(),
            exercises: self
                .sessions
                .values()
                .filter(|s| s.is_completed())
                .map(|s| (s.ordinal, s.telemetry()))
                .collect(),
        }
    }

    pub fn summary(&self) -> EvaluationSummary {
        EvaluationSummary::from_input(&self.to_input())
    }
}

/// Session progress block of a summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionProgress {
    #[serde(rename = "completadas")]
    pub completed: usize,
    #[serde(rename = "total_esperadas")]
    pub expected: usize,
    #[serde(rename = "porcentaje")]
    pub percent: f64,
}

/// Aggregate metrics block of a summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryMetrics {
    pub total_clicks: u64,
    pub total_hits: u64,
    pub total_misses: u64,
    pub total_score: i64,
    /// Overall hits / clicks, in percent
    #[serde(rename = "accuracy_promedio")]
    pub mean_accuracy: f64,
    #[serde(rename = "missrate_promedio")]
    pub mean_missrate: f64,
    /// Mean of per-exercise accuracy percentages
    #[serde(rename = "accuracy_media_por_ejercicio")]
    pub per_exercise_accuracy_mean: Option<f64>,
    /// Sample standard deviation of per-exercise accuracy percentages
    #[serde(rename = "accuracy_desviacion_por_ejercicio")]
    pub per_exercise_accuracy_std_dev: Option<f64>,
}

/// Human-readable overview of an evaluation, attached to screening reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    #[serde(rename = "evaluacion_id", skip_serializing_if = "Option::is_none")]
    pub evaluation_id: Option<String>,
    #[serde(rename = "edad")]
    pub age: i32,
    #[serde(rename = "sesiones")]
    pub sessions: SessionProgress,
    #[serde(rename = "metricas")]
    pub metrics: SummaryMetrics,
}

impl EvaluationSummary {
    pub fn from_input(input: &EvaluationInput) -> Self {
        let sessions: Vec<&ExerciseTelemetry> = input
            .exercises
            .iter()
            .filter(|(ordinal, _)| (1..=EXERCISE_COUNT as u8).contains(ordinal))
            .map(|(_, t)| t)
            .collect();

        let total_clicks: u64 = sessions.iter().map(|s| u64::from(s.clicks)).sum();
        let total_hits: u64 = sessions.iter().map(|s| u64::from(s.hits)).sum();
        let total_misses: u64 = sessions.iter().map(|s| u64::from(s.misses)).sum();
        let total_score = sessions
            .iter()
            .fold(0i64, |acc, s| acc.saturating_add(s.score));

        let mean_accuracy = if total_clicks > 0 {
            total_hits as f64 / total_clicks as f64 * 100.0
        } else {
            0.0
        };

        let accuracies: Vec<f64> = sessions.iter().map(|s| s.accuracy_percent).collect();
        let per_exercise_accuracy_mean = if accuracies.is_empty() {
            None
        } else {
            Some(round2(accuracies.iter().mean()))
        };
        let per_exercise_accuracy_std_dev = if accuracies.len() < 2 {
            None
        } else {
            Some(round2(accuracies.iter().std_dev()))
        };

        Self {
            evaluation_id: input.evaluation_id.clone(),
            age: input.child.age,
            sessions: SessionProgress {
                completed: sessions.len(),
                expected: EXERCISE_COUNT,
                percent: (sessions.len() as f64 / EXERCISE_COUNT as f64 * 1000.0).round() / 10.0,
            },
            metrics: SummaryMetrics {
                total_clicks,
                total_hits,
                total_misses,
                total_score,
                mean_accuracy: round2(mean_accuracy),
                mean_missrate: round2(100.0 - mean_accuracy),
                per_exercise_accuracy_mean,
                per_exercise_accuracy_std_dev,
            },
        }
    }
}

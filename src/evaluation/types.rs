//! Input types handed to the screening core by the evaluation workflow.
//!
//! These carry only what the classifier needs: coarse demographics and
//! per-exercise counters. No names or identifying details of the child.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reference-language aliases matched against a recorded native language.
pub const DEFAULT_REFERENCE_LANGUAGES: [&str; 3] = ["espa", "spanish", "castellano"];

/// Gender as recorded by the clinical platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Unspecified,
}

impl Gender {
    /// Parse a free-text gender value (`masculino`, `male`, `m`, ...).
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "masculino" | "male" | "m" => Gender::Male,
            "femenino" | "female" | "f" => Gender::Female,
            _ => Gender::Unspecified,
        }
    }
}

/// Demographic profile of the evaluated child.
///
/// Immutable for the duration of one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildProfile {
    /// Age in years
    pub age: i32,
    /// Whether the child is male
    pub is_male: bool,
    /// Whether the native language matches the evaluator's reference language
    pub native_language_match: bool,
    /// Whether the child speaks other languages
    #[serde(default)]
    pub has_other_languages: bool,
}

impl ChildProfile {
    /// Build a profile from the free-text fields stored by the platform.
    ///
    /// `reference_languages` are lower-case fragments; the native language
    /// matches when it contains any of them.
    pub fn from_record<S: AsRef<str>>(
        age: i32,
        gender: &str,
        native_language: Option<&str>,
        has_other_languages: Option<bool>,
        reference_languages: &[S],
    ) -> Self {
        let native_language_match = native_language
            .map(|lang| {
                let lang = lang.to_lowercase();
                reference_languages
                    .iter()
                    .any(|alias| !alias.as_ref().is_empty() && lang.contains(alias.as_ref()))
            })
            .unwrap_or(false);

        Self {
            age,
            is_male: Gender::parse(gender) == Gender::Male,
            native_language_match,
            has_other_languages: has_other_languages.unwrap_or(false),
        }
    }
}

/// Telemetry of one finished exercise.
///
/// `hits + misses == clicks` is expected but not guaranteed by the games;
/// values are used as given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseTelemetry {
    pub clicks: u32,
    pub hits: u32,
    pub misses: u32,
    /// Raw game score (normalized by 100 during assembly)
    pub score: i64,
    /// Accuracy as a percentage (0-100)
    pub accuracy_percent: f64,
    /// Miss rate as a percentage (0-100)
    pub missrate_percent: f64,
}

/// A completed (or partially completed) evaluation ready for scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationInput {
    /// Optional identifier assigned by the caller
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation_id: Option<String>,
    pub child: ChildProfile,
    /// Telemetry keyed by exercise ordinal (1-32). Missing ordinals are padded.
    #[serde(default)]
    pub exercises: BTreeMap<u8, ExerciseTelemetry>,
}

impl EvaluationInput {
    pub fn new(child: ChildProfile) -> Self {
        Self {
            evaluation_id: None,
            child,
            exercises: BTreeMap::new(),
        }
    }

    /// Attach telemetry for one exercise, replacing any earlier value.
    pub fn with_exercise(mut self, ordinal: u8, telemetry: ExerciseTelemetry) -> Self {
        self.exercises.insert(ordinal, telemetry);
        self
    }
}

/// Demographics exactly as the platform stores them, before binarization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildRecord {
    pub age: i32,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub native_language: Option<String>,
    #[serde(default)]
    pub other_languages: Option<bool>,
}

impl ChildRecord {
    pub fn to_profile<S: AsRef<str>>(&self, reference_languages: &[S]) -> ChildProfile {
        ChildProfile::from_record(
            self.age,
            &self.gender,
            self.native_language.as_deref(),
            self.other_languages,
            reference_languages,
        )
    }
}

/// Child as sent by a caller: already binarized, or a raw platform record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChildInput {
    Profile(ChildProfile),
    Record(ChildRecord),
}

impl ChildInput {
    pub fn to_profile<S: AsRef<str>>(&self, reference_languages: &[S]) -> ChildProfile {
        match self {
            ChildInput::Profile(profile) => profile.clone(),
            ChildInput::Record(record) => record.to_profile(reference_languages),
        }
    }
}

/// Screening request body accepted by the CLI and the HTTP server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation_id: Option<String>,
    pub child: ChildInput,
    #[serde(default)]
    pub exercises: BTreeMap<u8, ExerciseTelemetry>,
}

impl ScreeningRequest {
    /// Resolve into scoring input, matching a raw native language against
    /// `reference_languages`.
    pub fn into_input<S: AsRef<str>>(self, reference_languages: &[S]) -> EvaluationInput {
        EvaluationInput {
            evaluation_id: self.evaluation_id,
            child: self.child.to_profile(reference_languages),
            exercises: self.exercises,
        }
    }
}

impl From<EvaluationInput> for ScreeningRequest {
    fn from(input: EvaluationInput) -> Self {
        Self {
            evaluation_id: input.evaluation_id,
            child: ChildInput::Profile(input.child),
            exercises: input.exercises,
        }
    }
}

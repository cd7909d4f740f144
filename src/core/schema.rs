//! Fixed feature schema expected by the dyslexia classifier.
//!
//! The model consumes 196 named scalars: four demographic values followed by
//! six metrics for each of the 32 exercises. Every name is generated from the
//! enums below, so a mis-typed feature name cannot be constructed.

use std::fmt;
use std::str::FromStr;

/// Number of exercises in one evaluation.
pub const EXERCISE_COUNT: usize = 32;

/// Metrics recorded per exercise.
pub const METRICS_PER_EXERCISE: usize = 6;

/// Demographic features placed ahead of the exercise metrics.
pub const DEMOGRAPHIC_COUNT: usize = 4;

/// Total length of a feature vector.
pub const FEATURE_COUNT: usize = DEMOGRAPHIC_COUNT + EXERCISE_COUNT * METRICS_PER_EXERCISE;

/// Demographic features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Demographic {
    Age,
    GenderMale,
    NativelangYes,
    OtherlangYes,
}

impl Demographic {
    pub const ALL: [Demographic; DEMOGRAPHIC_COUNT] = [
        Demographic::Age,
        Demographic::GenderMale,
        Demographic::NativelangYes,
        Demographic::OtherlangYes,
    ];

    /// Column name used by the trained model.
    pub fn name(self) -> &'static str {
        match self {
            Demographic::Age => "Age",
            Demographic::GenderMale => "Gender_Male",
            Demographic::NativelangYes => "Nativelang_Yes",
            Demographic::OtherlangYes => "Otherlang_Yes",
        }
    }

    /// Whether the feature must be encoded as 0 or 1.
    pub fn is_binary(self) -> bool {
        !matches!(self, Demographic::Age)
    }

    fn position(self) -> usize {
        match self {
            Demographic::Age => 0,
            Demographic::GenderMale => 1,
            Demographic::NativelangYes => 2,
            Demographic::OtherlangYes => 3,
        }
    }
}

/// Per-exercise metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    Clicks,
    Hits,
    Misses,
    Score,
    Accuracy,
    Missrate,
}

impl Metric {
    pub const ALL: [Metric; METRICS_PER_EXERCISE] = [
        Metric::Clicks,
        Metric::Hits,
        Metric::Misses,
        Metric::Score,
        Metric::Accuracy,
        Metric::Missrate,
    ];

    /// Name prefix; the exercise ordinal is appended to it.
    pub fn prefix(self) -> &'static str {
        match self {
            Metric::Clicks => "Clicks",
            Metric::Hits => "Hits",
            Metric::Misses => "Misses",
            Metric::Score => "Score",
            Metric::Accuracy => "Accuracy",
            Metric::Missrate => "Missrate",
        }
    }

    fn position(self) -> usize {
        match self {
            Metric::Clicks => 0,
            Metric::Hits => 1,
            Metric::Misses => 2,
            Metric::Score => 3,
            Metric::Accuracy => 4,
            Metric::Missrate => 5,
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.prefix() == prefix)
    }
}

/// A single named slot in the feature vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureKey {
    Demographic(Demographic),
    /// Exercise metric; `ordinal` is 1-based and never exceeds [`EXERCISE_COUNT`].
    Exercise { ordinal: u8, metric: Metric },
}

impl FeatureKey {
    /// Build an exercise key, rejecting ordinals outside 1..=32.
    pub fn exercise(ordinal: u8, metric: Metric) -> Option<Self> {
        if (1..=EXERCISE_COUNT as u8).contains(&ordinal) {
            Some(FeatureKey::Exercise { ordinal, metric })
        } else {
            None
        }
    }

    /// Canonical slot of this key.
    pub fn index(self) -> usize {
        match self {
            FeatureKey::Demographic(d) => d.position(),
            FeatureKey::Exercise { ordinal, metric } => {
                DEMOGRAPHIC_COUNT
                    + (usize::from(ordinal) - 1) * METRICS_PER_EXERCISE
                    + metric.position()
            }
        }
    }

    /// Inverse of [`FeatureKey::index`].
    pub fn from_index(index: usize) -> Option<Self> {
        if index < DEMOGRAPHIC_COUNT {
            return Some(FeatureKey::Demographic(Demographic::ALL[index]));
        }
        if index >= FEATURE_COUNT {
            return None;
        }
        let offset = index - DEMOGRAPHIC_COUNT;
        let ordinal = (offset / METRICS_PER_EXERCISE + 1) as u8;
        let metric = Metric::ALL[offset % METRICS_PER_EXERCISE];
        Some(FeatureKey::Exercise { ordinal, metric })
    }

    /// Column name, e.g. `Age` or `Clicks17`.
    pub fn name(self) -> String {
        match self {
            FeatureKey::Demographic(d) => d.name().to_string(),
            FeatureKey::Exercise { ordinal, metric } => format!("{}{ordinal}", metric.prefix()),
        }
    }

    /// Parse a column name. Only canonical spellings are accepted.
    pub fn parse(name: &str) -> Option<Self> {
        if let Some(d) = Demographic::ALL.into_iter().find(|d| d.name() == name) {
            return Some(FeatureKey::Demographic(d));
        }

        let split = name.find(|c: char| c.is_ascii_digit())?;
        let (prefix, digits) = name.split_at(split);
        let metric = Metric::from_prefix(prefix)?;
        let ordinal: u8 = digits.parse().ok()?;
        let key = FeatureKey::exercise(ordinal, metric)?;

        // Rejects spellings such as "Clicks07".
        (key.name() == name).then_some(key)
    }

    /// All keys in canonical order.
    pub fn all() -> impl Iterator<Item = FeatureKey> {
        (0..FEATURE_COUNT).filter_map(FeatureKey::from_index)
    }

    /// The six keys belonging to one exercise.
    pub fn for_exercise(ordinal: u8) -> impl Iterator<Item = FeatureKey> {
        Metric::ALL
            .into_iter()
            .filter_map(move |metric| FeatureKey::exercise(ordinal, metric))
    }
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureKey::Demographic(d) => f.write_str(d.name()),
            FeatureKey::Exercise { ordinal, metric } => write!(f, "{}{ordinal}", metric.prefix()),
        }
    }
}

/// Error returned when a column name is not part of the schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown feature name: {0}")]
pub struct UnknownFeature(pub String);

impl FromStr for FeatureKey {
    type Err = UnknownFeature;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeatureKey::parse(s).ok_or_else(|| UnknownFeature(s.to_string()))
    }
}

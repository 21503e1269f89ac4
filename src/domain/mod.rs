//! Domain types for series grouping with strong typing.
//!
//! Catalog identifiers, relation kinds and learning-signal kinds are closed sets
//! here so the rest of the engine never compares raw strings.

pub mod repository;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lowest confidence any pattern can reach.
pub const MIN_CONFIDENCE: f64 = 0.1;

/// Highest confidence any pattern can reach.
pub const MAX_CONFIDENCE: f64 = 0.95;

/// Unique identifier for an anime in the catalog.
///
/// # Examples
///
/// ```rust
/// use seasonarr::domain::AnimeId;
///
/// let id = AnimeId::new(42);
/// assert_eq!(id.value(), 42);
/// assert_eq!(id.to_string(), "42");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AnimeId(i32);

impl AnimeId {
    /// Creates a new `AnimeId` from a raw i32 value.
    ///
    /// # Panics
    ///
    /// Panics in debug mode if `id` is negative.
    #[must_use]
    pub const fn new(id: i32) -> Self {
        debug_assert!(id >= 0, "AnimeId should be non-negative");
        Self(id)
    }

    #[must_use]
    pub const fn value(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for AnimeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<AnimeId> for i32 {
    fn from(id: AnimeId) -> Self {
        id.0
    }
}

impl From<i32> for AnimeId {
    fn from(id: i32) -> Self {
        Self::new(id)
    }
}

impl Serialize for AnimeId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_i32(self.0)
    }
}

impl<'de> Deserialize<'de> for AnimeId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let id = i32::deserialize(deserializer)?;
        if id < 0 {
            return Err(serde::de::Error::custom(format!(
                "anime id must be non-negative, got {id}"
            )));
        }
        Ok(Self::new(id))
    }
}

/// Kind of an explicit catalog relation between two anime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    Sequel,
    Prequel,
    SideStory,
    Alternative,
    Adaptation,
    Other,
}

impl RelationType {
    /// Whether following this edge moves forwards or backwards in release order.
    ///
    /// Side stories and alternative versions sit beside the main line, so their
    /// placement has to come from the title or the release date instead.
    #[must_use]
    pub const fn is_chronological(self) -> bool {
        matches!(self, Self::Sequel | Self::Prequel)
    }

    /// The relation as seen from the other end of the edge.
    #[must_use]
    pub const fn inverse(self) -> Self {
        match self {
            Self::Sequel => Self::Prequel,
            Self::Prequel => Self::Sequel,
            other => other,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sequel => "sequel",
            Self::Prequel => "prequel",
            Self::SideStory => "side_story",
            Self::Alternative => "alternative",
            Self::Adaptation => "adaptation",
            Self::Other => "other",
        }
    }

    /// Parses a catalog relation label. Unknown labels become [`RelationType::Other`].
    #[must_use]
    pub fn parse(label: &str) -> Self {
        let normalized: String = label
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "sequel" => Self::Sequel,
            "prequel" => Self::Prequel,
            "sidestory" => Self::SideStory,
            "alternative" | "alternativeversion" | "alternativesetting" => Self::Alternative,
            "adaptation" => Self::Adaptation,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of signal whose reliability is tracked by the confidence store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    RelationshipType,
    TitlePattern,
    StudioMatch,
    YearProximity,
    FuzzyMatch,
}

impl PatternType {
    pub const ALL: [Self; 5] = [
        Self::RelationshipType,
        Self::TitlePattern,
        Self::StudioMatch,
        Self::YearProximity,
        Self::FuzzyMatch,
    ];

    /// Prior belief in the signal before any outcome has been observed.
    #[must_use]
    pub const fn initial_confidence(self) -> f64 {
        match self {
            Self::RelationshipType => 0.9,
            Self::TitlePattern => 0.7,
            Self::StudioMatch => 0.6,
            Self::YearProximity | Self::FuzzyMatch => 0.5,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RelationshipType => "relationship_type",
            Self::TitlePattern => "title_pattern",
            Self::StudioMatch => "studio_match",
            Self::YearProximity => "year_proximity",
            Self::FuzzyMatch => "fuzzy_match",
        }
    }
}

/// Prior for a pattern type stored as a raw string (rows written by older builds).
#[must_use]
pub fn initial_confidence_for(raw_type: &str) -> f64 {
    raw_type
        .parse::<PatternType>()
        .map_or(0.5, PatternType::initial_confidence)
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatternType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown pattern type: {s}"))
    }
}

/// A `(pattern_type, pattern)` pair, the unit of learned trust.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PatternKey {
    pub pattern_type: PatternType,
    pub pattern: String,
}

impl PatternKey {
    #[must_use]
    pub fn new(pattern_type: PatternType, pattern: impl Into<String>) -> Self {
        Self {
            pattern_type,
            pattern: pattern.into(),
        }
    }
}

impl fmt::Display for PatternKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.pattern_type, self.pattern)
    }
}

impl FromStr for PatternKey {
    type Err = String;

    /// Parses `type:value`, e.g. `title_pattern:series x`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, value) = s
            .split_once(':')
            .ok_or_else(|| format!("expected <type>:<pattern>, got '{s}'"))?;
        let value = value.trim();
        if value.is_empty() {
            return Err(format!("empty pattern in '{s}'"));
        }
        Ok(Self::new(kind.parse()?, value))
    }
}

/// Which evidence produced a season candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeasonSource {
    Graph,
    Title,
}

/// User correction applied to a computed group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackAction {
    Merge,
    Split,
    Confirm,
}

impl FeedbackAction {
    /// Merge and split both mean the engine grouped something wrongly.
    #[must_use]
    pub const fn is_correction(self) -> bool {
        matches!(self, Self::Merge | Self::Split)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Split => "split",
            Self::Confirm => "confirm",
        }
    }
}

impl FromStr for FeedbackAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "merge" => Ok(Self::Merge),
            "split" => Ok(Self::Split),
            "confirm" => Ok(Self::Confirm),
            other => Err(format!("unknown feedback action: {other}")),
        }
    }
}

impl fmt::Display for FeedbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How sure the user was about a correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackConfidence {
    Low,
    #[default]
    Medium,
    High,
}

impl FeedbackConfidence {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl FromStr for FeedbackConfidence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("unknown feedback confidence: {other}")),
        }
    }
}

impl fmt::Display for FeedbackConfidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One criterion in the chain that decides which entry keeps a contested season number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Relationship-graph members beat title matches.
    GraphSource,
    HigherConfidence,
    EarlierStartDate,
}

impl TieBreak {
    pub const DEFAULT_CHAIN: [Self; 3] = [
        Self::GraphSource,
        Self::HigherConfidence,
        Self::EarlierStartDate,
    ];
}

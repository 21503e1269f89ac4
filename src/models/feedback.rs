use crate::domain::{AnimeId, FeedbackAction, FeedbackConfidence};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persistent trust record for one `(pattern_type, pattern)` key.
///
/// The type is kept as stored text so rows written with a type this build does
/// not know still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupingPattern {
    pub pattern_type: String,
    pub pattern: String,
    pub success_count: i64,
    pub failure_count: i64,
    pub confidence: f64,
    pub last_used: DateTime<Utc>,
    pub decayed_at: Option<DateTime<Utc>>,
}

impl GroupingPattern {
    #[must_use]
    pub const fn total_outcomes(&self) -> i64 {
        self.success_count + self.failure_count
    }
}

/// A user correction as submitted by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFeedback {
    pub anime_id: AnimeId,
    pub group_type: String,
    pub action: FeedbackAction,
    #[serde(default)]
    pub source_group_id: Option<String>,
    #[serde(default)]
    pub target_group_id: Option<String>,
    #[serde(default)]
    pub confidence: Option<FeedbackConfidence>,
}

impl NewFeedback {
    #[must_use]
    pub fn new(anime_id: AnimeId, action: FeedbackAction) -> Self {
        Self {
            anime_id,
            group_type: "series".to_string(),
            action,
            source_group_id: None,
            target_group_id: None,
            confidence: None,
        }
    }
}

/// Append-only audit row of a user correction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupingFeedback {
    pub id: i32,
    pub anime_id: AnimeId,
    pub group_type: String,
    pub action: FeedbackAction,
    pub source_group_id: Option<String>,
    pub target_group_id: Option<String>,
    pub confidence: FeedbackConfidence,
    pub created_at: DateTime<Utc>,
}

/// Feedback counts over a time window, for trend analysis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FeedbackSummary {
    pub merges: u64,
    pub splits: u64,
    pub confirms: u64,
}

impl FeedbackSummary {
    #[must_use]
    pub const fn corrections(&self) -> u64 {
        self.merges + self.splits
    }

    #[must_use]
    pub const fn total(&self) -> u64 {
        self.merges + self.splits + self.confirms
    }
}

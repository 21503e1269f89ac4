//! Collaborator interfaces the grouping engine depends on.
//!
//! The engine never touches a database handle directly; [`crate::db::Store`]
//! implements these over `SeaORM`, tests may substitute anything else.

use crate::domain::{AnimeId, FeedbackConfidence};
use crate::models::anime::{CatalogAnime, RelationEdge};
use crate::models::feedback::{FeedbackSummary, GroupingFeedback, GroupingPattern, NewFeedback};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Read access to the anime catalog.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn find_anime(&self, id: AnimeId) -> Result<Option<CatalogAnime>>;

    async fn find_anime_many(&self, ids: &[AnimeId]) -> Result<Vec<CatalogAnime>>;

    /// Every explicit edge touching `id`, oriented so that `edge.anime_id == id`.
    async fn find_relations(&self, id: AnimeId) -> Result<Vec<RelationEdge>>;

    /// Entries whose title or English title contains `term` (case-insensitive),
    /// ordered by id, at most `limit` rows.
    async fn search_titles(&self, term: &str, limit: u64) -> Result<Vec<CatalogAnime>>;
}

/// Key-value store of learned pattern trust, keyed by `(pattern_type, pattern)`.
#[async_trait]
pub trait PatternRepository: Send + Sync {
    async fn find_pattern(&self, pattern_type: &str, pattern: &str)
    -> Result<Option<GroupingPattern>>;

    /// Inserts `row` unless the key already exists. Returns whether it was inserted.
    async fn insert_pattern_if_absent(&self, row: &GroupingPattern) -> Result<bool>;

    /// Replaces the stored row with `updated` only if it still matches
    /// `expected`'s outcome counters and `last_used`. Returns whether it swapped.
    async fn compare_and_swap_pattern(
        &self,
        expected: &GroupingPattern,
        updated: &GroupingPattern,
    ) -> Result<bool>;

    async fn list_patterns(&self, pattern_type: Option<&str>) -> Result<Vec<GroupingPattern>>;

    /// Patterns last used before `used_before` whose confidence is above `min_confidence`.
    async fn list_stale_patterns(
        &self,
        used_before: DateTime<Utc>,
        min_confidence: f64,
    ) -> Result<Vec<GroupingPattern>>;
}

/// Append-only log of user corrections.
#[async_trait]
pub trait FeedbackRepository: Send + Sync {
    async fn append_feedback(
        &self,
        feedback: &NewFeedback,
        confidence: FeedbackConfidence,
    ) -> Result<GroupingFeedback>;

    async fn list_feedback(
        &self,
        anime_id: Option<AnimeId>,
        limit: u64,
    ) -> Result<Vec<GroupingFeedback>>;

    async fn summarize_feedback(&self, since: DateTime<Utc>) -> Result<FeedbackSummary>;
}

/// Time-bounded named leases, used to keep background jobs single-instance.
#[async_trait]
pub trait LeaseRepository: Send + Sync {
    /// Takes or renews the lease if it is free, expired, or already ours.
    async fn try_acquire_lease(&self, job_name: &str, holder: &str, ttl_seconds: i64)
    -> Result<bool>;

    async fn release_lease(&self, job_name: &str, holder: &str) -> Result<()>;
}

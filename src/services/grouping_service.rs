//! Domain service for series grouping.
//!
//! This module provides the [`GroupingService`] trait: given an anchor anime,
//! produce the ordered [`SeriesGroup`] it belongs to.

use crate::domain::AnimeId;
use crate::models::season::SeriesGroup;
use thiserror::Error;

/// Domain errors for grouping and learning operations.
///
/// An anchor with no relations and no title matches is not an error; it yields
/// a singleton group. Season-number conflicts are returned as data.
#[derive(Debug, Error)]
pub enum GroupingError {
    #[error("Anime {0} not found")]
    NotFound(AnimeId),

    #[error("Repository unavailable: {0}")]
    RepositoryUnavailable(String),

    #[error("Concurrent update lost for pattern {pattern_type}:{pattern}")]
    Contention {
        pattern_type: String,
        pattern: String,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<sea_orm::DbErr> for GroupingError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::RepositoryUnavailable(err.to_string())
    }
}

impl From<anyhow::Error> for GroupingError {
    fn from(err: anyhow::Error) -> Self {
        Self::RepositoryUnavailable(err.to_string())
    }
}

/// Domain service trait for series grouping.
#[async_trait::async_trait]
pub trait GroupingService: Send + Sync {
    /// Groups the series the anchor belongs to.
    ///
    /// Read-only: no confidence is updated as a side effect, so an abandoned
    /// request leaves nothing half-applied.
    ///
    /// # Errors
    ///
    /// - Returns [`GroupingError::NotFound`] if the anchor does not exist
    /// - Returns [`GroupingError::RepositoryUnavailable`] on storage failures
    async fn group_series(&self, anchor: AnimeId) -> Result<SeriesGroup, GroupingError>;

    /// Groups unrelated anchors in parallel, at most `concurrency` at a time.
    ///
    /// Results come back in input order; one failed anchor does not fail the batch.
    async fn group_many(
        &self,
        anchors: &[AnimeId],
        concurrency: usize,
    ) -> Vec<(AnimeId, Result<SeriesGroup, GroupingError>)>;
}

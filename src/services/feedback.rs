//! Learning from outcomes and user corrections.
//!
//! The loop persists corrections and applies success/failure to the patterns the
//! caller names. It does not work out on its own which patterns were at fault.

use crate::config::LearningConfig;
use crate::domain::repository::{FeedbackRepository, PatternRepository};
use crate::domain::PatternKey;
use crate::models::feedback::{FeedbackSummary, GroupingFeedback, NewFeedback};
use crate::services::confidence::{PatternConfidenceStore, decay_factor};
use crate::services::grouping_service::GroupingError;
use chrono::{Duration, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Patterns at or below this confidence are left alone by decay.
const DECAY_MIN_CONFIDENCE: f64 = 0.2;

/// What a feedback submission changed.
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackReceipt {
    pub feedback: GroupingFeedback,
    /// New confidence per pattern, `None` where the update was dropped.
    pub updates: Vec<(PatternKey, Option<f64>)>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DecayReport {
    pub examined: usize,
    pub decayed: usize,
    /// Decayed recently enough that this run left them alone.
    pub skipped_recent: usize,
    /// Used again between listing and writing.
    pub raced: usize,
    pub failed: usize,
}

pub struct FeedbackLoop {
    feedback: Arc<dyn FeedbackRepository>,
    patterns: Arc<dyn PatternRepository>,
    confidence: Arc<PatternConfidenceStore>,
    learning: LearningConfig,
}

impl FeedbackLoop {
    #[must_use]
    pub fn new(
        feedback: Arc<dyn FeedbackRepository>,
        patterns: Arc<dyn PatternRepository>,
        confidence: Arc<PatternConfidenceStore>,
        learning: LearningConfig,
    ) -> Self {
        Self {
            feedback,
            patterns,
            confidence,
            learning,
        }
    }

    /// Records the correction, then marks `patterns` as failed for merge/split
    /// or as succeeded for confirm.
    ///
    /// # Errors
    ///
    /// - Returns [`GroupingError::InvalidInput`] for an empty group type
    /// - Returns [`GroupingError::RepositoryUnavailable`] if the feedback row
    ///   cannot be written; pattern updates are best-effort
    pub async fn learn_from_feedback(
        &self,
        feedback: &NewFeedback,
        patterns: &[PatternKey],
    ) -> Result<FeedbackReceipt, GroupingError> {
        if feedback.group_type.trim().is_empty() {
            return Err(GroupingError::InvalidInput(
                "group_type must not be empty".to_string(),
            ));
        }

        let confidence = feedback
            .confidence
            .unwrap_or(self.learning.default_feedback_confidence);
        let stored = self.feedback.append_feedback(feedback, confidence).await?;

        metrics::counter!("feedback_recorded_total", "action" => feedback.action.as_str())
            .increment(1);
        info!(
            event = "feedback_recorded",
            anime_id = %feedback.anime_id,
            action = %feedback.action,
            confidence = %confidence,
            patterns = patterns.len(),
            "Grouping feedback recorded"
        );

        let success = !feedback.action.is_correction();
        let updates = self.record_outcome(patterns, success).await;

        Ok(FeedbackReceipt {
            feedback: stored,
            updates,
        })
    }

    /// Applies one outcome to every distinct key, concurrently. A dropped write
    /// for one key does not affect the others.
    pub async fn record_outcome(
        &self,
        patterns: &[PatternKey],
        success: bool,
    ) -> Vec<(PatternKey, Option<f64>)> {
        let unique: BTreeSet<&PatternKey> = patterns.iter().collect();

        futures::future::join_all(unique.into_iter().map(|key| async move {
            let confidence = if success {
                self.confidence.record_success(key).await
            } else {
                self.confidence.record_failure(key).await
            };
            (key.clone(), confidence)
        }))
        .await
    }

    /// Pulls every pattern unused for `days_threshold` days toward the floor.
    ///
    /// Safe to interrupt and re-run: rows decayed within the configured interval
    /// are skipped, and each row is written independently.
    pub async fn decay_old_patterns(
        &self,
        days_threshold: i64,
    ) -> Result<DecayReport, GroupingError> {
        let now = Utc::now();
        let cutoff = now - Duration::days(days_threshold.max(0));
        let recent = now - Duration::hours(self.learning.decay_min_interval_hours.max(0));
        #[allow(clippy::cast_precision_loss)]
        let horizon = self.learning.decay_horizon_days as f64;

        let stale = self
            .patterns
            .list_stale_patterns(cutoff, DECAY_MIN_CONFIDENCE)
            .await?;

        let mut report = DecayReport {
            examined: stale.len(),
            ..DecayReport::default()
        };

        for row in stale {
            if row.decayed_at.is_some_and(|at| at > recent) {
                report.skipped_recent += 1;
                continue;
            }

            #[allow(clippy::cast_precision_loss)]
            let days_past = (cutoff - row.last_used).num_seconds() as f64 / 86_400.0;
            let factor = decay_factor(days_past, horizon);

            match self.confidence.apply_decay(&row, factor, now).await {
                Ok(Some(confidence)) => {
                    report.decayed += 1;
                    debug!(
                        pattern_type = %row.pattern_type,
                        pattern = %row.pattern,
                        from = row.confidence,
                        to = confidence,
                        "Pattern decayed"
                    );
                }
                Ok(None) => report.raced += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(
                        pattern_type = %row.pattern_type,
                        pattern = %row.pattern,
                        error = %e,
                        "Pattern decay failed, leaving for next run"
                    );
                }
            }
        }

        metrics::counter!("patterns_decayed_total").increment(report.decayed as u64);
        info!(
            event = "patterns_decayed",
            threshold_days = days_threshold,
            examined = report.examined,
            decayed = report.decayed,
            skipped_recent = report.skipped_recent,
            raced = report.raced,
            failed = report.failed,
            "Pattern decay pass finished"
        );

        Ok(report)
    }

    /// Feedback counts per action over the last `since_days` days.
    pub async fn summary(&self, since_days: i64) -> Result<FeedbackSummary, GroupingError> {
        let since = Utc::now() - Duration::days(since_days.max(0));
        Ok(self.feedback.summarize_feedback(since).await?)
    }
}

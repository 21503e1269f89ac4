//! Learned trust per `(pattern_type, pattern)` key.
//!
//! Reads go straight to the repository and may observe a slightly stale value.
//! Writes are serialized per key in-process and guarded by a compare-and-swap in
//! the repository, so two instances sharing a database cannot clobber each other.
//! A write that still loses is logged and dropped.

use crate::domain::repository::PatternRepository;
use crate::domain::{MAX_CONFIDENCE, MIN_CONFIDENCE, PatternKey, initial_confidence_for};
use crate::models::feedback::GroupingPattern;
use crate::services::grouping_service::GroupingError;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Weight of lifetime performance against the previous confidence.
const PERFORMANCE_WEIGHT: f64 = 0.9;

/// Lowest multiplier a single decay pass can apply.
const MIN_DECAY_FACTOR: f64 = 0.5;

#[must_use]
pub fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        return MIN_CONFIDENCE;
    }
    confidence.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
}

/// Blends the success ratio with the previous confidence, 90/10.
///
/// Counts are the values after the current outcome has been added.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn updated_confidence(success_count: i64, failure_count: i64, previous: f64) -> f64 {
    let total = success_count + failure_count;
    if total <= 0 {
        return clamp_confidence(previous);
    }

    let performance = success_count as f64 / total as f64;
    clamp_confidence(performance.mul_add(PERFORMANCE_WEIGHT, previous * (1.0 - PERFORMANCE_WEIGHT)))
}

/// Linear factor in `[0.5, 1.0]`, shrinking over `horizon_days` past the threshold.
#[must_use]
pub fn decay_factor(days_past_threshold: f64, horizon_days: f64) -> f64 {
    if days_past_threshold <= 0.0 || horizon_days <= 0.0 {
        return 1.0;
    }
    (1.0 - days_past_threshold / horizon_days).clamp(MIN_DECAY_FACTOR, 1.0)
}

/// Applies `factor`, never raising the value and never going below the floor.
#[must_use]
pub fn decayed_confidence(confidence: f64, factor: f64) -> f64 {
    (confidence * factor.clamp(MIN_DECAY_FACTOR, 1.0))
        .max(MIN_CONFIDENCE)
        .min(confidence)
}

pub struct PatternConfidenceStore {
    repo: Arc<dyn PatternRepository>,
    locks: Mutex<HashMap<PatternKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl PatternConfidenceStore {
    #[must_use]
    pub fn new(repo: Arc<dyn PatternRepository>) -> Self {
        Self {
            repo,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Stored confidence, or the type's prior for a key never seen.
    pub async fn get_confidence(&self, key: &PatternKey) -> Result<f64, GroupingError> {
        self.get_confidence_raw(key.pattern_type.as_str(), &key.pattern)
            .await
    }

    /// Same as [`Self::get_confidence`] for a type name that may not be known
    /// to this build.
    pub async fn get_confidence_raw(
        &self,
        pattern_type: &str,
        pattern: &str,
    ) -> Result<f64, GroupingError> {
        let stored = self.repo.find_pattern(pattern_type, pattern).await?;
        Ok(stored.map_or_else(
            || initial_confidence_for(pattern_type),
            |row| row.confidence,
        ))
    }

    /// Returns the new confidence, or `None` if the write was dropped.
    pub async fn record_success(&self, key: &PatternKey) -> Option<f64> {
        self.record(key, true).await
    }

    /// Returns the new confidence, or `None` if the write was dropped.
    pub async fn record_failure(&self, key: &PatternKey) -> Option<f64> {
        self.record(key, false).await
    }

    async fn record(&self, key: &PatternKey, success: bool) -> Option<f64> {
        let outcome = if success { "success" } else { "failure" };
        match self.try_record(key, success).await {
            Ok(confidence) => {
                metrics::counter!("pattern_updates_total", "outcome" => outcome).increment(1);
                debug!(pattern = %key, outcome, confidence, "Pattern confidence updated");
                Some(confidence)
            }
            Err(e) => {
                metrics::counter!("pattern_updates_dropped_total").increment(1);
                warn!(
                    event = "pattern_update_dropped",
                    pattern = %key,
                    outcome,
                    error = %e,
                    "Dropping confidence update"
                );
                None
            }
        }
    }

    /// One read-modify-write under the key lock. A lost compare-and-swap is
    /// reported as [`GroupingError::Contention`], not retried.
    pub async fn try_record(&self, key: &PatternKey, success: bool) -> Result<f64, GroupingError> {
        let lock = self.lock_for(key);
        let result = {
            let _guard = lock.lock().await;
            self.apply_outcome(key, success).await
        };
        drop(lock);
        self.release_idle_locks();
        result
    }

    async fn apply_outcome(&self, key: &PatternKey, success: bool) -> Result<f64, GroupingError> {
        let pattern_type = key.pattern_type.as_str();
        let now = Utc::now();

        let current = match self.repo.find_pattern(pattern_type, &key.pattern).await? {
            Some(row) => row,
            None => {
                let fresh = GroupingPattern {
                    pattern_type: pattern_type.to_string(),
                    pattern: key.pattern.clone(),
                    success_count: 0,
                    failure_count: 0,
                    confidence: key.pattern_type.initial_confidence(),
                    last_used: now,
                    decayed_at: None,
                };
                self.repo.insert_pattern_if_absent(&fresh).await?;
                self.repo
                    .find_pattern(pattern_type, &key.pattern)
                    .await?
                    .ok_or_else(|| {
                        GroupingError::RepositoryUnavailable(format!(
                            "pattern {key} missing after insert"
                        ))
                    })?
            }
        };

        let mut updated = current.clone();
        if success {
            updated.success_count += 1;
        } else {
            updated.failure_count += 1;
        }
        updated.confidence =
            updated_confidence(updated.success_count, updated.failure_count, current.confidence);
        updated.last_used = now.max(current.last_used);

        if self.repo.compare_and_swap_pattern(&current, &updated).await? {
            Ok(updated.confidence)
        } else {
            Err(GroupingError::Contention {
                pattern_type: pattern_type.to_string(),
                pattern: key.pattern.clone(),
            })
        }
    }

    /// Scales one stale row by `factor`. Returns the new confidence, or `None`
    /// if the row changed underneath (it was used, so it is active again).
    pub async fn apply_decay(
        &self,
        row: &GroupingPattern,
        factor: f64,
        now: DateTime<Utc>,
    ) -> Result<Option<f64>, GroupingError> {
        let mut updated = row.clone();
        updated.confidence = decayed_confidence(row.confidence, factor);
        updated.decayed_at = Some(now);

        let swapped = match row.pattern_type.parse() {
            Ok(pattern_type) => {
                let key = PatternKey::new(pattern_type, row.pattern.clone());
                let lock = self.lock_for(&key);
                let swapped = {
                    let _guard = lock.lock().await;
                    self.repo.compare_and_swap_pattern(row, &updated).await?
                };
                drop(lock);
                self.release_idle_locks();
                swapped
            }
            // Unknown types are never written by this build, so no local lock is needed.
            Err(_) => self.repo.compare_and_swap_pattern(row, &updated).await?,
        };

        Ok(swapped.then_some(updated.confidence))
    }

    fn lock_for(&self, key: &PatternKey) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        locks.entry(key.clone()).or_default().clone()
    }

    fn release_idle_locks(&self) {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }
}

//! Integration tests for the confidence store, feedback loop and decay job.

use chrono::{Duration, Utc};
use seasonarr::config::Config;
use seasonarr::domain::repository::{LeaseRepository, PatternRepository};
use seasonarr::domain::{AnimeId, FeedbackAction, PatternKey, PatternType, RelationType};
use seasonarr::models::anime::{CatalogAnime, RelationEdge};
use seasonarr::models::feedback::{GroupingPattern, NewFeedback};
use seasonarr::services::GroupingError;
use seasonarr::SharedState;

async fn spawn_state() -> SharedState {
    let db_path =
        std::env::temp_dir().join(format!("seasonarr-learning-test-{}.db", uuid::Uuid::new_v4()));

    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}", db_path.display());
    config.scheduler.enabled = false;

    SharedState::new(config)
        .await
        .expect("failed to create state")
}

fn anime(id: i32, title: &str) -> CatalogAnime {
    CatalogAnime {
        id: AnimeId::new(id),
        slug: format!("anime-{id}"),
        title: title.to_string(),
        title_english: None,
        year: None,
        anime_type: None,
        episode_count: None,
        cover_image: None,
        average_rating: None,
        status: None,
        start_date: None,
        studios: Vec::new(),
    }
}

fn stale_pattern(
    pattern_type: PatternType,
    pattern: &str,
    confidence: f64,
    age_days: i64,
) -> GroupingPattern {
    GroupingPattern {
        pattern_type: pattern_type.as_str().to_string(),
        pattern: pattern.to_string(),
        success_count: 4,
        failure_count: 1,
        confidence,
        last_used: Utc::now() - Duration::days(age_days),
        decayed_at: None,
    }
}

async fn stored_confidence(state: &SharedState, pattern_type: PatternType, pattern: &str) -> f64 {
    state
        .store
        .find_pattern(pattern_type.as_str(), pattern)
        .await
        .unwrap()
        .expect("pattern row missing")
        .confidence
}

#[tokio::test]
async fn test_unseen_pattern_uses_type_prior() {
    let state = spawn_state().await;
    let key = PatternKey::new(PatternType::TitlePattern, "series x");

    let confidence = state.confidence.get_confidence(&key).await.unwrap();
    assert!((confidence - 0.7).abs() < 1e-9);

    let rows = state.store.list_patterns(None).await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_three_successes_clamp_at_ceiling() {
    let state = spawn_state().await;
    let key = PatternKey::new(PatternType::TitlePattern, "series x");

    for _ in 0..3 {
        let confidence = state.confidence.record_success(&key).await;
        assert!(confidence.is_some());
    }

    let row = state
        .store
        .find_pattern("title_pattern", "series x")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.success_count, 3);
    assert_eq!(row.failure_count, 0);
    assert!((row.confidence - 0.95).abs() < 1e-9);
}

#[tokio::test]
async fn test_concurrent_updates_on_one_key_are_all_counted() {
    let state = spawn_state().await;
    let key = PatternKey::new(PatternType::RelationshipType, "sequel");

    let updates = futures::future::join_all((0..5).map(|_| {
        let confidence = state.confidence.clone();
        let key = key.clone();
        tokio::spawn(async move { confidence.record_success(&key).await })
    }))
    .await;
    assert!(updates.into_iter().all(|u| u.unwrap().is_some()));

    let row = state
        .store
        .find_pattern("relationship_type", "sequel")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.success_count, 5);
    assert!(row.confidence <= 0.95);
}

#[tokio::test]
async fn test_split_feedback_drops_title_matched_member() {
    let state = spawn_state().await;
    state
        .store
        .import_catalog(
            &[anime(10, "Series Y"), anime(11, "Series Y Season 2")],
            &[],
        )
        .await
        .unwrap();

    let before = state.grouping.group_series(AnimeId::new(11)).await.unwrap();
    assert_eq!(before.len(), 2);
    let patterns = before.contributing_patterns();
    assert_eq!(patterns.len(), 1);
    assert_eq!(patterns[0].pattern_type, PatternType::TitlePattern);

    let receipt = state
        .feedback
        .learn_from_feedback(
            &NewFeedback::new(AnimeId::new(10), FeedbackAction::Split),
            &patterns,
        )
        .await
        .unwrap();
    assert_eq!(receipt.feedback.action, FeedbackAction::Split);
    assert_eq!(receipt.updates.len(), 1);
    let lowered = receipt.updates[0].1.expect("update dropped");
    assert!(lowered <= 0.4);

    let after = state.grouping.group_series(AnimeId::new(11)).await.unwrap();
    assert_eq!(after.anime_ids(), vec![AnimeId::new(11)]);
}

#[tokio::test]
async fn test_confirm_feedback_raises_confidence() {
    let state = spawn_state().await;
    let key = PatternKey::new(PatternType::RelationshipType, "side_story");
    let prior = state.confidence.get_confidence(&key).await.unwrap();

    let receipt = state
        .feedback
        .learn_from_feedback(
            &NewFeedback::new(AnimeId::new(1), FeedbackAction::Confirm),
            &[key.clone(), key.clone()],
        )
        .await
        .unwrap();

    assert_eq!(receipt.updates.len(), 1);
    let raised = receipt.updates[0].1.unwrap();
    assert!(raised > prior);
    assert!(raised <= 0.95);
}

#[tokio::test]
async fn test_feedback_requires_group_type() {
    let state = spawn_state().await;
    let mut feedback = NewFeedback::new(AnimeId::new(1), FeedbackAction::Merge);
    feedback.group_type = "  ".to_string();

    let err = state
        .feedback
        .learn_from_feedback(&feedback, &[])
        .await
        .unwrap_err();
    assert!(matches!(err, GroupingError::InvalidInput(_)));

    let summary = state.feedback.summary(30).await.unwrap();
    assert_eq!(summary.total(), 0);
}

#[tokio::test]
async fn test_feedback_summary_counts_per_action() {
    let state = spawn_state().await;
    for action in [
        FeedbackAction::Merge,
        FeedbackAction::Split,
        FeedbackAction::Split,
        FeedbackAction::Confirm,
    ] {
        state
            .feedback
            .learn_from_feedback(&NewFeedback::new(AnimeId::new(5), action), &[])
            .await
            .unwrap();
    }

    let summary = state.feedback.summary(7).await.unwrap();
    assert_eq!(summary.merges, 1);
    assert_eq!(summary.splits, 2);
    assert_eq!(summary.confirms, 1);
    assert_eq!(summary.corrections(), 3);
}

#[tokio::test]
async fn test_decay_lowers_stale_patterns_once_per_window() {
    let state = spawn_state().await;
    let rows = [
        stale_pattern(PatternType::RelationshipType, "sequel", 0.8, 200),
        stale_pattern(PatternType::TitlePattern, "fresh", 0.8, 1),
        stale_pattern(PatternType::TitlePattern, "floor", 0.15, 400),
    ];
    for row in &rows {
        assert!(state.store.insert_pattern_if_absent(row).await.unwrap());
    }

    let report = state.feedback.decay_old_patterns(90).await.unwrap();
    assert_eq!(report.examined, 1);
    assert_eq!(report.decayed, 1);

    let decayed = stored_confidence(&state, PatternType::RelationshipType, "sequel").await;
    assert!(decayed < 0.8);
    assert!(decayed >= 0.4);
    let fresh = stored_confidence(&state, PatternType::TitlePattern, "fresh").await;
    assert!((fresh - 0.8).abs() < 1e-9);
    let floor = stored_confidence(&state, PatternType::TitlePattern, "floor").await;
    assert!((floor - 0.15).abs() < 1e-9);

    let again = state.feedback.decay_old_patterns(90).await.unwrap();
    assert_eq!(again.decayed, 0);
    assert_eq!(again.skipped_recent, 1);
    let unchanged = stored_confidence(&state, PatternType::RelationshipType, "sequel").await;
    assert!((unchanged - decayed).abs() < 1e-9);
}

#[tokio::test]
async fn test_used_pattern_leaves_decay_candidates() {
    let state = spawn_state().await;
    let row = stale_pattern(PatternType::TitlePattern, "series q", 0.6, 120);
    state.store.insert_pattern_if_absent(&row).await.unwrap();

    let key = PatternKey::new(PatternType::TitlePattern, "series q");
    assert!(state.confidence.record_failure(&key).await.is_some());

    let report = state.feedback.decay_old_patterns(90).await.unwrap();
    assert_eq!(report.examined, 0);
}

#[tokio::test]
async fn test_lease_is_exclusive_until_released() {
    let state = spawn_state().await;
    let store = &state.store;

    assert!(store.try_acquire_lease("decay", "a", 60).await.unwrap());
    assert!(!store.try_acquire_lease("decay", "b", 60).await.unwrap());
    assert!(store.try_acquire_lease("decay", "a", 60).await.unwrap());
    assert!(store.try_acquire_lease("other", "b", 60).await.unwrap());

    store.release_lease("decay", "b").await.unwrap();
    assert!(!store.try_acquire_lease("decay", "b", 60).await.unwrap());

    store.release_lease("decay", "a").await.unwrap();
    assert!(store.try_acquire_lease("decay", "b", 60).await.unwrap());
}

#[tokio::test]
async fn test_expired_lease_can_be_taken_over() {
    let state = spawn_state().await;
    let store = &state.store;

    assert!(store.try_acquire_lease("decay", "a", -5).await.unwrap());
    assert!(store.try_acquire_lease("decay", "b", 60).await.unwrap());
    assert!(!store.try_acquire_lease("decay", "a", 60).await.unwrap());
}

#[tokio::test]
async fn test_scheduler_run_once_skips_when_lease_is_held() {
    let state = spawn_state().await;
    let scheduler = state.scheduler();

    let report = scheduler.run_once().await.unwrap();
    assert!(report.is_some());

    assert!(
        state
            .store
            .try_acquire_lease("decay_patterns", "elsewhere", 60)
            .await
            .unwrap()
    );
    assert!(scheduler.run_once().await.unwrap().is_none());
    assert!(!scheduler.is_running().await);
}

#[tokio::test]
async fn test_relation_confidence_follows_learning() {
    let state = spawn_state().await;
    state
        .store
        .import_catalog(
            &[anime(1, "Series X"), anime(2, "Series X Season 2")],
            &[RelationEdge {
                anime_id: AnimeId::new(1),
                related_anime_id: AnimeId::new(2),
                relation: RelationType::Sequel,
            }],
        )
        .await
        .unwrap();

    let key = PatternKey::new(PatternType::RelationshipType, "sequel");
    let learned = state.confidence.record_success(&key).await.unwrap();

    let group = state.grouping.group_series(AnimeId::new(1)).await.unwrap();
    let member = &group.seasons[1];
    assert_eq!(member.anime_id, AnimeId::new(2));
    assert!((member.confidence - learned).abs() < 1e-9);
}

use crate::db::{format_timestamp, parse_timestamp};
use crate::domain::{AnimeId, FeedbackAction, FeedbackConfidence};
use crate::entities::grouping_feedback;
use crate::models::feedback::{FeedbackSummary, GroupingFeedback, NewFeedback};
use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    sea_query::Expr,
};
use tracing::warn;

pub struct FeedbackRepository {
    conn: DatabaseConnection,
}

impl FeedbackRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_model(model: grouping_feedback::Model) -> Option<GroupingFeedback> {
        let action = match model.action.parse::<FeedbackAction>() {
            Ok(action) => action,
            Err(e) => {
                warn!(id = model.id, error = %e, "Skipping feedback row with unknown action");
                return None;
            }
        };

        Some(GroupingFeedback {
            id: model.id,
            anime_id: AnimeId::new(model.anime_id),
            group_type: model.group_type,
            action,
            source_group_id: model.source_group_id,
            target_group_id: model.target_group_id,
            confidence: model.confidence.parse().unwrap_or_default(),
            created_at: parse_timestamp(&model.created_at).unwrap_or_default(),
        })
    }

    pub async fn append(
        &self,
        feedback: &NewFeedback,
        confidence: FeedbackConfidence,
    ) -> Result<GroupingFeedback> {
        let created_at = Utc::now();
        let result = grouping_feedback::Entity::insert(grouping_feedback::ActiveModel {
            anime_id: Set(feedback.anime_id.value()),
            group_type: Set(feedback.group_type.clone()),
            action: Set(feedback.action.as_str().to_string()),
            source_group_id: Set(feedback.source_group_id.clone()),
            target_group_id: Set(feedback.target_group_id.clone()),
            confidence: Set(confidence.as_str().to_string()),
            created_at: Set(format_timestamp(created_at)),
            ..Default::default()
        })
        .exec(&self.conn)
        .await?;

        Ok(GroupingFeedback {
            id: result.last_insert_id,
            anime_id: feedback.anime_id,
            group_type: feedback.group_type.clone(),
            action: feedback.action,
            source_group_id: feedback.source_group_id.clone(),
            target_group_id: feedback.target_group_id.clone(),
            confidence,
            created_at,
        })
    }

    /// Newest first.
    pub async fn list(
        &self,
        anime_id: Option<AnimeId>,
        limit: u64,
    ) -> Result<Vec<GroupingFeedback>> {
        let mut query = grouping_feedback::Entity::find()
            .order_by_desc(grouping_feedback::Column::CreatedAt)
            .order_by_desc(grouping_feedback::Column::Id)
            .limit(limit);

        if let Some(anime_id) = anime_id {
            query = query.filter(grouping_feedback::Column::AnimeId.eq(anime_id.value()));
        }

        let rows = query.all(&self.conn).await?;
        Ok(rows.into_iter().filter_map(Self::map_model).collect())
    }

    pub async fn summary_since(&self, since: DateTime<Utc>) -> Result<FeedbackSummary> {
        let counts: Vec<(String, i64)> = grouping_feedback::Entity::find()
            .select_only()
            .column(grouping_feedback::Column::Action)
            .column_as(Expr::col(grouping_feedback::Column::Id).count(), "count")
            .filter(grouping_feedback::Column::CreatedAt.gte(format_timestamp(since)))
            .group_by(grouping_feedback::Column::Action)
            .into_tuple()
            .all(&self.conn)
            .await?;

        let mut summary = FeedbackSummary::default();
        for (action, count) in counts {
            let count = u64::try_from(count).unwrap_or(0);
            match action.parse::<FeedbackAction>() {
                Ok(FeedbackAction::Merge) => summary.merges += count,
                Ok(FeedbackAction::Split) => summary.splits += count,
                Ok(FeedbackAction::Confirm) => summary.confirms += count,
                Err(_) => {}
            }
        }

        Ok(summary)
    }
}

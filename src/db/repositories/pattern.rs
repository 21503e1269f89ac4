use crate::db::{format_timestamp, parse_timestamp};
use crate::entities::{grouping_patterns, prelude::*};
use crate::models::feedback::GroupingPattern;
use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    sea_query::{Expr, OnConflict},
};

pub struct PatternRepository {
    conn: DatabaseConnection,
}

impl PatternRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_model(model: grouping_patterns::Model) -> GroupingPattern {
        GroupingPattern {
            pattern_type: model.pattern_type,
            pattern: model.pattern,
            success_count: model.success_count,
            failure_count: model.failure_count,
            confidence: model.confidence,
            last_used: parse_timestamp(&model.last_used).unwrap_or_default(),
            decayed_at: model.decayed_at.as_deref().and_then(parse_timestamp),
        }
    }

    pub async fn get(&self, pattern_type: &str, pattern: &str) -> Result<Option<GroupingPattern>> {
        let row = GroupingPatterns::find_by_id((pattern_type.to_string(), pattern.to_string()))
            .one(&self.conn)
            .await?;
        Ok(row.map(Self::map_model))
    }

    pub async fn insert_if_absent(&self, row: &GroupingPattern) -> Result<bool> {
        let inserted = GroupingPatterns::insert(grouping_patterns::ActiveModel {
            pattern_type: Set(row.pattern_type.clone()),
            pattern: Set(row.pattern.clone()),
            success_count: Set(row.success_count),
            failure_count: Set(row.failure_count),
            confidence: Set(row.confidence),
            last_used: Set(format_timestamp(row.last_used)),
            decayed_at: Set(row.decayed_at.map(format_timestamp)),
        })
        .on_conflict(
            OnConflict::columns([
                grouping_patterns::Column::PatternType,
                grouping_patterns::Column::Pattern,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(&self.conn)
        .await?;

        Ok(inserted > 0)
    }

    /// Conditional update guarded by the row version `(success, failure, last_used)`.
    ///
    /// Every outcome bumps a counter and `last_used`, so a concurrent writer always
    /// changes at least one guard column.
    pub async fn compare_and_swap(
        &self,
        expected: &GroupingPattern,
        updated: &GroupingPattern,
    ) -> Result<bool> {
        let result = GroupingPatterns::update_many()
            .col_expr(
                grouping_patterns::Column::SuccessCount,
                Expr::value(updated.success_count),
            )
            .col_expr(
                grouping_patterns::Column::FailureCount,
                Expr::value(updated.failure_count),
            )
            .col_expr(
                grouping_patterns::Column::Confidence,
                Expr::value(updated.confidence),
            )
            .col_expr(
                grouping_patterns::Column::LastUsed,
                Expr::value(format_timestamp(updated.last_used)),
            )
            .col_expr(
                grouping_patterns::Column::DecayedAt,
                Expr::value(updated.decayed_at.map(format_timestamp)),
            )
            .filter(grouping_patterns::Column::PatternType.eq(expected.pattern_type.as_str()))
            .filter(grouping_patterns::Column::Pattern.eq(expected.pattern.as_str()))
            .filter(grouping_patterns::Column::SuccessCount.eq(expected.success_count))
            .filter(grouping_patterns::Column::FailureCount.eq(expected.failure_count))
            .filter(grouping_patterns::Column::LastUsed.eq(format_timestamp(expected.last_used)))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected == 1)
    }

    pub async fn list(&self, pattern_type: Option<&str>) -> Result<Vec<GroupingPattern>> {
        let mut query = GroupingPatterns::find()
            .order_by_asc(grouping_patterns::Column::PatternType)
            .order_by_desc(grouping_patterns::Column::Confidence)
            .order_by_asc(grouping_patterns::Column::Pattern);

        if let Some(pattern_type) = pattern_type {
            query = query.filter(grouping_patterns::Column::PatternType.eq(pattern_type));
        }

        let rows = query.all(&self.conn).await?;
        Ok(rows.into_iter().map(Self::map_model).collect())
    }

    /// Timestamps are fixed-width UTC strings, so text comparison is chronological.
    pub async fn list_stale(
        &self,
        used_before: DateTime<Utc>,
        min_confidence: f64,
    ) -> Result<Vec<GroupingPattern>> {
        let rows = GroupingPatterns::find()
            .filter(grouping_patterns::Column::LastUsed.lt(format_timestamp(used_before)))
            .filter(grouping_patterns::Column::Confidence.gt(min_confidence))
            .order_by_asc(grouping_patterns::Column::LastUsed)
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(Self::map_model).collect())
    }
}

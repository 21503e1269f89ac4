use crate::entities::prelude::*;
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        manager
            .create_table(
                schema
                    .create_table_from_entity(GroupingPatterns)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(GroupingFeedback)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_grouping_patterns_last_used")
                    .table(GroupingPatternsTable::Table)
                    .col(GroupingPatternsTable::LastUsed)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_grouping_feedback_created_at")
                    .table(GroupingFeedbackTable::Table)
                    .col(GroupingFeedbackTable::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GroupingFeedback).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(GroupingPatterns).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum GroupingPatternsTable {
    #[sea_orm(iden = "grouping_patterns")]
    Table,
    LastUsed,
}

#[derive(DeriveIden)]
enum GroupingFeedbackTable {
    #[sea_orm(iden = "grouping_feedback")]
    Table,
    CreatedAt,
}

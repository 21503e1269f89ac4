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
                    .create_table_from_entity(Anime)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(AnimeRelations)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_anime_title")
                    .table(AnimeTable::Table)
                    .col(AnimeTable::Title)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_anime_relations_anime_id")
                    .table(AnimeRelationsTable::Table)
                    .col(AnimeRelationsTable::AnimeId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_anime_relations_related_anime_id")
                    .table(AnimeRelationsTable::Table)
                    .col(AnimeRelationsTable::RelatedAnimeId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_anime_relations_unique_edge")
                    .table(AnimeRelationsTable::Table)
                    .col(AnimeRelationsTable::AnimeId)
                    .col(AnimeRelationsTable::RelatedAnimeId)
                    .col(AnimeRelationsTable::RelationType)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AnimeRelations).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Anime).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AnimeTable {
    #[sea_orm(iden = "anime")]
    Table,
    Title,
}

#[derive(DeriveIden)]
enum AnimeRelationsTable {
    #[sea_orm(iden = "anime_relations")]
    Table,
    AnimeId,
    RelatedAnimeId,
    RelationType,
}

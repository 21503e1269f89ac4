use sea_orm::entity::prelude::*;

/// Explicit catalog edge. Both ends are plain ids without a foreign key: catalogs
/// routinely reference entries that have not been imported yet.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "anime_relations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(indexed)]
    pub anime_id: i32,
    #[sea_orm(indexed)]
    pub related_anime_id: i32,
    pub relation_type: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

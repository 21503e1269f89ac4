use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "grouping_patterns")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub pattern_type: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub pattern: String,
    pub success_count: i64,
    pub failure_count: i64,
    pub confidence: f64,
    #[sea_orm(indexed)]
    pub last_used: String,
    pub decayed_at: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

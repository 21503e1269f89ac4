use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "anime")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    #[sea_orm(indexed)]
    pub slug: String,
    #[sea_orm(indexed)]
    pub title: String,
    pub title_english: Option<String>,
    pub year: Option<i32>,
    pub r#type: Option<String>,
    pub episode_count: Option<i32>,
    pub cover_image: Option<String>,
    pub average_rating: Option<f32>,
    pub status: Option<String>,
    /// ISO-8601 date (`YYYY-MM-DD`)
    pub start_date: Option<String>,
    pub studios: Option<String>, // JSON array stored as string
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

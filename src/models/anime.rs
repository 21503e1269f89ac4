use crate::domain::{AnimeId, RelationType};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A catalog entry, reduced to the fields grouping needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogAnime {
    pub id: AnimeId,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub title_english: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default, rename = "type")]
    pub anime_type: Option<String>,
    #[serde(default)]
    pub episode_count: Option<i32>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub average_rating: Option<f32>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// Stored and returned with the entry. Grouping does not read it; it is
    /// kept so a `studio_match` signal can be added without a re-import.
    #[serde(default)]
    pub studios: Vec<String>,
}

/// An explicit edge as seen from `anime_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationEdge {
    pub anime_id: AnimeId,
    pub related_anime_id: AnimeId,
    pub relation: RelationType,
}

/// Relation row as it appears in an import file; the label is free text.
#[derive(Debug, Clone, Deserialize)]
pub struct RelationRecord {
    pub anime_id: AnimeId,
    pub related_anime_id: AnimeId,
    pub relation_type: String,
}

impl RelationRecord {
    #[must_use]
    pub fn to_edge(&self) -> RelationEdge {
        RelationEdge {
            anime_id: self.anime_id,
            related_anime_id: self.related_anime_id,
            relation: RelationType::parse(&self.relation_type),
        }
    }
}

/// Shape of a catalog import file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogImport {
    #[serde(default)]
    pub anime: Vec<CatalogAnime>,
    #[serde(default)]
    pub relations: Vec<RelationRecord>,
}

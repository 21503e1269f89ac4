use crate::domain::{AnimeId, PatternKey, PatternType, RelationType, SeasonSource};
use crate::models::anime::CatalogAnime;
use crate::parser::title::normalize_for_matching;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Structured season information extracted from a raw title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonDescriptor {
    /// Display form with the original casing.
    pub series_name: String,
    pub season_number: Option<i32>,
    pub season_name: Option<String>,
}

impl SeasonDescriptor {
    /// Case-folded, stopword-free form used for every equality check.
    #[must_use]
    pub fn key(&self) -> String {
        normalize_for_matching(&self.series_name)
    }
}

/// A season candidate attached to a concrete catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonInfo {
    pub anime_id: AnimeId,
    pub slug: String,
    pub title: String,
    pub title_english: Option<String>,
    pub year: Option<i32>,
    pub anime_type: Option<String>,
    pub episode_count: Option<i32>,
    pub cover_image: Option<String>,
    pub average_rating: Option<f32>,
    pub status: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub season_number: Option<i32>,
    pub season_name: Option<String>,
    pub source: SeasonSource,
    pub confidence: f64,
    /// Edge through which a graph member was first reached. `None` for the anchor
    /// and for title matches.
    pub relation: Option<RelationType>,
}

impl SeasonInfo {
    #[must_use]
    pub fn from_catalog(
        anime: &CatalogAnime,
        descriptor: &SeasonDescriptor,
        source: SeasonSource,
        confidence: f64,
    ) -> Self {
        Self {
            anime_id: anime.id,
            slug: anime.slug.clone(),
            title: anime.title.clone(),
            title_english: anime.title_english.clone(),
            year: anime.year,
            anime_type: anime.anime_type.clone(),
            episode_count: anime.episode_count,
            cover_image: anime.cover_image.clone(),
            average_rating: anime.average_rating,
            status: anime.status.clone(),
            start_date: anime.start_date,
            season_number: descriptor.season_number,
            season_name: descriptor.season_name.clone(),
            source,
            confidence,
            relation: None,
        }
    }
}

/// Two candidates claimed the same season number; the loser was demoted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonConflict {
    pub season_number: i32,
    pub kept: AnimeId,
    pub demoted: AnimeId,
}

/// The final, ordered grouping returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesGroup {
    pub series_name: String,
    pub seasons: Vec<SeasonInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<SeasonConflict>,
}

impl SeriesGroup {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seasons.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seasons.len()
    }

    /// Ids in display order.
    #[must_use]
    pub fn anime_ids(&self) -> Vec<AnimeId> {
        self.seasons.iter().map(|s| s.anime_id).collect()
    }

    /// The learned patterns that produced this grouping.
    ///
    /// Callers hand these to the feedback loop when a user corrects the group.
    #[must_use]
    pub fn contributing_patterns(&self) -> Vec<PatternKey> {
        let mut keys = BTreeSet::new();
        for season in &self.seasons {
            match season.source {
                SeasonSource::Graph => {
                    if let Some(relation) = season.relation {
                        keys.insert(PatternKey::new(
                            PatternType::RelationshipType,
                            relation.as_str(),
                        ));
                    }
                }
                SeasonSource::Title => {
                    keys.insert(PatternKey::new(
                        PatternType::TitlePattern,
                        normalize_for_matching(&self.series_name),
                    ));
                }
            }
        }
        keys.into_iter().collect()
    }
}

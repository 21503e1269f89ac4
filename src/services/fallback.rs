//! Title-based grouping for anchors the relationship graph knows little about.
//!
//! Two passes: a broad, capped substring search over the catalog, then a strict
//! filter that re-parses every hit and keeps only exact series-name matches.

use crate::domain::repository::CatalogRepository;
use crate::domain::{AnimeId, PatternKey, PatternType, SeasonSource};
use crate::models::anime::CatalogAnime;
use crate::models::season::{SeasonDescriptor, SeasonInfo};
use crate::parser;
use crate::services::confidence::PatternConfidenceStore;
use crate::services::grouping_service::GroupingError;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

pub struct FallbackMatcher {
    catalog: Arc<dyn CatalogRepository>,
    confidence: Arc<PatternConfidenceStore>,
    candidate_limit: u64,
}

impl FallbackMatcher {
    #[must_use]
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        confidence: Arc<PatternConfidenceStore>,
        candidate_limit: u64,
    ) -> Self {
        Self {
            catalog,
            confidence,
            candidate_limit,
        }
    }

    /// Same-series entries for the given anchor titles, the anchor included when
    /// it lies inside the candidate window. Ordered by id.
    pub async fn match_by_title(
        &self,
        title: &str,
        title_english: Option<&str>,
    ) -> Result<Vec<SeasonInfo>, GroupingError> {
        let anchor = parser::parse(title, title_english);
        let anchor_key = anchor.key();
        if anchor_key.is_empty() {
            return Ok(Vec::new());
        }
        let anchor_english_key = title_english
            .filter(|t| !t.trim().is_empty())
            .map(|t| parser::parse(t, None).key());

        let candidates = self.candidates(&anchor, title_english).await?;
        let broad = candidates.len();

        let matched: Vec<(CatalogAnime, SeasonDescriptor)> = candidates
            .into_values()
            .filter_map(|candidate| {
                let descriptor =
                    parser::parse(&candidate.title, candidate.title_english.as_deref());
                let same_series = descriptor.key() == anchor_key
                    || matches!(
                        (&anchor_english_key, candidate.title_english.as_deref()),
                        (Some(key), Some(english)) if !english.trim().is_empty()
                            && parser::parse(english, None).key() == *key
                    );
                same_series.then_some((candidate, descriptor))
            })
            .collect();

        debug!(
            series = %anchor.series_name,
            broad,
            strict = matched.len(),
            "Fallback title match"
        );

        if matched.is_empty() {
            return Ok(Vec::new());
        }

        let key = PatternKey::new(PatternType::TitlePattern, anchor_key);
        let confidence = self.confidence.get_confidence(&key).await?;

        Ok(matched
            .iter()
            .map(|(anime, descriptor)| {
                SeasonInfo::from_catalog(anime, descriptor, SeasonSource::Title, confidence)
            })
            .collect())
    }

    /// Broad pass. The English series name is searched too when it differs, and
    /// the union stays within the candidate limit.
    async fn candidates(
        &self,
        anchor: &SeasonDescriptor,
        title_english: Option<&str>,
    ) -> Result<BTreeMap<AnimeId, CatalogAnime>, GroupingError> {
        let mut terms = vec![parser::search_term(&anchor.series_name)];
        if let Some(english) = title_english.filter(|t| !t.trim().is_empty()) {
            let term = parser::search_term(&parser::parse(english, None).series_name);
            if !terms.iter().any(|t| t.eq_ignore_ascii_case(&term)) {
                terms.push(term);
            }
        }

        let limit = usize::try_from(self.candidate_limit).unwrap_or(usize::MAX);
        let mut found = BTreeMap::new();
        for term in terms {
            if term.is_empty() || found.len() >= limit {
                continue;
            }
            for anime in self.catalog.search_titles(&term, self.candidate_limit).await? {
                if found.len() >= limit {
                    break;
                }
                found.entry(anime.id).or_insert(anime);
            }
        }

        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repository::PatternRepository;
    use crate::models::anime::RelationEdge;
    use crate::models::feedback::GroupingPattern;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    struct TitleCatalog(Vec<CatalogAnime>);

    #[async_trait]
    impl CatalogRepository for TitleCatalog {
        async fn find_anime(&self, id: AnimeId) -> anyhow::Result<Option<CatalogAnime>> {
            Ok(self.0.iter().find(|a| a.id == id).cloned())
        }

        async fn find_anime_many(&self, _ids: &[AnimeId]) -> anyhow::Result<Vec<CatalogAnime>> {
            Ok(Vec::new())
        }

        async fn find_relations(&self, _id: AnimeId) -> anyhow::Result<Vec<RelationEdge>> {
            Ok(Vec::new())
        }

        async fn search_titles(&self, term: &str, limit: u64) -> anyhow::Result<Vec<CatalogAnime>> {
            let term = term.to_lowercase();
            Ok(self
                .0
                .iter()
                .filter(|a| {
                    a.title.to_lowercase().contains(&term)
                        || a
                            .title_english
                            .as_deref()
                            .is_some_and(|t| t.to_lowercase().contains(&term))
                })
                .take(usize::try_from(limit).unwrap())
                .cloned()
                .collect())
        }
    }

    /// Pattern store with nothing learned yet.
    struct NoPatterns;

    #[async_trait]
    impl PatternRepository for NoPatterns {
        async fn find_pattern(
            &self,
            _t: &str,
            _p: &str,
        ) -> anyhow::Result<Option<GroupingPattern>> {
            Ok(None)
        }

        async fn insert_pattern_if_absent(&self, _row: &GroupingPattern) -> anyhow::Result<bool> {
            Ok(false)
        }

        async fn compare_and_swap_pattern(
            &self,
            _expected: &GroupingPattern,
            _updated: &GroupingPattern,
        ) -> anyhow::Result<bool> {
            Ok(false)
        }

        async fn list_patterns(&self, _t: Option<&str>) -> anyhow::Result<Vec<GroupingPattern>> {
            Ok(Vec::new())
        }

        async fn list_stale_patterns(
            &self,
            _before: DateTime<Utc>,
            _min: f64,
        ) -> anyhow::Result<Vec<GroupingPattern>> {
            Ok(Vec::new())
        }
    }

    fn anime(id: i32, title: &str, english: Option<&str>) -> CatalogAnime {
        CatalogAnime {
            id: AnimeId::new(id),
            slug: format!("anime-{id}"),
            title: title.to_string(),
            title_english: english.map(str::to_string),
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

    fn matcher(entries: Vec<CatalogAnime>, limit: u64) -> FallbackMatcher {
        FallbackMatcher::new(
            Arc::new(TitleCatalog(entries)),
            Arc::new(PatternConfidenceStore::new(Arc::new(NoPatterns))),
            limit,
        )
    }

    fn ids(seasons: &[SeasonInfo]) -> Vec<i32> {
        seasons.iter().map(|s| s.anime_id.value()).collect()
    }

    #[tokio::test]
    async fn subtitle_keeps_brotherhood_apart() {
        let m = matcher(
            vec![
                anime(1, "Fullmetal Alchemist", None),
                anime(2, "Fullmetal Alchemist: Brotherhood", None),
            ],
            50,
        );

        let seasons = m.match_by_title("Fullmetal Alchemist", None).await.unwrap();
        assert_eq!(ids(&seasons), vec![1]);

        let seasons = m
            .match_by_title("Fullmetal Alchemist: Brotherhood", None)
            .await
            .unwrap();
        assert_eq!(ids(&seasons), vec![2]);
    }

    #[tokio::test]
    async fn substring_hits_with_other_series_names_are_rejected() {
        let m = matcher(
            vec![
                anime(1, "Love Live!", None),
                anime(2, "Love Live! Sunshine!!", None),
                anime(3, "Love Live! 2nd Season", None),
            ],
            50,
        );

        let seasons = m.match_by_title("Love Live!", None).await.unwrap();
        assert_eq!(ids(&seasons), vec![1, 3]);
        assert_eq!(seasons[1].season_number, Some(2));
        assert!(seasons.iter().all(|s| s.source == SeasonSource::Title));
        assert!((seasons[0].confidence - 0.7).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn english_titles_bridge_different_romanizations() {
        let m = matcher(
            vec![
                anime(1, "Shingeki no Kyojin", Some("Attack on Titan")),
                anime(2, "Shingeki no Kyojin Season 2", Some("Attack on Titan Season 2")),
                anime(3, "Shinkyoku Soukai", Some("Attack on Titan Season 2")),
            ],
            50,
        );

        let seasons = m
            .match_by_title("Shingeki no Kyojin", Some("Attack on Titan"))
            .await
            .unwrap();
        assert_eq!(ids(&seasons), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn candidate_pool_is_capped() {
        let entries = (1..=10).map(|i| anime(i, &format!("Show Season {i}"), None)).collect();
        let seasons = matcher(entries, 4).match_by_title("Show", None).await.unwrap();
        assert_eq!(seasons.len(), 4);
    }

    #[tokio::test]
    async fn nothing_found_is_empty_not_error() {
        let seasons = matcher(Vec::new(), 50)
            .match_by_title("Nobody Knows", None)
            .await
            .unwrap();
        assert!(seasons.is_empty());
    }
}

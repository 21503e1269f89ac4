//! Bounded breadth-first walk over explicit catalog relations.

use crate::config::GroupingConfig;
use crate::domain::repository::CatalogRepository;
use crate::domain::{AnimeId, MAX_CONFIDENCE, PatternType, RelationType, SeasonSource};
use crate::models::anime::CatalogAnime;
use crate::models::season::{SeasonDescriptor, SeasonInfo};
use crate::parser;
use crate::services::grouping_service::GroupingError;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::debug;

struct Reached {
    anime: CatalogAnime,
    relation: Option<RelationType>,
    /// Every edge on the path from the anchor was sequel/prequel.
    on_main_line: bool,
}

pub struct RelationshipGraphBuilder {
    catalog: Arc<dyn CatalogRepository>,
    max_depth: usize,
    traversed: HashSet<RelationType>,
}

impl RelationshipGraphBuilder {
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogRepository>, config: &GroupingConfig) -> Self {
        Self {
            catalog,
            max_depth: config.max_graph_depth,
            traversed: config.traversed_relations.iter().copied().collect(),
        }
    }

    /// Loads the anchor and walks its relations.
    ///
    /// # Errors
    ///
    /// - Returns [`GroupingError::NotFound`] if the anchor does not exist
    pub async fn build_graph(&self, anchor: AnimeId) -> Result<Vec<SeasonInfo>, GroupingError> {
        let anchor = self
            .catalog
            .find_anime(anchor)
            .await?
            .ok_or(GroupingError::NotFound(anchor))?;
        self.build_from(&anchor).await
    }

    /// Every entry reachable from `anchor` within the depth cap, anchor first,
    /// each exactly once. Empty when the anchor has no usable relations.
    ///
    /// Members carry the prior for `relationship_type`; the caller swaps in the
    /// learned value per relation.
    pub async fn build_from(
        &self,
        anchor: &CatalogAnime,
    ) -> Result<Vec<SeasonInfo>, GroupingError> {
        let mut visited: HashSet<AnimeId> = HashSet::from([anchor.id]);
        let mut queue: VecDeque<(AnimeId, usize, bool)> = VecDeque::from([(anchor.id, 0, true)]);
        let mut reached = vec![Reached {
            anime: anchor.clone(),
            relation: None,
            on_main_line: true,
        }];

        while let Some((id, depth, on_main_line)) = queue.pop_front() {
            if depth >= self.max_depth {
                continue;
            }

            let edges = self.catalog.find_relations(id).await?;
            let mut next: Vec<(AnimeId, RelationType)> = Vec::new();
            for edge in edges {
                if !self.traversed.contains(&edge.relation) {
                    continue;
                }
                if visited.insert(edge.related_anime_id) {
                    next.push((edge.related_anime_id, edge.relation));
                }
            }

            if next.is_empty() {
                continue;
            }

            let ids: Vec<AnimeId> = next.iter().map(|(id, _)| *id).collect();
            let mut found: HashMap<AnimeId, CatalogAnime> = self
                .catalog
                .find_anime_many(&ids)
                .await?
                .into_iter()
                .map(|a| (a.id, a))
                .collect();

            for (related, relation) in next {
                let Some(anime) = found.remove(&related) else {
                    debug!(from = %id, to = %related, "Relation points outside the catalog");
                    continue;
                };
                let main_line = on_main_line && relation.is_chronological();
                queue.push_back((related, depth + 1, main_line));
                reached.push(Reached {
                    anime,
                    relation: Some(relation),
                    on_main_line: main_line,
                });
            }
        }

        if reached.len() == 1 {
            debug!(anchor = %anchor.id, "No relations to follow");
            return Ok(Vec::new());
        }

        debug!(anchor = %anchor.id, members = reached.len(), "Relationship graph built");
        Ok(Self::decorate(reached))
    }

    fn decorate(reached: Vec<Reached>) -> Vec<SeasonInfo> {
        let mut descriptors: Vec<SeasonDescriptor> = reached
            .iter()
            .map(|r| parser::parse(&r.anime.title, r.anime.title_english.as_deref()))
            .collect();

        infer_first_seasons(&reached, &mut descriptors);

        reached
            .into_iter()
            .zip(descriptors)
            .map(|(member, descriptor)| {
                let confidence = if member.relation.is_some() {
                    PatternType::RelationshipType.initial_confidence()
                } else {
                    MAX_CONFIDENCE
                };
                let mut info = SeasonInfo::from_catalog(
                    &member.anime,
                    &descriptor,
                    SeasonSource::Graph,
                    confidence,
                );
                info.relation = member.relation;
                info
            })
            .collect()
    }
}

/// An unmarked main-line member that shares its series name with a numbered
/// sequel ("Series X" next to "Series X Season 2") is the first season.
fn infer_first_seasons(reached: &[Reached], descriptors: &mut [SeasonDescriptor]) {
    let sequel_keys: HashSet<String> = descriptors
        .iter()
        .filter(|d| d.season_number.is_some_and(|n| n >= 2))
        .map(SeasonDescriptor::key)
        .collect();

    if sequel_keys.is_empty() {
        return;
    }

    for (member, descriptor) in reached.iter().zip(descriptors.iter_mut()) {
        if member.on_main_line
            && descriptor.season_number.is_none()
            && sequel_keys.contains(&descriptor.key())
        {
            descriptor.season_number = Some(1);
        }
    }
}

//! Repository-backed implementation of the [`GroupingService`] trait.
//!
//! Graph traversal and title matching for one anchor run concurrently; the
//! merger waits on both. No confidence is written on this path.

use crate::config::GroupingConfig;
use crate::domain::repository::CatalogRepository;
use crate::domain::{AnimeId, MAX_CONFIDENCE, PatternKey, PatternType, RelationType, SeasonSource};
use crate::models::season::{SeasonInfo, SeriesGroup};
use crate::parser;
use crate::services::confidence::PatternConfidenceStore;
use crate::services::fallback::FallbackMatcher;
use crate::services::graph::RelationshipGraphBuilder;
use crate::services::grouping_service::{GroupingError, GroupingService};
use crate::services::merger::SeasonMerger;
use futures::StreamExt;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

pub struct SeriesGroupingService {
    catalog: Arc<dyn CatalogRepository>,
    confidence: Arc<PatternConfidenceStore>,
    graph: RelationshipGraphBuilder,
    fallback: FallbackMatcher,
    merger: SeasonMerger,
    fallback_trigger: usize,
}

impl SeriesGroupingService {
    #[must_use]
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        confidence: Arc<PatternConfidenceStore>,
        config: &GroupingConfig,
    ) -> Self {
        Self {
            graph: RelationshipGraphBuilder::new(Arc::clone(&catalog), config),
            fallback: FallbackMatcher::new(
                Arc::clone(&catalog),
                Arc::clone(&confidence),
                config.fallback_candidate_limit,
            ),
            merger: SeasonMerger::from_config(config),
            fallback_trigger: config.fallback_trigger_max_graph_size,
            catalog,
            confidence,
        }
    }

    async fn compute(&self, anchor: AnimeId) -> Result<SeriesGroup, GroupingError> {
        let anchor_row = self
            .catalog
            .find_anime(anchor)
            .await?
            .ok_or(GroupingError::NotFound(anchor))?;
        let english = anchor_row.title_english.as_deref();

        let (graph, title) = tokio::join!(
            self.graph.build_from(&anchor_row),
            self.fallback.match_by_title(&anchor_row.title, english)
        );

        let descriptor = parser::parse(&anchor_row.title, english);
        let mut graph = graph?;
        if graph.is_empty() {
            graph.push(SeasonInfo::from_catalog(
                &anchor_row,
                &descriptor,
                SeasonSource::Graph,
                MAX_CONFIDENCE,
            ));
        }

        let title = if graph.len() <= self.fallback_trigger {
            title?
        } else {
            if let Err(e) = title {
                debug!(anchor = %anchor, error = %e, "Ignoring unused fallback failure");
            }
            Vec::new()
        };

        self.apply_relation_confidence(&mut graph).await?;

        let mut merged = self.merger.merge(graph, title);
        SeasonMerger::infer_first_seasons(&mut merged);
        let (seasons, conflicts) = self.merger.validate(merged);

        Ok(SeriesGroup {
            series_name: descriptor.series_name,
            seasons,
            conflicts,
        })
    }

    /// One lookup per relation kind present in the graph.
    async fn apply_relation_confidence(
        &self,
        graph: &mut [SeasonInfo],
    ) -> Result<(), GroupingError> {
        let relations: BTreeSet<RelationType> = graph.iter().filter_map(|s| s.relation).collect();

        for relation in relations {
            let key = PatternKey::new(PatternType::RelationshipType, relation.as_str());
            let confidence = self.confidence.get_confidence(&key).await?;
            for season in graph.iter_mut().filter(|s| s.relation == Some(relation)) {
                season.confidence = confidence;
            }
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl GroupingService for SeriesGroupingService {
    async fn group_series(&self, anchor: AnimeId) -> Result<SeriesGroup, GroupingError> {
        let start = Instant::now();
        metrics::counter!("grouping_requests_total").increment(1);

        let result = self.compute(anchor).await;

        metrics::histogram!("grouping_duration_seconds").record(start.elapsed().as_secs_f64());
        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        match &result {
            Ok(group) => info!(
                event = "series_grouped",
                anchor = %anchor,
                series = %group.series_name,
                seasons = group.len(),
                conflicts = group.conflicts.len(),
                duration_ms,
                "Series grouped"
            ),
            Err(e) => warn!(
                event = "grouping_failed",
                anchor = %anchor,
                error = %e,
                duration_ms,
                "Series grouping failed"
            ),
        }

        result
    }

    async fn group_many(
        &self,
        anchors: &[AnimeId],
        concurrency: usize,
    ) -> Vec<(AnimeId, Result<SeriesGroup, GroupingError>)> {
        let mut results: Vec<(usize, AnimeId, Result<SeriesGroup, GroupingError>)> =
            futures::stream::iter(anchors.iter().copied().enumerate())
                .map(|(idx, anchor)| async move { (idx, anchor, self.group_series(anchor).await) })
                .buffer_unordered(concurrency.max(1))
                .collect()
                .await;

        results.sort_by_key(|(idx, _, _)| *idx);
        results
            .into_iter()
            .map(|(_, anchor, result)| (anchor, result))
            .collect()
    }
}

//! Combines graph and title candidates into one ordered, conflict-free list.

use crate::config::GroupingConfig;
use crate::domain::{AnimeId, SeasonSource, TieBreak};
use crate::models::season::{SeasonConflict, SeasonInfo};
use crate::parser;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::warn;

pub struct SeasonMerger {
    min_title_confidence: f64,
    tie_break: Vec<TieBreak>,
}

impl SeasonMerger {
    #[must_use]
    pub fn new(min_title_confidence: f64, tie_break: Vec<TieBreak>) -> Self {
        Self {
            min_title_confidence,
            tie_break,
        }
    }

    #[must_use]
    pub fn from_config(config: &GroupingConfig) -> Self {
        Self::new(config.min_title_confidence, config.tie_break.clone())
    }

    /// Keyed by anime id. A graph record wins over a title record for the same
    /// id but takes the higher confidence of the two; title-only records below
    /// the floor are dropped. Output is ordered by id.
    #[must_use]
    pub fn merge(&self, graph: Vec<SeasonInfo>, title: Vec<SeasonInfo>) -> Vec<SeasonInfo> {
        let mut merged: BTreeMap<AnimeId, SeasonInfo> = BTreeMap::new();

        for season in graph {
            match merged.get_mut(&season.anime_id) {
                Some(existing) => existing.confidence = existing.confidence.max(season.confidence),
                None => {
                    merged.insert(season.anime_id, season);
                }
            }
        }

        for season in title {
            if let Some(existing) = merged.get_mut(&season.anime_id) {
                existing.confidence = existing.confidence.max(season.confidence);
            } else if season.confidence > self.min_title_confidence {
                merged.insert(season.anime_id, season);
            }
        }

        merged.into_values().collect()
    }

    /// Gives season 1 to an unmarked entry sharing its series name with a
    /// numbered season 2 or later.
    ///
    /// Applies to title matches and to the anchor. Other graph members were
    /// already judged by the graph builder, which only numbers main-line entries.
    pub fn infer_first_seasons(seasons: &mut [SeasonInfo]) {
        let keys: Vec<String> = seasons
            .iter()
            .map(|s| parser::parse(&s.title, s.title_english.as_deref()).key())
            .collect();

        let sequel_keys: HashSet<&str> = seasons
            .iter()
            .zip(&keys)
            .filter(|(s, _)| s.season_number.is_some_and(|n| n >= 2))
            .map(|(_, key)| key.as_str())
            .collect();

        if sequel_keys.is_empty() {
            return;
        }

        for (season, key) in seasons.iter_mut().zip(&keys) {
            let eligible = season.source == SeasonSource::Title || season.relation.is_none();
            if eligible && season.season_number.is_none() && sequel_keys.contains(key.as_str()) {
                season.season_number = Some(1);
            }
        }
    }

    /// Resolves duplicate season numbers, then sorts: numbered entries by
    /// number, the rest by start date, undated ones by title.
    ///
    /// Idempotent: a validated list passes through unchanged.
    #[must_use]
    pub fn validate(&self, merged: Vec<SeasonInfo>) -> (Vec<SeasonInfo>, Vec<SeasonConflict>) {
        let mut seasons = merged;
        let conflicts = self.resolve_conflicts(&mut seasons);
        seasons.sort_by(display_order);
        (seasons, conflicts)
    }

    fn resolve_conflicts(&self, seasons: &mut [SeasonInfo]) -> Vec<SeasonConflict> {
        let mut claims: HashMap<i32, Vec<usize>> = HashMap::new();
        for (idx, season) in seasons.iter().enumerate() {
            if let Some(number) = season.season_number {
                claims.entry(number).or_default().push(idx);
            }
        }

        let mut contested: Vec<(i32, Vec<usize>)> =
            claims.into_iter().filter(|(_, c)| c.len() > 1).collect();
        contested.sort_unstable_by_key(|(number, _)| *number);

        let mut conflicts = Vec::new();
        for (number, claimants) in contested {
            let Some(&winner) = claimants
                .iter()
                .min_by(|&&a, &&b| self.prefer(&seasons[a], &seasons[b]))
            else {
                continue;
            };

            let mut losers: Vec<usize> = claimants.into_iter().filter(|&i| i != winner).collect();
            losers.sort_unstable_by_key(|&i| seasons[i].anime_id);

            for loser in losers {
                warn!(
                    event = "season_conflict",
                    season_number = number,
                    kept = %seasons[winner].anime_id,
                    demoted = %seasons[loser].anime_id,
                    "Two entries claim the same season; demoting to unknown season"
                );
                metrics::counter!("grouping_conflicts_total").increment(1);
                seasons[loser].season_number = None;
                conflicts.push(SeasonConflict {
                    season_number: number,
                    kept: seasons[winner].anime_id,
                    demoted: seasons[loser].anime_id,
                });
            }
        }

        conflicts
    }

    /// `Less` means `a` keeps the season number.
    fn prefer(&self, a: &SeasonInfo, b: &SeasonInfo) -> Ordering {
        self.tie_break
            .iter()
            .map(|rule| match rule {
                TieBreak::GraphSource => source_rank(a.source).cmp(&source_rank(b.source)),
                TieBreak::HigherConfidence => b.confidence.total_cmp(&a.confidence),
                TieBreak::EarlierStartDate => dates_first(a, b),
            })
            .find(|o| o.is_ne())
            .unwrap_or_else(|| a.anime_id.cmp(&b.anime_id))
    }
}

const fn source_rank(source: SeasonSource) -> u8 {
    match source {
        SeasonSource::Graph => 0,
        SeasonSource::Title => 1,
    }
}

/// Earlier dates first, missing dates last.
fn dates_first(a: &SeasonInfo, b: &SeasonInfo) -> Ordering {
    match (a.start_date, b.start_date) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn display_order(a: &SeasonInfo, b: &SeasonInfo) -> Ordering {
    let by_number = match (a.season_number, b.season_number) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };

    by_number
        .then_with(|| dates_first(a, b))
        .then_with(|| a.title.cmp(&b.title))
        .then_with(|| a.anime_id.cmp(&b.anime_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn season(id: i32, number: Option<i32>, source: SeasonSource, confidence: f64) -> SeasonInfo {
        SeasonInfo {
            anime_id: AnimeId::new(id),
            slug: format!("anime-{id}"),
            title: format!("Title {id}"),
            title_english: None,
            year: None,
            anime_type: None,
            episode_count: None,
            cover_image: None,
            average_rating: None,
            status: None,
            start_date: None,
            season_number: number,
            season_name: None,
            source,
            confidence,
            relation: None,
        }
    }

    fn dated(mut s: SeasonInfo, y: i32, m: u32, d: u32) -> SeasonInfo {
        s.start_date = NaiveDate::from_ymd_opt(y, m, d);
        s
    }

    fn merger() -> SeasonMerger {
        SeasonMerger::from_config(&GroupingConfig::default())
    }

    fn ids(seasons: &[SeasonInfo]) -> Vec<i32> {
        seasons.iter().map(|s| s.anime_id.value()).collect()
    }

    #[test]
    fn graph_wins_but_inherits_higher_confidence() {
        let graph = vec![season(1, Some(1), SeasonSource::Graph, 0.6)];
        let title = vec![season(1, Some(1), SeasonSource::Title, 0.8)];

        let merged = merger().merge(graph, title);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].source, SeasonSource::Graph);
        assert!((merged[0].confidence - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn low_confidence_title_matches_are_rejected() {
        let title = vec![
            season(2, Some(2), SeasonSource::Title, 0.4),
            season(3, Some(3), SeasonSource::Title, 0.41),
        ];
        let merged = merger().merge(Vec::new(), title);
        assert_eq!(ids(&merged), vec![3]);
    }

    #[test]
    fn merge_is_symmetric_for_disjoint_entries() {
        let a = vec![season(4, Some(2), SeasonSource::Graph, 0.9)];
        let b = vec![season(2, Some(1), SeasonSource::Title, 0.7)];

        let m = merger();
        let (one, _) = m.validate(m.merge(a.clone(), b.clone()));
        let (two, _) = m.validate(m.merge(b, a));
        assert_eq!(ids(&one), ids(&two));
        assert_eq!(ids(&one), vec![2, 4]);
    }

    #[test]
    fn validate_orders_numbers_then_dates_then_titles() {
        let input = vec![
            season(5, None, SeasonSource::Graph, 0.9),
            dated(season(4, None, SeasonSource::Graph, 0.9), 2015, 1, 1),
            season(3, Some(2), SeasonSource::Graph, 0.9),
            dated(season(2, None, SeasonSource::Graph, 0.9), 2010, 1, 1),
            season(1, Some(1), SeasonSource::Graph, 0.9),
        ];

        let (out, conflicts) = merger().validate(input);
        assert!(conflicts.is_empty());
        assert_eq!(ids(&out), vec![1, 3, 2, 4, 5]);
    }

    #[test]
    fn duplicate_season_prefers_graph_then_demotes_loser() {
        let input = vec![
            season(7, Some(2), SeasonSource::Title, 0.95),
            season(8, Some(2), SeasonSource::Graph, 0.5),
        ];

        let (out, conflicts) = merger().validate(input);
        assert_eq!(ids(&out), vec![8, 7]);
        assert_eq!(out[1].season_number, None);
        assert_eq!(
            conflicts,
            vec![SeasonConflict {
                season_number: 2,
                kept: AnimeId::new(8),
                demoted: AnimeId::new(7),
            }]
        );
    }

    #[test]
    fn duplicate_season_falls_through_confidence_then_date() {
        let higher = vec![
            season(1, Some(3), SeasonSource::Graph, 0.6),
            season(2, Some(3), SeasonSource::Graph, 0.9),
        ];
        let (out, _) = merger().validate(higher);
        assert_eq!(out[0].anime_id.value(), 2);

        let earlier = vec![
            dated(season(1, Some(3), SeasonSource::Graph, 0.9), 2020, 1, 1),
            dated(season(2, Some(3), SeasonSource::Graph, 0.9), 2019, 1, 1),
        ];
        let (out, _) = merger().validate(earlier);
        assert_eq!(out[0].anime_id.value(), 2);
        assert_eq!(out[1].season_number, None);
    }

    fn titled(mut s: SeasonInfo, title: &str) -> SeasonInfo {
        s.title = title.to_string();
        s
    }

    #[test]
    fn unmarked_title_match_becomes_first_season() {
        let m = merger();
        let mut merged = m.merge(
            vec![titled(season(11, Some(2), SeasonSource::Graph, 0.95), "Series Y Season 2")],
            vec![
                dated(titled(season(10, None, SeasonSource::Title, 0.7), "Series Y"), 2015, 1, 1),
                titled(season(12, None, SeasonSource::Title, 0.7), "Another Show"),
            ],
        );
        SeasonMerger::infer_first_seasons(&mut merged);
        let (out, conflicts) = m.validate(merged);

        assert!(conflicts.is_empty());
        assert_eq!(ids(&out), vec![10, 11, 12]);
        assert_eq!(out[0].season_number, Some(1));
        assert_eq!(out[2].season_number, None);
    }

    #[test]
    fn off_main_line_graph_member_keeps_unknown_season() {
        let mut side = titled(season(3, None, SeasonSource::Graph, 0.9), "Series Y");
        side.relation = Some(crate::domain::RelationType::SideStory);
        let mut merged = vec![
            titled(season(2, Some(2), SeasonSource::Graph, 0.95), "Series Y Season 2"),
            side,
        ];

        SeasonMerger::infer_first_seasons(&mut merged);
        assert_eq!(merged[1].season_number, None);
    }

    #[test]
    fn lone_anchor_is_first_season_next_to_numbered_matches() {
        let mut merged = vec![
            titled(season(10, None, SeasonSource::Graph, 0.95), "Series Y"),
            titled(season(11, Some(2), SeasonSource::Title, 0.7), "Series Y Season 2"),
        ];

        SeasonMerger::infer_first_seasons(&mut merged);
        assert_eq!(merged[0].season_number, Some(1));
    }

    #[test]
    fn tie_break_chain_is_configurable() {
        let m = SeasonMerger::new(0.4, vec![TieBreak::HigherConfidence]);
        let input = vec![
            season(1, Some(2), SeasonSource::Graph, 0.5),
            season(2, Some(2), SeasonSource::Title, 0.9),
        ];
        let (out, _) = m.validate(input);
        assert_eq!(out[0].anime_id.value(), 2);
    }

    #[test]
    fn validate_is_monotonic_and_idempotent() {
        let input = vec![
            season(1, Some(3), SeasonSource::Title, 0.7),
            season(2, Some(1), SeasonSource::Graph, 0.9),
            season(3, Some(3), SeasonSource::Graph, 0.9),
            season(4, None, SeasonSource::Graph, 0.9),
            season(5, Some(2), SeasonSource::Title, 0.7),
            season(6, Some(1), SeasonSource::Title, 0.8),
        ];

        let m = merger();
        let (once, _) = m.validate(input);
        let numbers: Vec<i32> = once.iter().filter_map(|s| s.season_number).collect();
        assert!(numbers.windows(2).all(|w| w[0] <= w[1]));

        let (twice, conflicts) = m.validate(once.clone());
        assert_eq!(once, twice);
        assert!(conflicts.is_empty());
    }
}

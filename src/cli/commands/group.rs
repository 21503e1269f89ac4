//! Group command handler

use crate::config::Config;
use crate::domain::AnimeId;
use crate::models::season::SeriesGroup;
use crate::state::SharedState;

pub async fn cmd_group(
    config: &Config,
    ids: &[i32],
    json: bool,
    concurrency: usize,
) -> anyhow::Result<()> {
    let state = SharedState::new(config.clone()).await?;
    let anchors: Vec<AnimeId> = ids.iter().copied().map(AnimeId::new).collect();

    let results = state.grouping.group_many(&anchors, concurrency).await;

    if json {
        let groups: Vec<&SeriesGroup> = results
            .iter()
            .filter_map(|(_, result)| result.as_ref().ok())
            .collect();
        println!("{}", serde_json::to_string_pretty(&groups)?);
        for (anchor, result) in &results {
            if let Err(e) = result {
                eprintln!("Anime {anchor}: {e}");
            }
        }
        return Ok(());
    }

    for (anchor, result) in results {
        match result {
            Ok(group) => print_group(anchor, &group),
            Err(e) => {
                println!("Anime {anchor}: {e}");
                println!();
            }
        }
    }

    Ok(())
}

fn print_group(anchor: AnimeId, group: &SeriesGroup) {
    println!(
        "{} (anchor {}, {} entries)",
        group.series_name,
        anchor,
        group.len()
    );
    println!("{:-<70}", "");

    for season in &group.seasons {
        let number = season
            .season_number
            .map_or_else(|| "?".to_string(), |n| n.to_string());
        let marker = if season.anime_id == anchor { "*" } else { "•" };
        println!(
            "{} S{:<3} {} [ID: {}]",
            marker, number, season.title, season.anime_id
        );

        let date = season
            .start_date
            .map_or_else(|| "unknown".to_string(), |d| d.to_string());
        let via = season
            .relation
            .map_or_else(|| "-".to_string(), |r| r.to_string());
        println!(
            "  Source: {:?} | Via: {} | Confidence: {:.2} | Start: {}",
            season.source, via, season.confidence, date
        );
    }

    for conflict in &group.conflicts {
        println!(
            "! Season {} claimed twice: kept {}, demoted {}",
            conflict.season_number, conflict.kept, conflict.demoted
        );
    }

    let patterns = group.contributing_patterns();
    if !patterns.is_empty() {
        let list: Vec<String> = patterns.iter().map(ToString::to_string).collect();
        println!("Patterns: {}", list.join(", "));
    }

    println!();
}

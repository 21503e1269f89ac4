//! Stats command handler

use crate::config::Config;
use crate::domain::repository::FeedbackRepository;
use crate::state::SharedState;

const RECENT_FEEDBACK_LIMIT: u64 = 10;

pub async fn cmd_stats(config: &Config, days: i64) -> anyhow::Result<()> {
    let state = SharedState::new(config.clone()).await?;
    let summary = state.feedback.summary(days).await?;
    let catalog_size = state.store.anime_count().await?;

    println!("Feedback over the last {days} days");
    println!("{:-<70}", "");
    println!("Merges:   {}", summary.merges);
    println!("Splits:   {}", summary.splits);
    println!("Confirms: {}", summary.confirms);
    println!("Total:    {}", summary.total());
    println!("Catalog:  {catalog_size} anime");

    let recent = state
        .store
        .list_feedback(None, RECENT_FEEDBACK_LIMIT)
        .await?;
    if recent.is_empty() {
        return Ok(());
    }

    println!();
    println!("Recent feedback:");
    println!("{:-<70}", "");
    for entry in recent {
        println!(
            "• #{} {} anime {} ({}) {}",
            entry.id,
            entry.action,
            entry.anime_id,
            entry.confidence,
            entry.created_at.format("%Y-%m-%d %H:%M")
        );
        if entry.source_group_id.is_some() || entry.target_group_id.is_some() {
            println!(
                "  From: {} | To: {}",
                entry.source_group_id.as_deref().unwrap_or("-"),
                entry.target_group_id.as_deref().unwrap_or("-")
            );
        }
    }

    Ok(())
}

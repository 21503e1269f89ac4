//! Feedback command handler

use crate::config::Config;
use crate::domain::PatternKey;
use crate::models::feedback::NewFeedback;
use crate::state::SharedState;

pub async fn cmd_feedback(
    config: &Config,
    feedback: NewFeedback,
    mut patterns: Vec<PatternKey>,
    from_group: bool,
) -> anyhow::Result<()> {
    let state = SharedState::new(config.clone()).await?;

    if from_group {
        let group = state.grouping.group_series(feedback.anime_id).await?;
        patterns.extend(group.contributing_patterns());
    }

    if patterns.is_empty() {
        println!("No patterns given; the correction is recorded without adjusting confidence.");
        println!("Attribute it with --pattern <type>:<value> or --from-group");
    }

    let receipt = state
        .feedback
        .learn_from_feedback(&feedback, &patterns)
        .await?;

    println!(
        "✓ Recorded {} for anime {} (feedback #{}, {} confidence)",
        receipt.feedback.action,
        receipt.feedback.anime_id,
        receipt.feedback.id,
        receipt.feedback.confidence
    );

    if receipt.updates.is_empty() {
        return Ok(());
    }

    println!("{:-<70}", "");
    for (key, confidence) in &receipt.updates {
        match confidence {
            Some(value) => println!("• {key} -> {value:.3}"),
            None => println!("• {key} -> not updated (see log)"),
        }
    }

    Ok(())
}

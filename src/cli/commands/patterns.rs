//! Patterns command handler

use crate::config::Config;
use crate::db::Store;
use crate::domain::PatternType;
use crate::domain::repository::PatternRepository;

pub async fn cmd_patterns(
    config: &Config,
    pattern_type: Option<PatternType>,
) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;
    let patterns = store
        .list_patterns(pattern_type.map(PatternType::as_str))
        .await?;

    if patterns.is_empty() {
        println!("No patterns learned yet.");
        println!();
        println!(
            "Patterns are created by: seasonarr feedback <anime_id> <action> --pattern <type>:<value>"
        );
        return Ok(());
    }

    println!("Learned Patterns ({} total)", patterns.len());
    println!("{:-<70}", "");

    for pattern in patterns {
        println!("• {}:{}", pattern.pattern_type, pattern.pattern);
        println!(
            "  Confidence: {:.3} | Uses: {} (success {}, failure {}) | Last used: {}",
            pattern.confidence,
            pattern.total_outcomes(),
            pattern.success_count,
            pattern.failure_count,
            pattern.last_used.format("%Y-%m-%d %H:%M")
        );
    }

    Ok(())
}

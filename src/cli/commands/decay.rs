//! Decay command handler

use crate::config::Config;
use crate::state::SharedState;

pub async fn cmd_decay(config: &Config, days: Option<i64>) -> anyhow::Result<()> {
    let mut config = config.clone();
    if let Some(days) = days {
        if days < 0 {
            anyhow::bail!("--days must be >= 0");
        }
        config.learning.decay_threshold_days = days;
    }

    let state = SharedState::new(config).await?;
    let scheduler = state.scheduler();

    let Some(report) = scheduler.run_once().await? else {
        println!("Another instance is decaying patterns right now; nothing done.");
        return Ok(());
    };

    println!(
        "Pattern decay (unused for more than {} days)",
        state.config.learning.decay_threshold_days
    );
    println!("{:-<70}", "");
    println!("Examined:        {}", report.examined);
    println!("Decayed:         {}", report.decayed);
    println!("Skipped (recent): {}", report.skipped_recent);
    if report.raced > 0 {
        println!("Used meanwhile:  {}", report.raced);
    }
    if report.failed > 0 {
        println!("Failed:          {}", report.failed);
    }

    Ok(())
}

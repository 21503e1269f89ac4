pub mod cli;
pub mod config;
pub mod db;
pub mod domain;
pub mod entities;
pub mod models;
pub mod parser;
pub mod services;
pub mod state;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};
pub use config::Config;
pub use state::SharedState;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::models::feedback::NewFeedback;

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load()?;
    config.validate()?;

    let daemon = matches!(cli.command, Some(Commands::Daemon));
    init_metrics(&config, daemon)?;
    init_tracing(&config)?;

    let Some(command) = cli.command else {
        println!("Seasonarr - Adaptive anime series grouping");
        println!("Run `seasonarr --help` for the list of commands.");
        return Ok(());
    };

    match command {
        Commands::Daemon => run_daemon(config).await,

        Commands::Group {
            ids,
            json,
            concurrency,
        } => cli::cmd_group(&config, &ids, json, concurrency).await,

        Commands::Parse { title, english } => {
            cli::cmd_parse(&title, english.as_deref());
            Ok(())
        }

        Commands::Feedback {
            anime_id,
            action,
            patterns,
            from_group,
            confidence,
            source_group,
            target_group,
        } => {
            let mut feedback = NewFeedback::new(anime_id.into(), action);
            feedback.confidence = confidence;
            feedback.source_group_id = source_group;
            feedback.target_group_id = target_group;
            cli::cmd_feedback(&config, feedback, patterns, from_group).await
        }

        Commands::Patterns { pattern_type } => cli::cmd_patterns(&config, pattern_type).await,

        Commands::Decay { days } => cli::cmd_decay(&config, days).await,

        Commands::Stats { days } => cli::cmd_stats(&config, days).await,

        Commands::Import { path } => cli::cmd_import(&config, &path).await,

        Commands::Init => {
            if Config::create_default_if_missing()? {
                println!("✓ Config file created. Edit config.toml and run again.");
            } else {
                println!("config.toml already exists, left untouched.");
            }
            Ok(())
        }
    }
}

/// The scrape listener is only bound for the daemon; one-shot commands just
/// install the recorder.
fn init_metrics(config: &Config, daemon: bool) -> anyhow::Result<()> {
    if !config.observability.metrics_enabled {
        return Ok(());
    }

    use metrics_exporter_prometheus::PrometheusBuilder;
    let builder = PrometheusBuilder::new();

    match config.observability.metrics_port {
        Some(port) if daemon => {
            builder
                .with_http_listener(([0, 0, 0, 0], port))
                .install()
                .context("Failed to start Prometheus exporter")?;
        }
        _ => {
            builder
                .install_recorder()
                .context("Failed to install Prometheus recorder")?;
        }
    }

    Ok(())
}

fn init_tracing(config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let fmt_layer = tracing_subscriber::fmt::layer();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer);

    if config.observability.loki_enabled {
        let url = url::Url::parse(&config.observability.loki_url).context("Invalid Loki URL")?;

        let mut builder = tracing_loki::builder();
        for (key, value) in &config.observability.loki_labels {
            builder = builder.label(key.as_str(), value.as_str())?;
        }
        let (layer, task) = builder
            .extra_field("version", env!("CARGO_PKG_VERSION"))?
            .build_url(url)?;

        tokio::spawn(task);

        registry.with(layer).init();
        info!(
            "Loki logging initialized at {}",
            config.observability.loki_url
        );
    } else {
        registry.init();
    }

    Ok(())
}

async fn run_daemon(config: Config) -> anyhow::Result<()> {
    info!(
        "Seasonarr v{} starting in daemon mode...",
        env!("CARGO_PKG_VERSION")
    );

    let state = SharedState::new(config).await?;
    state.store.ping().await?;
    let catalog_size = state.store.anime_count().await?;
    info!(anime = catalog_size, "Catalog loaded");

    if let Some(port) = state.config.observability.metrics_port {
        info!("Prometheus metrics exposed on port {}", port);
    }

    let scheduler = std::sync::Arc::new(state.scheduler());

    let scheduler_handle = {
        let sched = std::sync::Arc::clone(&scheduler);
        tokio::spawn(async move {
            if let Err(e) = sched.start().await {
                error!("Scheduler error: {}", e);
            }
        })
    };

    info!("Daemon running. Press Ctrl+C to stop.");

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received");
        }
        Err(e) => {
            error!("Error listening for shutdown: {}", e);
        }
    }

    scheduler.stop().await;
    if let Err(e) = scheduler_handle.await {
        error!("Scheduler task ended abnormally: {}", e);
    }
    info!("Daemon stopped");

    Ok(())
}

use crate::domain::{FeedbackConfidence, MAX_CONFIDENCE, MIN_CONFIDENCE, RelationType, TieBreak};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub grouping: GroupingConfig,

    pub learning: LearningConfig,

    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    /// Prometheus scrape listener, only bound in daemon mode.
    pub metrics_port: Option<u16>,

    pub loki_enabled: bool,

    pub loki_url: String,

    pub loki_labels: std::collections::HashMap<String, String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        let mut labels = std::collections::HashMap::new();
        labels.insert("app".to_string(), "seasonarr".to_string());

        Self {
            metrics_enabled: true,
            metrics_port: None,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
            loki_labels: labels,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/seasonarr.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupingConfig {
    /// Hops followed from the anchor through explicit relations.
    pub max_graph_depth: usize,

    /// Upper bound on the broad substring search of the fallback matcher.
    pub fallback_candidate_limit: u64,

    /// The fallback matcher is consulted when the graph has at most this many members.
    pub fallback_trigger_max_graph_size: usize,

    /// Title-only members need strictly more confidence than this to be kept.
    pub min_title_confidence: f64,

    pub tie_break: Vec<TieBreak>,

    pub traversed_relations: Vec<RelationType>,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            max_graph_depth: 3,
            fallback_candidate_limit: 50,
            fallback_trigger_max_graph_size: 1,
            min_title_confidence: 0.4,
            tie_break: TieBreak::DEFAULT_CHAIN.to_vec(),
            traversed_relations: vec![
                RelationType::Sequel,
                RelationType::Prequel,
                RelationType::SideStory,
                RelationType::Alternative,
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    /// Patterns unused for longer than this start losing confidence.
    pub decay_threshold_days: i64,

    /// Days past the threshold at which the decay factor bottoms out at 0.5.
    pub decay_horizon_days: i64,

    /// A pattern decayed more recently than this is skipped by the next run.
    pub decay_min_interval_hours: i64,

    pub default_feedback_confidence: FeedbackConfidence,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            decay_threshold_days: 90,
            decay_horizon_days: 300,
            decay_min_interval_hours: 20,
            default_feedback_confidence: FeedbackConfidence::Medium,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,

    /// Overrides `decay_interval_hours` when set.
    pub decay_cron: Option<String>,

    pub decay_interval_hours: u32,

    pub lease_ttl_seconds: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            decay_cron: None,
            decay_interval_hours: 24,
            lease_ttl_seconds: 3600,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("seasonarr").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".seasonarr").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        let grouping = &self.grouping;

        if !(MIN_CONFIDENCE..=MAX_CONFIDENCE).contains(&grouping.min_title_confidence) {
            anyhow::bail!(
                "grouping.min_title_confidence must be within [{MIN_CONFIDENCE}, {MAX_CONFIDENCE}]"
            );
        }

        if grouping.max_graph_depth == 0 {
            anyhow::bail!("grouping.max_graph_depth must be > 0");
        }

        if grouping.fallback_candidate_limit == 0 {
            anyhow::bail!("grouping.fallback_candidate_limit must be > 0");
        }

        if grouping.tie_break.is_empty() {
            anyhow::bail!("grouping.tie_break needs at least one criterion");
        }

        if self.learning.decay_threshold_days < 0 || self.learning.decay_horizon_days <= 0 {
            anyhow::bail!("learning decay threshold must be >= 0 and horizon > 0");
        }

        if self.scheduler.enabled
            && self.scheduler.decay_interval_hours == 0
            && self.scheduler.decay_cron.is_none()
        {
            anyhow::bail!("Scheduler interval must be > 0 or cron expression must be set");
        }

        if self.general.min_db_connections > self.general.max_db_connections {
            anyhow::bail!("general.min_db_connections cannot exceed max_db_connections");
        }

        Ok(())
    }
}

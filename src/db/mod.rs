use crate::domain::repository::{
    CatalogRepository, FeedbackRepository, LeaseRepository, PatternRepository,
};
use crate::domain::{AnimeId, FeedbackConfidence};
use crate::models::anime::{CatalogAnime, RelationEdge};
use crate::models::feedback::{FeedbackSummary, GroupingFeedback, GroupingPattern, NewFeedback};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

/// Fixed-width UTC form used for every stored timestamp, so that text order
/// matches time order.
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|at| at.with_timezone(&Utc))
}

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url
                .trim_start_matches("sqlite://")
                .trim_start_matches("sqlite:");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn anime_repo(&self) -> repositories::anime::AnimeRepository {
        repositories::anime::AnimeRepository::new(self.conn.clone())
    }

    fn pattern_repo(&self) -> repositories::pattern::PatternRepository {
        repositories::pattern::PatternRepository::new(self.conn.clone())
    }

    fn feedback_repo(&self) -> repositories::feedback::FeedbackRepository {
        repositories::feedback::FeedbackRepository::new(self.conn.clone())
    }

    fn lease_repo(&self) -> repositories::lease::LeaseRepository {
        repositories::lease::LeaseRepository::new(self.conn.clone())
    }

    pub async fn upsert_anime(&self, anime: &CatalogAnime) -> Result<()> {
        self.anime_repo().upsert(anime).await
    }

    pub async fn add_relation(&self, edge: &RelationEdge) -> Result<bool> {
        self.anime_repo().add_relation(edge).await
    }

    pub async fn import_catalog(
        &self,
        entries: &[CatalogAnime],
        edges: &[RelationEdge],
    ) -> Result<(usize, usize)> {
        self.anime_repo().import(entries, edges).await
    }

    pub async fn anime_count(&self) -> Result<u64> {
        self.anime_repo().count().await
    }
}

#[async_trait]
impl CatalogRepository for Store {
    async fn find_anime(&self, id: AnimeId) -> Result<Option<CatalogAnime>> {
        self.anime_repo().get(id).await
    }

    async fn find_anime_many(&self, ids: &[AnimeId]) -> Result<Vec<CatalogAnime>> {
        self.anime_repo().get_many(ids).await
    }

    async fn find_relations(&self, id: AnimeId) -> Result<Vec<RelationEdge>> {
        self.anime_repo().relations(id).await
    }

    async fn search_titles(&self, term: &str, limit: u64) -> Result<Vec<CatalogAnime>> {
        self.anime_repo().search_titles(term, limit).await
    }
}

#[async_trait]
impl PatternRepository for Store {
    async fn find_pattern(
        &self,
        pattern_type: &str,
        pattern: &str,
    ) -> Result<Option<GroupingPattern>> {
        self.pattern_repo().get(pattern_type, pattern).await
    }

    async fn insert_pattern_if_absent(&self, row: &GroupingPattern) -> Result<bool> {
        self.pattern_repo().insert_if_absent(row).await
    }

    async fn compare_and_swap_pattern(
        &self,
        expected: &GroupingPattern,
        updated: &GroupingPattern,
    ) -> Result<bool> {
        self.pattern_repo().compare_and_swap(expected, updated).await
    }

    async fn list_patterns(&self, pattern_type: Option<&str>) -> Result<Vec<GroupingPattern>> {
        self.pattern_repo().list(pattern_type).await
    }

    async fn list_stale_patterns(
        &self,
        used_before: DateTime<Utc>,
        min_confidence: f64,
    ) -> Result<Vec<GroupingPattern>> {
        self.pattern_repo()
            .list_stale(used_before, min_confidence)
            .await
    }
}

#[async_trait]
impl FeedbackRepository for Store {
    async fn append_feedback(
        &self,
        feedback: &NewFeedback,
        confidence: FeedbackConfidence,
    ) -> Result<GroupingFeedback> {
        self.feedback_repo().append(feedback, confidence).await
    }

    async fn list_feedback(
        &self,
        anime_id: Option<AnimeId>,
        limit: u64,
    ) -> Result<Vec<GroupingFeedback>> {
        self.feedback_repo().list(anime_id, limit).await
    }

    async fn summarize_feedback(&self, since: DateTime<Utc>) -> Result<FeedbackSummary> {
        self.feedback_repo().summary_since(since).await
    }
}

#[async_trait]
impl LeaseRepository for Store {
    async fn try_acquire_lease(
        &self,
        job_name: &str,
        holder: &str,
        ttl_seconds: i64,
    ) -> Result<bool> {
        self.lease_repo()
            .try_acquire(job_name, holder, ttl_seconds)
            .await
    }

    async fn release_lease(&self, job_name: &str, holder: &str) -> Result<()> {
        self.lease_repo().release(job_name, holder).await
    }
}

use std::sync::Arc;

use crate::config::Config;
use crate::db::Store;
use crate::domain::repository::{
    CatalogRepository, FeedbackRepository, LeaseRepository, PatternRepository,
};
use crate::services::{
    FeedbackLoop, GroupingService, PatternConfidenceStore, Scheduler, SeriesGroupingService,
};

/// The wired engine: one store, one confidence cache, the services on top.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub confidence: Arc<PatternConfidenceStore>,

    pub grouping: Arc<dyn GroupingService>,

    pub feedback: Arc<FeedbackLoop>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        Ok(Self::from_store(config, store))
    }

    #[must_use]
    pub fn from_store(config: Config, store: Store) -> Self {
        let shared = Arc::new(store.clone());
        let catalog: Arc<dyn CatalogRepository> = shared.clone();
        let patterns: Arc<dyn PatternRepository> = shared.clone();
        let feedback_repo: Arc<dyn FeedbackRepository> = shared;

        let confidence = Arc::new(PatternConfidenceStore::new(Arc::clone(&patterns)));

        let grouping = Arc::new(SeriesGroupingService::new(
            catalog,
            Arc::clone(&confidence),
            &config.grouping,
        ));

        let feedback = Arc::new(FeedbackLoop::new(
            feedback_repo,
            patterns,
            Arc::clone(&confidence),
            config.learning.clone(),
        ));

        Self {
            config: Arc::new(config),
            store,
            confidence,
            grouping,
            feedback,
        }
    }

    /// A scheduler sharing this state's feedback loop, leasing through the store.
    #[must_use]
    pub fn scheduler(&self) -> Scheduler {
        let leases: Arc<dyn LeaseRepository> = Arc::new(self.store.clone());
        Scheduler::new(
            Arc::clone(&self.feedback),
            leases,
            self.config.scheduler.clone(),
            &self.config.learning,
        )
    }
}

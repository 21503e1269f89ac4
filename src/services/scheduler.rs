use anyhow::Result;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{Duration, interval};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

use crate::config::{LearningConfig, SchedulerConfig};
use crate::domain::repository::LeaseRepository;
use crate::services::feedback::{DecayReport, FeedbackLoop};

const DECAY_JOB: &str = "decay_patterns";

/// Everything one decay run needs, shared between the cron closure and the
/// interval loop.
struct DecayJob {
    feedback: Arc<FeedbackLoop>,
    leases: Arc<dyn LeaseRepository>,
    holder: String,
    lease_ttl_seconds: i64,
    threshold_days: i64,
}

impl DecayJob {
    /// Runs the decay pass if this instance holds the lease. `None` when
    /// another instance holds it.
    async fn run(&self) -> Result<Option<DecayReport>> {
        if !self
            .leases
            .try_acquire_lease(DECAY_JOB, &self.holder, self.lease_ttl_seconds)
            .await?
        {
            info!(
                event = "job_skipped",
                job_name = DECAY_JOB,
                "Another instance holds the decay lease"
            );
            return Ok(None);
        }

        let result = self.feedback.decay_old_patterns(self.threshold_days).await;

        if let Err(e) = self.leases.release_lease(DECAY_JOB, &self.holder).await {
            warn!(job_name = DECAY_JOB, error = %e, "Failed to release lease, it will expire");
        }

        Ok(Some(result?))
    }

    async fn run_logged(&self) {
        let start = std::time::Instant::now();
        info!(
            event = "job_started",
            job_name = DECAY_JOB,
            "Starting scheduled pattern decay"
        );

        if let Err(e) = self.run().await {
            error!(
                event = "job_failed",
                job_name = DECAY_JOB,
                error = %e,
                "Scheduled pattern decay failed"
            );
        }

        info!(
            event = "job_finished",
            job_name = DECAY_JOB,
            duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Scheduled pattern decay finished"
        );
    }
}

/// Single-instance background decay of stale patterns.
///
/// Each run first takes a row lease named after the job, so several processes
/// sharing one database decay at most once per window between them.
pub struct Scheduler {
    job: Arc<DecayJob>,
    config: SchedulerConfig,
    running: Arc<RwLock<bool>>,
}

impl Scheduler {
    pub fn new(
        feedback: Arc<FeedbackLoop>,
        leases: Arc<dyn LeaseRepository>,
        config: SchedulerConfig,
        learning: &LearningConfig,
    ) -> Self {
        let job = DecayJob {
            feedback,
            leases,
            holder: uuid::Uuid::new_v4().to_string(),
            lease_ttl_seconds: config.lease_ttl_seconds,
            threshold_days: learning.decay_threshold_days,
        };

        Self {
            job: Arc::new(job),
            config,
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// Blocks until [`Self::stop`] is called.
    pub async fn start(&self) -> Result<()> {
        if !self.config.enabled {
            info!("Scheduler is disabled in config");
            return Ok(());
        }

        *self.running.write().await = true;
        info!(holder = %self.job.holder, "Starting background scheduler");

        if let Some(cron_expr) = &self.config.decay_cron {
            self.run_with_cron(cron_expr).await
        } else {
            self.run_with_interval().await
        }
    }

    async fn run_with_cron(&self, cron_expr: &str) -> Result<()> {
        let mut sched = JobScheduler::new().await?;

        let job = Arc::clone(&self.job);
        let running = Arc::clone(&self.running);
        let decay_job = Job::new_async(cron_expr, move |_uuid, _lock| {
            let job = Arc::clone(&job);
            let running = Arc::clone(&running);
            Box::pin(async move {
                if !*running.read().await {
                    return;
                }
                job.run_logged().await;
            })
        })?;

        sched.add(decay_job).await?;
        sched.start().await?;

        info!("Scheduler running with cron: {}", cron_expr);

        loop {
            if !*self.running.read().await {
                break;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        sched.shutdown().await?;
        Ok(())
    }

    async fn run_with_interval(&self) -> Result<()> {
        let hours = self.config.decay_interval_hours.max(1);
        info!("Scheduler running: pattern decay every {}h", hours);

        let mut decay_interval = interval(Duration::from_secs(u64::from(hours) * 60 * 60));
        let mut stop_check = interval(Duration::from_secs(1));

        loop {
            tokio::select! {
                _ = decay_interval.tick() => {
                    if !*self.running.read().await {
                        break;
                    }
                    self.job.run_logged().await;
                }
                _ = stop_check.tick() => {
                    if !*self.running.read().await {
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    pub async fn stop(&self) {
        info!("Stopping scheduler...");
        *self.running.write().await = false;
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// One decay pass now, under the same lease as scheduled runs.
    pub async fn run_once(&self) -> Result<Option<DecayReport>> {
        info!("Running manual pattern decay...");
        self.job.run().await
    }
}

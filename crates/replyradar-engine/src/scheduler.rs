//! Per-account discovery job scheduling.
//!
//! One recurring job per enabled (account, discovery type) schedule, all
//! owned by a single [`Scheduler`] instance through an explicit registry —
//! no ambient state, so tests can run several schedulers side by side.
//! Jobs fail independently: a run's error is logged and recorded on its
//! account, and every other job keeps its timer.

use std::collections::HashMap;
use std::sync::Arc;

use replyradar_core::{DiscoveryType, ScheduleExpr, ScheduleParseError};
use replyradar_db::{AccountWithSchedules, DbError, OpportunityRow};
use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use uuid::Uuid;

use crate::discovery::{DiscoveryError, DiscoveryService};

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Scheduler(#[from] JobSchedulerError),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("invalid schedule expression: {0}")]
    InvalidSchedule(#[from] ScheduleParseError),
}

/// Registry key: one job per account and discovery type.
type JobKey = (i64, DiscoveryType);

pub struct Scheduler {
    inner: JobScheduler,
    pool: PgPool,
    discovery: Arc<DiscoveryService>,
    jobs: Mutex<HashMap<JobKey, Uuid>>,
}

impl Scheduler {
    /// Create a scheduler with an empty registry. Call [`initialize`] to
    /// register jobs and [`start`] to begin firing them.
    ///
    /// [`initialize`]: Scheduler::initialize
    /// [`start`]: Scheduler::start
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Scheduler`] if the underlying scheduler
    /// cannot be constructed.
    pub async fn new(pool: PgPool, discovery: Arc<DiscoveryService>) -> Result<Self, SchedulerError> {
        Ok(Self {
            inner: JobScheduler::new().await?,
            pool,
            discovery,
            jobs: Mutex::new(HashMap::new()),
        })
    }

    /// Read current account configuration and register one recurring job
    /// per runnable schedule. Returns the number of registered jobs.
    ///
    /// Paused accounts, accounts flagged `error`, and disabled schedules
    /// are filtered here, at registration — not checked again at run time.
    /// A schedule with an unparseable expression is logged and skipped so
    /// one bad row cannot block the rest.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError` if accounts cannot be read or a job cannot
    /// be added to the underlying scheduler.
    pub async fn initialize(&self) -> Result<usize, SchedulerError> {
        let mut jobs = self.jobs.lock().await;
        self.register_all(&mut jobs).await?;
        Ok(jobs.len())
    }

    /// Drop every registered job and re-register from current
    /// configuration. Returns the new job count.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError` if re-registration fails; removal errors
    /// for stale jobs are logged, not propagated.
    pub async fn reload(&self) -> Result<usize, SchedulerError> {
        let mut jobs = self.jobs.lock().await;
        for ((account_id, discovery_type), job_id) in jobs.drain() {
            if let Err(e) = self.inner.remove(&job_id).await {
                tracing::warn!(
                    account_id,
                    discovery_type = %discovery_type,
                    error = %e,
                    "scheduler: failed to remove job during reload"
                );
            }
        }
        self.register_all(&mut jobs).await?;
        tracing::info!(jobs = jobs.len(), "scheduler: reloaded");
        Ok(jobs.len())
    }

    /// Run discovery for one account and type right now, outside the
    /// timers. Errors propagate to the caller instead of being swallowed
    /// into the account record alone.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError`] exactly as [`DiscoveryService::discover`]
    /// does.
    pub async fn trigger_now(
        &self,
        account_id: i64,
        discovery_type: DiscoveryType,
    ) -> Result<Vec<OpportunityRow>, DiscoveryError> {
        tracing::info!(
            account_id,
            discovery_type = %discovery_type,
            "scheduler: manual discovery trigger"
        );
        self.discovery.discover(account_id, discovery_type).await
    }

    /// Start firing registered jobs.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Scheduler`] on failure.
    pub async fn start(&self) -> Result<(), SchedulerError> {
        self.inner.start().await?;
        Ok(())
    }

    /// Stop all timers. Does not interrupt a run already executing; a
    /// bounded run comes from adapter-level request timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Scheduler`] on failure.
    pub async fn stop(&self) -> Result<(), SchedulerError> {
        let mut inner = self.inner.clone();
        inner.shutdown().await?;
        Ok(())
    }

    /// Number of currently registered jobs.
    pub async fn job_count(&self) -> usize {
        self.jobs.lock().await.len()
    }

    async fn register_all(&self, jobs: &mut HashMap<JobKey, Uuid>) -> Result<(), SchedulerError> {
        let accounts = replyradar_db::list_accounts_with_schedules(&self.pool).await?;
        for entry in accounts {
            self.register_account(jobs, &entry).await?;
        }
        Ok(())
    }

    async fn register_account(
        &self,
        jobs: &mut HashMap<JobKey, Uuid>,
        entry: &AccountWithSchedules,
    ) -> Result<(), SchedulerError> {
        let account = &entry.account;
        if account.is_paused {
            tracing::debug!(account_id = account.id, "scheduler: account paused; skipping");
            return Ok(());
        }
        if account.status == "error" {
            tracing::debug!(
                account_id = account.id,
                "scheduler: account in error status; skipping"
            );
            return Ok(());
        }

        for schedule in &entry.schedules {
            if !schedule.enabled {
                continue;
            }

            let Ok(discovery_type) = schedule.discovery_type.parse::<DiscoveryType>() else {
                tracing::warn!(
                    account_id = account.id,
                    discovery_type = %schedule.discovery_type,
                    "scheduler: unknown discovery type on schedule; skipping"
                );
                continue;
            };

            let expr = match schedule.schedule.parse::<ScheduleExpr>() {
                Ok(expr) => expr,
                Err(e) => {
                    tracing::warn!(
                        account_id = account.id,
                        discovery_type = %discovery_type,
                        schedule = %schedule.schedule,
                        error = %e,
                        "scheduler: invalid schedule expression; skipping"
                    );
                    continue;
                }
            };

            let job = self.build_job(account.id, discovery_type, &expr)?;
            let job_id = self.inner.add(job).await?;
            jobs.insert((account.id, discovery_type), job_id);
            tracing::info!(
                account_id = account.id,
                discovery_type = %discovery_type,
                schedule = %expr,
                "scheduler: registered discovery job"
            );
        }

        Ok(())
    }

    fn build_job(
        &self,
        account_id: i64,
        discovery_type: DiscoveryType,
        expr: &ScheduleExpr,
    ) -> Result<Job, SchedulerError> {
        let discovery = Arc::clone(&self.discovery);
        let make_run = move |_uuid: Uuid, _lock: tokio_cron_scheduler::JobScheduler| {
            let discovery = Arc::clone(&discovery);
            Box::pin(async move {
                run_discovery_job(&discovery, account_id, discovery_type).await;
            }) as std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>>
        };

        let job = match expr {
            ScheduleExpr::Cron(line) => Job::new_async(line.as_str(), make_run)?,
            ScheduleExpr::Every(interval) => Job::new_repeated_async(*interval, make_run)?,
        };
        Ok(job)
    }
}

/// One scheduled run. Failures are logged and recorded on the account by
/// the discovery service; nothing propagates, so sibling jobs are
/// unaffected.
async fn run_discovery_job(
    discovery: &DiscoveryService,
    account_id: i64,
    discovery_type: DiscoveryType,
) {
    tracing::info!(
        account_id,
        discovery_type = %discovery_type,
        "scheduler: starting discovery run"
    );
    match discovery.discover(account_id, discovery_type).await {
        Ok(created) => {
            tracing::info!(
                account_id,
                discovery_type = %discovery_type,
                created = created.len(),
                "scheduler: discovery run complete"
            );
        }
        Err(e) => {
            tracing::error!(
                account_id,
                discovery_type = %discovery_type,
                error = %e,
                "scheduler: discovery run failed"
            );
        }
    }
}

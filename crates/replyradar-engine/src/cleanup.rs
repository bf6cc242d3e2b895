//! Expiry and retention: the periodic cleanup pass.
//!
//! Runs on its own timer, independent of the discovery scheduler. One pass
//! expires overdue `pending` opportunities, then hard-deletes per the
//! per-status policy: `expired` immediately, `dismissed` after a short
//! retention window (the UI's undo-adjacent grace period), `responded`
//! never.

use chrono::{Duration, Utc};
use replyradar_core::AppConfig;
use replyradar_db::DbError;
use sqlx::PgPool;

#[derive(Debug, Clone, Copy)]
pub struct CleanupConfig {
    /// How long a dismissed opportunity survives past its last status change.
    pub dismissed_retention: Duration,
    pub interval: std::time::Duration,
}

impl CleanupConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            dismissed_retention: Duration::seconds(config.dismissed_retention_secs as i64),
            interval: std::time::Duration::from_secs(config.cleanup_interval_secs),
        }
    }
}

/// What one cleanup pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupSummary {
    /// Pending opportunities transitioned to `expired`.
    pub expired: u64,
    /// Expired opportunities hard-deleted.
    pub deleted_expired: u64,
    /// Dismissed opportunities hard-deleted after retention.
    pub deleted_dismissed: u64,
    /// Responses deleted by the cascades above.
    pub deleted_responses: u64,
}

pub struct CleanupService {
    pool: PgPool,
    config: CleanupConfig,
}

impl CleanupService {
    #[must_use]
    pub fn new(pool: PgPool, config: CleanupConfig) -> Self {
        Self { pool, config }
    }

    /// Run one cleanup pass.
    ///
    /// Deletion is best-effort per opportunity: a failed cascade is logged
    /// and the pass moves on to the next row rather than aborting.
    ///
    /// # Errors
    ///
    /// Returns `DbError` only if the expiry update or a target listing
    /// fails; individual cascade failures do not surface here.
    pub async fn cleanup(&self) -> Result<CleanupSummary, DbError> {
        let now = Utc::now();
        let mut summary = CleanupSummary {
            expired: replyradar_db::expire_overdue_pending(&self.pool, now).await?,
            ..CleanupSummary::default()
        };

        // Expired rows go in the same pass that marked them.
        for id in replyradar_db::list_expired_ids(&self.pool).await? {
            match replyradar_db::delete_opportunity_cascade(&self.pool, id).await {
                Ok(responses) => {
                    summary.deleted_expired += 1;
                    summary.deleted_responses += responses;
                }
                Err(e) => {
                    tracing::warn!(opportunity_id = id, error = %e, "cleanup: failed to delete expired opportunity");
                }
            }
        }

        let cutoff = now - self.config.dismissed_retention;
        for id in replyradar_db::list_deletable_dismissed_ids(&self.pool, cutoff).await? {
            match replyradar_db::delete_opportunity_cascade(&self.pool, id).await {
                Ok(responses) => {
                    summary.deleted_dismissed += 1;
                    summary.deleted_responses += responses;
                }
                Err(e) => {
                    tracing::warn!(opportunity_id = id, error = %e, "cleanup: failed to delete dismissed opportunity");
                }
            }
        }

        tracing::info!(
            expired = summary.expired,
            deleted_expired = summary.deleted_expired,
            deleted_dismissed = summary.deleted_dismissed,
            deleted_responses = summary.deleted_responses,
            "cleanup: pass complete"
        );

        Ok(summary)
    }

    /// Run cleanup forever on the configured interval. Intended for
    /// `tokio::spawn` from the server binary; errors are logged, never
    /// fatal.
    pub async fn run_loop(self) {
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = self.cleanup().await {
                tracing::error!(error = %e, "cleanup: pass failed");
            }
        }
    }
}

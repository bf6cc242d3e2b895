//! One discovery run: fetch → score → filter → dedup → persist.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use replyradar_core::{AppConfig, DiscoveryType};
use replyradar_db::{DbError, NewAuthor, NewOpportunity, OpportunityRow};
use replyradar_platform::{AccountRef, PlatformAdapter, PlatformError, RawPost, SearchOptions};
use sqlx::PgPool;
use thiserror::Error;

use crate::scoring::{self, ScoreWeights};

/// Errors from a discovery run.
///
/// Platform errors (rate limit, auth, network) leave the schedule cursor
/// where it was, so the next run retries the same window.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error(transparent)]
    Platform(#[from] PlatformError),
    #[error(transparent)]
    Db(#[from] DbError),
}

/// Engine tunables for discovery, lifted out of [`AppConfig`].
#[derive(Debug, Clone, Copy)]
pub struct DiscoveryConfig {
    pub min_score_threshold: i32,
    pub opportunity_ttl: Duration,
    /// Lookback used on a schedule's first ever run.
    pub fallback_lookback: Duration,
    /// Hard cap on the window, however stale `last_run_at` is.
    pub max_lookback: Duration,
    pub weights: ScoreWeights,
}

impl DiscoveryConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            min_score_threshold: config.min_score_threshold,
            opportunity_ttl: Duration::seconds(config.opportunity_ttl_secs as i64),
            fallback_lookback: Duration::seconds(config.fallback_lookback_secs as i64),
            max_lookback: Duration::seconds(config.max_lookback_secs as i64),
            weights: ScoreWeights::from_app_config(config),
        }
    }
}

/// Orchestrates discovery runs for one platform adapter.
pub struct DiscoveryService {
    pool: PgPool,
    adapter: Arc<dyn PlatformAdapter>,
    config: DiscoveryConfig,
}

impl DiscoveryService {
    #[must_use]
    pub fn new(pool: PgPool, adapter: Arc<dyn PlatformAdapter>, config: DiscoveryConfig) -> Self {
        Self {
            pool,
            adapter,
            config,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run one discovery pass for an account and discovery type, returning
    /// the opportunities created by this pass (duplicates and sub-threshold
    /// posts are not in the list).
    ///
    /// Safe to re-run over overlapping time windows: the store's
    /// (`account_id`, `post_id`) uniqueness turns duplicate candidates into
    /// silent skips.
    ///
    /// # Errors
    ///
    /// Adapter and database failures are recorded on the account as
    /// `discovery_error` (best-effort) and propagated. The schedule cursor
    /// only advances on full success.
    pub async fn discover(
        &self,
        account_id: i64,
        discovery_type: DiscoveryType,
    ) -> Result<Vec<OpportunityRow>, DiscoveryError> {
        match self.run(account_id, discovery_type).await {
            Ok(created) => Ok(created),
            Err(err) => {
                if let Err(record_err) =
                    replyradar_db::record_discovery_error(&self.pool, account_id, &err.to_string())
                        .await
                {
                    tracing::warn!(
                        account_id,
                        error = %record_err,
                        "discovery: failed to record discovery error on account"
                    );
                }
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        account_id: i64,
        discovery_type: DiscoveryType,
    ) -> Result<Vec<OpportunityRow>, DiscoveryError> {
        let account = replyradar_db::get_account(&self.pool, account_id).await?;
        let schedule =
            replyradar_db::get_schedule(&self.pool, account_id, discovery_type.as_str()).await?;

        let now = Utc::now();
        let since = self.window_start(schedule.last_run_at, now);
        let account_ref = AccountRef {
            platform: account.platform.clone(),
            handle: account.handle.clone(),
        };

        let posts = match discovery_type {
            DiscoveryType::Replies => self.adapter.fetch_replies(&account_ref, since).await?,
            DiscoveryType::Search => {
                if account.keywords.is_empty() {
                    // Nothing to search for. A successful no-op, not an
                    // error: the cursor still advances.
                    tracing::debug!(
                        account_id,
                        "discovery: no profile keywords; skipping search call"
                    );
                    replyradar_db::mark_discovery_success(
                        &self.pool,
                        account_id,
                        discovery_type.as_str(),
                        now,
                    )
                    .await?;
                    return Ok(Vec::new());
                }
                self.adapter
                    .search_posts(&account_ref, &account.keywords, &SearchOptions::default())
                    .await?
            }
        };

        let fetched = posts.len();
        let mut created = Vec::new();
        let mut below_threshold = 0usize;
        let mut duplicates = 0usize;

        for post in posts {
            match self
                .persist_post(&account.platform, account_id, discovery_type, &post, now)
                .await?
            {
                PersistOutcome::Created(row) => created.push(row),
                PersistOutcome::BelowThreshold => below_threshold += 1,
                PersistOutcome::Duplicate => duplicates += 1,
            }
        }

        replyradar_db::mark_discovery_success(&self.pool, account_id, discovery_type.as_str(), now)
            .await?;

        tracing::info!(
            account_id,
            discovery_type = %discovery_type,
            fetched,
            created = created.len(),
            below_threshold,
            duplicates,
            "discovery: run complete"
        );

        Ok(created)
    }

    /// Score and persist one post; authors are refreshed even for posts
    /// that turn out to be duplicates of an existing opportunity.
    async fn persist_post(
        &self,
        platform: &str,
        account_id: i64,
        discovery_type: DiscoveryType,
        post: &RawPost,
        now: DateTime<Utc>,
    ) -> Result<PersistOutcome, DiscoveryError> {
        let age_minutes = (now - post.created_at).num_seconds() as f64 / 60.0;
        let score = scoring::score_post(
            age_minutes,
            i64::from(post.author.follower_count),
            i64::from(post.like_count),
            i64::from(post.repost_count),
            &self.config.weights,
        );

        if score.total < self.config.min_score_threshold {
            tracing::trace!(
                account_id,
                post_id = %post.post_id,
                score = score.total,
                threshold = self.config.min_score_threshold,
                "discovery: post below score threshold"
            );
            return Ok(PersistOutcome::BelowThreshold);
        }

        let author_id = replyradar_db::upsert_author(
            &self.pool,
            &NewAuthor {
                platform,
                platform_user_id: &post.author.platform_user_id,
                username: &post.author.username,
                display_name: post.author.display_name.as_deref(),
                bio: post.author.bio.as_deref(),
                follower_count: post.author.follower_count,
            },
        )
        .await?;

        let inserted = replyradar_db::insert_opportunity(
            &self.pool,
            &NewOpportunity {
                account_id,
                post_id: &post.post_id,
                author_id,
                content: &post.text,
                posted_at: post.created_at,
                like_count: post.like_count,
                repost_count: post.repost_count,
                reply_count: post.reply_count,
                recency_score: score.recency as f32,
                impact_score: score.impact as f32,
                total_score: score.total,
                discovery_type: discovery_type.as_str(),
                expires_at: now + self.config.opportunity_ttl,
            },
        )
        .await?;

        match inserted {
            Some(row) => {
                tracing::debug!(
                    account_id,
                    post_id = %post.post_id,
                    score = %score.explanation(&self.config.weights),
                    "discovery: opportunity created"
                );
                Ok(PersistOutcome::Created(row))
            }
            None => {
                tracing::trace!(
                    account_id,
                    post_id = %post.post_id,
                    "discovery: duplicate post skipped"
                );
                Ok(PersistOutcome::Duplicate)
            }
        }
    }

    /// Start of the fetch window: the schedule cursor, or the fallback
    /// lookback on a first run, never further back than the cap.
    fn window_start(&self, last_run_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
        let since = last_run_at.unwrap_or(now - self.config.fallback_lookback);
        since.max(now - self.config.max_lookback)
    }
}

enum PersistOutcome {
    Created(OpportunityRow),
    BelowThreshold,
    Duplicate,
}

//! Live tests for `DiscoveryService` against a stub platform adapter.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use replyradar_core::DiscoveryType;
use replyradar_engine::{DiscoveryConfig, DiscoveryError, DiscoveryService, ScoreWeights};
use replyradar_platform::{
    AccountRef, PlatformAdapter, PlatformError, RawAuthor, RawPost, SearchOptions,
};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Stub adapter
// ---------------------------------------------------------------------------

/// Serves a fixed batch of posts and counts calls; optionally fails every
/// fetch with a rate-limit error.
struct StubAdapter {
    posts: Vec<RawPost>,
    reply_calls: AtomicUsize,
    search_calls: AtomicUsize,
    fail: bool,
}

impl StubAdapter {
    fn serving(posts: Vec<RawPost>) -> Arc<Self> {
        Arc::new(Self {
            posts,
            reply_calls: AtomicUsize::new(0),
            search_calls: AtomicUsize::new(0),
            fail: false,
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            posts: Vec::new(),
            reply_calls: AtomicUsize::new(0),
            search_calls: AtomicUsize::new(0),
            fail: true,
        })
    }

    fn batch(&self) -> Result<Vec<RawPost>, PlatformError> {
        if self.fail {
            return Err(PlatformError::RateLimited { retry_after: None });
        }
        Ok(self.posts.clone())
    }
}

#[async_trait]
impl PlatformAdapter for StubAdapter {
    async fn fetch_replies(
        &self,
        _account: &AccountRef,
        _since: DateTime<Utc>,
    ) -> Result<Vec<RawPost>, PlatformError> {
        self.reply_calls.fetch_add(1, Ordering::SeqCst);
        self.batch()
    }

    async fn search_posts(
        &self,
        _account: &AccountRef,
        _keywords: &[String],
        _options: &SearchOptions,
    ) -> Result<Vec<RawPost>, PlatformError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.batch()
    }

    async fn get_author(&self, _platform_user_id: &str) -> Result<RawAuthor, PlatformError> {
        Err(PlatformError::Api("not used in tests".to_string()))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn test_config() -> DiscoveryConfig {
    DiscoveryConfig {
        min_score_threshold: 40,
        opportunity_ttl: Duration::hours(4),
        fallback_lookback: Duration::hours(2),
        max_lookback: Duration::days(7),
        weights: ScoreWeights::default(),
    }
}

fn make_post(post_id: &str, age_minutes: i64, follower_count: i32) -> RawPost {
    RawPost {
        post_id: post_id.to_string(),
        text: format!("post {post_id}"),
        created_at: Utc::now() - Duration::minutes(age_minutes),
        like_count: 10,
        repost_count: 2,
        reply_count: 1,
        author: RawAuthor {
            platform_user_id: format!("author-of-{post_id}"),
            username: format!("user_{post_id}"),
            display_name: None,
            bio: None,
            follower_count,
        },
    }
}

async fn insert_account(pool: &PgPool, handle: &str, keywords: &[&str]) -> i64 {
    let keywords: Vec<String> = keywords.iter().map(ToString::to_string).collect();
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO accounts (platform, handle, keywords) VALUES ('x', $1, $2) RETURNING id",
    )
    .bind(handle)
    .bind(&keywords)
    .fetch_one(pool)
    .await
    .expect("insert_account failed")
}

async fn insert_schedule(pool: &PgPool, account_id: i64, discovery_type: &str) {
    sqlx::query(
        "INSERT INTO account_schedules (account_id, discovery_type, schedule) \
         VALUES ($1, $2, '@every 5m')",
    )
    .bind(account_id)
    .bind(discovery_type)
    .execute(pool)
    .await
    .expect("insert_schedule failed");
}

async fn opportunity_count(pool: &PgPool) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM opportunities")
        .fetch_one(pool)
        .await
        .unwrap()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn overlapping_runs_never_duplicate_opportunities(pool: PgPool) {
    let account = insert_account(&pool, "acct", &[]).await;
    insert_schedule(&pool, account, "replies").await;

    let adapter = StubAdapter::serving(vec![
        make_post("p-1", 2, 50_000),
        make_post("p-2", 5, 80_000),
    ]);
    let service = DiscoveryService::new(pool.clone(), adapter, test_config());

    let first = service.discover(account, DiscoveryType::Replies).await.unwrap();
    assert_eq!(first.len(), 2);

    // Second run re-fetches the same posts (overlapping window); every one
    // is a silent duplicate skip.
    let second = service.discover(account, DiscoveryType::Replies).await.unwrap();
    assert!(second.is_empty());
    assert_eq!(opportunity_count(&pool).await, 2);
}

#[sqlx::test(migrations = "../../migrations")]
async fn search_without_keywords_is_a_noop_success(pool: PgPool) {
    let account = insert_account(&pool, "acct", &[]).await;
    insert_schedule(&pool, account, "search").await;

    let adapter = StubAdapter::serving(vec![make_post("p-1", 2, 50_000)]);
    let service = DiscoveryService::new(pool.clone(), adapter.clone(), test_config());

    let created = service.discover(account, DiscoveryType::Search).await.unwrap();
    assert!(created.is_empty());
    assert_eq!(
        adapter.search_calls.load(Ordering::SeqCst),
        0,
        "adapter must not be called with no keywords"
    );

    // Still a successful run: the cursor advances.
    let schedule = replyradar_db::get_schedule(&pool, account, "search").await.unwrap();
    assert!(schedule.last_run_at.is_some());
}

#[sqlx::test(migrations = "../../migrations")]
async fn search_with_keywords_calls_adapter_once(pool: PgPool) {
    let account = insert_account(&pool, "acct", &["rust", "async"]).await;
    insert_schedule(&pool, account, "search").await;

    let adapter = StubAdapter::serving(vec![make_post("p-1", 2, 50_000)]);
    let service = DiscoveryService::new(pool.clone(), adapter.clone(), test_config());

    let created = service.discover(account, DiscoveryType::Search).await.unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(adapter.search_calls.load(Ordering::SeqCst), 1);
    assert_eq!(created[0].discovery_type, "search");
}

#[sqlx::test(migrations = "../../migrations")]
async fn posts_below_threshold_are_never_persisted(pool: PgPool) {
    let account = insert_account(&pool, "acct", &[]).await;
    insert_schedule(&pool, account, "replies").await;

    // Ten hours old, tiny author: recency ~0, impact well under 40.
    let adapter = StubAdapter::serving(vec![make_post("p-stale", 600, 10)]);
    let service = DiscoveryService::new(pool.clone(), adapter, test_config());

    let created = service.discover(account, DiscoveryType::Replies).await.unwrap();
    assert!(created.is_empty());
    assert_eq!(opportunity_count(&pool).await, 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn adapter_failure_keeps_cursor_and_records_error(pool: PgPool) {
    let account = insert_account(&pool, "acct", &[]).await;
    insert_schedule(&pool, account, "replies").await;

    let service = DiscoveryService::new(pool.clone(), StubAdapter::failing(), test_config());

    let err = service
        .discover(account, DiscoveryType::Replies)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DiscoveryError::Platform(PlatformError::RateLimited { .. })
    ));

    // The next run must retry the same window.
    let schedule = replyradar_db::get_schedule(&pool, account, "replies").await.unwrap();
    assert!(schedule.last_run_at.is_none());

    let account_row = replyradar_db::get_account(&pool, account).await.unwrap();
    assert_eq!(
        account_row.discovery_error.as_deref(),
        Some("rate limited by platform")
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn recovery_clears_the_recorded_error(pool: PgPool) {
    let account = insert_account(&pool, "acct", &[]).await;
    insert_schedule(&pool, account, "replies").await;

    let failing = DiscoveryService::new(pool.clone(), StubAdapter::failing(), test_config());
    failing
        .discover(account, DiscoveryType::Replies)
        .await
        .unwrap_err();

    let working = DiscoveryService::new(
        pool.clone(),
        StubAdapter::serving(vec![make_post("p-1", 2, 50_000)]),
        test_config(),
    );
    working.discover(account, DiscoveryType::Replies).await.unwrap();

    let account_row = replyradar_db::get_account(&pool, account).await.unwrap();
    assert!(account_row.discovery_error.is_none());
    assert!(account_row.discovery_last_at.is_some());
}

#[sqlx::test(migrations = "../../migrations")]
async fn rediscovery_refreshes_the_author_profile(pool: PgPool) {
    let account = insert_account(&pool, "acct", &[]).await;
    insert_schedule(&pool, account, "replies").await;

    let mut early = make_post("p-1", 2, 1_000);
    early.author.platform_user_id = "author-1".to_string();
    let first = DiscoveryService::new(
        pool.clone(),
        StubAdapter::serving(vec![early]),
        test_config(),
    );
    first.discover(account, DiscoveryType::Replies).await.unwrap();

    // Same author posts again later with more followers.
    let mut later = make_post("p-2", 1, 90_000);
    later.author.platform_user_id = "author-1".to_string();
    let second = DiscoveryService::new(
        pool.clone(),
        StubAdapter::serving(vec![later]),
        test_config(),
    );
    second.discover(account, DiscoveryType::Replies).await.unwrap();

    let (author_rows, follower_count) = sqlx::query_as::<_, (i64, i32)>(
        "SELECT COUNT(*), MAX(follower_count) FROM authors WHERE platform_user_id = 'author-1'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(author_rows, 1, "one row per platform user");
    assert_eq!(follower_count, 90_000);
}

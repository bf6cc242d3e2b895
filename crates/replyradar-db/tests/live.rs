//! Live integration tests for replyradar-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. The `migrations` path is relative to the crate root
//! (`crates/replyradar-db/`), so `"../../migrations"` resolves to the
//! workspace migration directory.

use chrono::{Duration, Utc};
use replyradar_core::OpportunityStatus;
use replyradar_db::{
    bulk_dismiss, delete_opportunity_cascade, expire_overdue_pending, get_account, get_schedule,
    insert_opportunity, insert_response, list_deletable_dismissed_ids, list_expired_ids,
    list_opportunities, mark_discovery_success, record_discovery_error, update_status,
    upsert_author, DbError, NewAuthor, NewOpportunity, OpportunityFilter, OpportunitySort,
    StatusFilter,
};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Insert a minimal account row and return its generated `id`.
async fn insert_test_account(pool: &PgPool, handle: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO accounts (platform, handle, keywords) VALUES ('x', $1, '{}') RETURNING id",
    )
    .bind(handle)
    .fetch_one(pool)
    .await
    .unwrap_or_else(|e| panic!("insert_test_account failed for handle '{handle}': {e}"))
}

/// Insert a schedule row for an account and discovery type.
async fn insert_test_schedule(pool: &PgPool, account_id: i64, discovery_type: &str) {
    sqlx::query(
        "INSERT INTO account_schedules (account_id, discovery_type, schedule) \
         VALUES ($1, $2, '@every 5m')",
    )
    .bind(account_id)
    .bind(discovery_type)
    .execute(pool)
    .await
    .expect("insert_test_schedule failed");
}

async fn insert_test_author(pool: &PgPool, platform_user_id: &str) -> i64 {
    upsert_author(
        pool,
        &NewAuthor {
            platform: "x",
            platform_user_id,
            username: "someone",
            display_name: Some("Someone"),
            bio: None,
            follower_count: 1000,
        },
    )
    .await
    .expect("upsert_author failed")
}

fn make_opportunity<'a>(account_id: i64, post_id: &'a str, author_id: i64) -> NewOpportunity<'a> {
    let now = Utc::now();
    NewOpportunity {
        account_id,
        post_id,
        author_id,
        content: "interesting post",
        posted_at: now - Duration::minutes(10),
        like_count: 5,
        repost_count: 1,
        reply_count: 0,
        recency_score: 71.6,
        impact_score: 33.0,
        total_score: 60,
        discovery_type: "replies",
        expires_at: now + Duration::hours(4),
    }
}

// ---------------------------------------------------------------------------
// Opportunities: dedup and status machine
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn insert_dedups_on_account_and_post_id(pool: PgPool) {
    let account = insert_test_account(&pool, "acct").await;
    let author = insert_test_author(&pool, "u1").await;

    let first = insert_opportunity(&pool, &make_opportunity(account, "p-1", author))
        .await
        .unwrap();
    assert!(first.is_some(), "first insert should create a row");

    let second = insert_opportunity(&pool, &make_opportunity(account, "p-1", author))
        .await
        .unwrap();
    assert!(second.is_none(), "duplicate insert should be a silent skip");

    // Same post id for a different account is a distinct opportunity.
    let other_account = insert_test_account(&pool, "other").await;
    let cross = insert_opportunity(&pool, &make_opportunity(other_account, "p-1", author))
        .await
        .unwrap();
    assert!(cross.is_some());
}

#[sqlx::test(migrations = "../../migrations")]
async fn update_status_moves_pending_to_terminal_once(pool: PgPool) {
    let account = insert_test_account(&pool, "acct").await;
    let author = insert_test_author(&pool, "u1").await;
    let row = insert_opportunity(&pool, &make_opportunity(account, "p-1", author))
        .await
        .unwrap()
        .unwrap();

    let updated = update_status(&pool, row.public_id, OpportunityStatus::Responded)
        .await
        .unwrap();
    assert_eq!(updated.status, "responded");
    assert!(updated.updated_at > row.updated_at);

    // Terminal rows refuse further transitions.
    let err = update_status(&pool, row.public_id, OpportunityStatus::Dismissed)
        .await
        .unwrap_err();
    assert!(
        matches!(err, DbError::InvalidTransition { ref current } if current == "responded"),
        "expected InvalidTransition(responded), got: {err:?}"
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn update_status_unknown_id_is_not_found(pool: PgPool) {
    let err = update_status(&pool, uuid::Uuid::new_v4(), OpportunityStatus::Dismissed)
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::NotFound));
}

#[sqlx::test(migrations = "../../migrations")]
async fn update_status_rejects_a_pending_target(pool: PgPool) {
    let account = insert_test_account(&pool, "acct").await;
    let author = insert_test_author(&pool, "u1").await;
    let row = insert_opportunity(&pool, &make_opportunity(account, "p-1", author))
        .await
        .unwrap()
        .unwrap();

    let err = update_status(&pool, row.public_id, OpportunityStatus::Pending)
        .await
        .unwrap_err();
    assert!(
        matches!(err, DbError::InvalidTargetStatus { ref target } if target == "pending"),
        "expected InvalidTargetStatus(pending), got: {err:?}"
    );

    // The row is untouched, updated_at included.
    let unchanged = sqlx::query_scalar::<_, String>(
        "SELECT status FROM opportunities WHERE public_id = $1",
    )
    .bind(row.public_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(unchanged, "pending");
    let updated_at = sqlx::query_scalar::<_, chrono::DateTime<Utc>>(
        "SELECT updated_at FROM opportunities WHERE public_id = $1",
    )
    .bind(row.public_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(updated_at, row.updated_at);
}

#[sqlx::test(migrations = "../../migrations")]
async fn bulk_dismiss_only_touches_own_pending_rows(pool: PgPool) {
    let account = insert_test_account(&pool, "acct").await;
    let foreign_account = insert_test_account(&pool, "other").await;
    let author = insert_test_author(&pool, "u1").await;

    let pending = insert_opportunity(&pool, &make_opportunity(account, "p-1", author))
        .await
        .unwrap()
        .unwrap();
    let already_dismissed = insert_opportunity(&pool, &make_opportunity(account, "p-2", author))
        .await
        .unwrap()
        .unwrap();
    update_status(&pool, already_dismissed.public_id, OpportunityStatus::Dismissed)
        .await
        .unwrap();
    let foreign = insert_opportunity(&pool, &make_opportunity(foreign_account, "p-3", author))
        .await
        .unwrap()
        .unwrap();
    let unknown = uuid::Uuid::new_v4();

    let outcome = bulk_dismiss(
        &pool,
        account,
        &[
            pending.public_id,
            already_dismissed.public_id,
            foreign.public_id,
            unknown,
        ],
    )
    .await
    .unwrap();

    assert_eq!(outcome.dismissed, 1);
    assert_eq!(outcome.skipped.len(), 3);
    assert!(outcome.skipped.contains(&already_dismissed.public_id));
    assert!(outcome.skipped.contains(&foreign.public_id));
    assert!(outcome.skipped.contains(&unknown));

    // The foreign account's row is untouched.
    let rows = list_opportunities(
        &pool,
        &OpportunityFilter {
            account_id: Some(foreign_account),
            status: StatusFilter::Only(OpportunityStatus::Pending),
            ..OpportunityFilter::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(rows.len(), 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn list_filters_by_status_and_sorts_by_score(pool: PgPool) {
    let account = insert_test_account(&pool, "acct").await;
    let author = insert_test_author(&pool, "u1").await;

    let mut low = make_opportunity(account, "p-low", author);
    low.total_score = 45;
    insert_opportunity(&pool, &low).await.unwrap();

    let mut high = make_opportunity(account, "p-high", author);
    high.total_score = 90;
    insert_opportunity(&pool, &high).await.unwrap();

    let dismissed = insert_opportunity(&pool, &make_opportunity(account, "p-gone", author))
        .await
        .unwrap()
        .unwrap();
    update_status(&pool, dismissed.public_id, OpportunityStatus::Dismissed)
        .await
        .unwrap();

    let pending = list_opportunities(
        &pool,
        &OpportunityFilter {
            account_id: Some(account),
            status: StatusFilter::Only(OpportunityStatus::Pending),
            sort: OpportunitySort::Score,
            ..OpportunityFilter::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].post_id, "p-high");
    assert_eq!(pending[1].post_id, "p-low");

    let all = list_opportunities(
        &pool,
        &OpportunityFilter {
            account_id: Some(account),
            status: StatusFilter::All,
            ..OpportunityFilter::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(all.len(), 3);
}

// ---------------------------------------------------------------------------
// Cleanup primitives
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn expire_only_flips_overdue_pending_rows(pool: PgPool) {
    let account = insert_test_account(&pool, "acct").await;
    let author = insert_test_author(&pool, "u1").await;
    let now = Utc::now();

    let mut overdue = make_opportunity(account, "p-old", author);
    overdue.expires_at = now - Duration::minutes(1);
    let overdue = insert_opportunity(&pool, &overdue).await.unwrap().unwrap();

    let mut fresh = make_opportunity(account, "p-new", author);
    fresh.expires_at = now + Duration::hours(1);
    insert_opportunity(&pool, &fresh).await.unwrap();

    let expired = expire_overdue_pending(&pool, now).await.unwrap();
    assert_eq!(expired, 1);

    let expired_ids = list_expired_ids(&pool).await.unwrap();
    assert_eq!(expired_ids, vec![overdue.id]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn dismissed_retention_cutoff_selects_old_rows_only(pool: PgPool) {
    let account = insert_test_account(&pool, "acct").await;
    let author = insert_test_author(&pool, "u1").await;
    let now = Utc::now();

    let recent = insert_opportunity(&pool, &make_opportunity(account, "p-recent", author))
        .await
        .unwrap()
        .unwrap();
    update_status(&pool, recent.public_id, OpportunityStatus::Dismissed)
        .await
        .unwrap();

    let old = insert_opportunity(&pool, &make_opportunity(account, "p-old", author))
        .await
        .unwrap()
        .unwrap();
    update_status(&pool, old.public_id, OpportunityStatus::Dismissed)
        .await
        .unwrap();
    // Backdate the old row's status change past the retention window.
    sqlx::query("UPDATE opportunities SET updated_at = $2 WHERE id = $1")
        .bind(old.id)
        .bind(now - Duration::minutes(6))
        .execute(&pool)
        .await
        .unwrap();

    let deletable = list_deletable_dismissed_ids(&pool, now - Duration::minutes(5))
        .await
        .unwrap();
    assert_eq!(deletable, vec![old.id]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn delete_cascade_removes_responses_first(pool: PgPool) {
    let account = insert_test_account(&pool, "acct").await;
    let author = insert_test_author(&pool, "u1").await;
    let row = insert_opportunity(&pool, &make_opportunity(account, "p-1", author))
        .await
        .unwrap()
        .unwrap();
    update_status(&pool, row.public_id, OpportunityStatus::Dismissed)
        .await
        .unwrap();
    insert_response(&pool, row.id, "draft reply").await.unwrap();

    let responses_deleted = delete_opportunity_cascade(&pool, row.id).await.unwrap();
    assert_eq!(responses_deleted, 1);

    let remaining = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM opportunities")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn delete_cascade_refuses_responded_rows(pool: PgPool) {
    let account = insert_test_account(&pool, "acct").await;
    let author = insert_test_author(&pool, "u1").await;
    let row = insert_opportunity(&pool, &make_opportunity(account, "p-1", author))
        .await
        .unwrap()
        .unwrap();
    update_status(&pool, row.public_id, OpportunityStatus::Responded)
        .await
        .unwrap();
    insert_response(&pool, row.id, "sent reply").await.unwrap();

    let err = delete_opportunity_cascade(&pool, row.id).await.unwrap_err();
    assert!(matches!(err, DbError::NotFound));

    // Rolled back: the response survives with its opportunity.
    let responses = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM responses")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(responses, 1);
}

// ---------------------------------------------------------------------------
// Discovery bookkeeping
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn success_advances_cursor_and_clears_error(pool: PgPool) {
    let account = insert_test_account(&pool, "acct").await;
    insert_test_schedule(&pool, account, "replies").await;
    record_discovery_error(&pool, account, "rate limited by platform")
        .await
        .unwrap();

    let ran_at = Utc::now();
    mark_discovery_success(&pool, account, "replies", ran_at)
        .await
        .unwrap();

    // Postgres stores microseconds; compare with a small tolerance.
    let schedule = get_schedule(&pool, account, "replies").await.unwrap();
    let cursor = schedule.last_run_at.expect("cursor should be set");
    assert!((cursor - ran_at).num_milliseconds().abs() < 5);

    let account_row = get_account(&pool, account).await.unwrap();
    let last_at = account_row.discovery_last_at.expect("last_at should be set");
    assert!((last_at - ran_at).num_milliseconds().abs() < 5);
    assert!(account_row.discovery_error.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn failure_records_message_without_moving_cursor(pool: PgPool) {
    let account = insert_test_account(&pool, "acct").await;
    insert_test_schedule(&pool, account, "search").await;

    record_discovery_error(&pool, account, "platform authentication failed: expired token")
        .await
        .unwrap();

    let schedule = get_schedule(&pool, account, "search").await.unwrap();
    assert!(schedule.last_run_at.is_none());

    let account_row = get_account(&pool, account).await.unwrap();
    assert_eq!(
        account_row.discovery_error.as_deref(),
        Some("platform authentication failed: expired token")
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn upsert_author_refreshes_profile_fields(pool: PgPool) {
    let first = insert_test_author(&pool, "u1").await;

    let second = upsert_author(
        &pool,
        &NewAuthor {
            platform: "x",
            platform_user_id: "u1",
            username: "someone",
            display_name: Some("Someone Renamed"),
            bio: Some("new bio"),
            follower_count: 2500,
        },
    )
    .await
    .unwrap();

    assert_eq!(first, second, "same platform user must keep one row");

    let (display_name, follower_count) = sqlx::query_as::<_, (Option<String>, i32)>(
        "SELECT display_name, follower_count FROM authors WHERE id = $1",
    )
    .bind(first)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(display_name.as_deref(), Some("Someone Renamed"));
    assert_eq!(follower_count, 2500);
}

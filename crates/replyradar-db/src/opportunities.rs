//! Database operations for `opportunities`.
//!
//! The uniqueness of (`account_id`, `post_id`) and the "update only if still
//! pending" compare-and-set both live here, in SQL, so concurrent writers
//! (overlapping scheduled and manual runs, bulk dismiss racing cleanup)
//! cannot duplicate rows or resurrect terminal statuses.

use chrono::{DateTime, Utc};
use replyradar_core::OpportunityStatus;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{authors::AuthorRow, DbError};

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `opportunities` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OpportunityRow {
    pub id: i64,
    pub public_id: Uuid,
    pub account_id: i64,
    pub post_id: String,
    pub author_id: i64,
    pub content: String,
    pub posted_at: DateTime<Utc>,
    pub like_count: i32,
    pub repost_count: i32,
    pub reply_count: i32,
    pub recency_score: f32,
    pub impact_score: f32,
    pub total_score: i32,
    pub discovery_type: String,
    pub status: String,
    pub discovered_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An opportunity joined with its author, for read-side detail views.
#[derive(Debug, Clone)]
pub struct OpportunityWithAuthor {
    pub opportunity: OpportunityRow,
    pub author: AuthorRow,
}

pub struct NewOpportunity<'a> {
    pub account_id: i64,
    pub post_id: &'a str,
    pub author_id: i64,
    pub content: &'a str,
    pub posted_at: DateTime<Utc>,
    pub like_count: i32,
    pub repost_count: i32,
    pub reply_count: i32,
    pub recency_score: f32,
    pub impact_score: f32,
    pub total_score: i32,
    pub discovery_type: &'a str,
    pub expires_at: DateTime<Utc>,
}

/// Status filter for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    All,
    Only(OpportunityStatus),
}

/// Sort order for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpportunitySort {
    /// Highest total score first.
    Score,
    /// Most recently discovered first.
    DiscoveredAt,
}

/// Filters for [`list_opportunities`].
#[derive(Debug, Clone, Copy)]
pub struct OpportunityFilter {
    pub account_id: Option<i64>,
    pub status: StatusFilter,
    pub sort: OpportunitySort,
    pub limit: i64,
    pub offset: i64,
}

impl Default for OpportunityFilter {
    fn default() -> Self {
        Self {
            account_id: None,
            status: StatusFilter::Only(OpportunityStatus::Pending),
            sort: OpportunitySort::Score,
            limit: 50,
            offset: 0,
        }
    }
}

/// Result of a bulk dismiss: how many rows were flipped, and which requested
/// ids were skipped (already terminal, unknown, or owned by another account).
#[derive(Debug, Clone)]
pub struct BulkDismissOutcome {
    pub dismissed: u64,
    pub skipped: Vec<Uuid>,
}

const OPPORTUNITY_COLUMNS: &str = "id, public_id, account_id, post_id, author_id, content, \
     posted_at, like_count, repost_count, reply_count, recency_score, impact_score, \
     total_score, discovery_type, status, discovered_at, expires_at, updated_at";

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Insert a newly discovered opportunity.
///
/// Returns `Ok(None)` if an opportunity with the same (`account_id`,
/// `post_id`) already exists — the losing writer of a concurrent duplicate
/// discovery sees "already there", never a constraint violation.
///
/// # Errors
///
/// Returns `DbError` on database query failure.
pub async fn insert_opportunity(
    pool: &PgPool,
    new: &NewOpportunity<'_>,
) -> Result<Option<OpportunityRow>, DbError> {
    let row = sqlx::query_as::<_, OpportunityRow>(&format!(
        "INSERT INTO opportunities \
           (account_id, post_id, author_id, content, posted_at, like_count, repost_count, \
            reply_count, recency_score, impact_score, total_score, discovery_type, expires_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
         ON CONFLICT (account_id, post_id) DO NOTHING \
         RETURNING {OPPORTUNITY_COLUMNS}"
    ))
    .bind(new.account_id)
    .bind(new.post_id)
    .bind(new.author_id)
    .bind(new.content)
    .bind(new.posted_at)
    .bind(new.like_count)
    .bind(new.repost_count)
    .bind(new.reply_count)
    .bind(new.recency_score)
    .bind(new.impact_score)
    .bind(new.total_score)
    .bind(new.discovery_type)
    .bind(new.expires_at)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Transition an opportunity out of `pending`.
///
/// The update is a compare-and-set on `status = 'pending'`, so a row that a
/// concurrent writer already moved to a terminal status is never overwritten.
/// Only terminal targets are accepted: a `pending → pending` write would be
/// a no-op that still bumps `updated_at`.
///
/// # Errors
///
/// - [`DbError::InvalidTargetStatus`] if `new_status` is not terminal.
/// - [`DbError::NotFound`] if no opportunity has this `public_id`.
/// - [`DbError::InvalidTransition`] if the row is already terminal.
/// - [`DbError::Sqlx`] on query failure.
pub async fn update_status(
    pool: &PgPool,
    public_id: Uuid,
    new_status: OpportunityStatus,
) -> Result<OpportunityRow, DbError> {
    if !new_status.is_terminal() {
        return Err(DbError::InvalidTargetStatus {
            target: new_status.as_str().to_string(),
        });
    }

    let updated = sqlx::query_as::<_, OpportunityRow>(&format!(
        "UPDATE opportunities SET status = $2, updated_at = NOW() \
         WHERE public_id = $1 AND status = 'pending' \
         RETURNING {OPPORTUNITY_COLUMNS}"
    ))
    .bind(public_id)
    .bind(new_status.as_str())
    .fetch_optional(pool)
    .await?;

    if let Some(row) = updated {
        return Ok(row);
    }

    // Zero rows: either the id is unknown or the row is already terminal.
    let current = sqlx::query_scalar::<_, String>(
        "SELECT status FROM opportunities WHERE public_id = $1",
    )
    .bind(public_id)
    .fetch_optional(pool)
    .await?;

    match current {
        Some(status) => Err(DbError::InvalidTransition { current: status }),
        None => Err(DbError::NotFound),
    }
}

/// Dismiss every listed opportunity that is still `pending` and belongs to
/// the given account.
///
/// Rows that are already terminal, unknown, or owned by a different account
/// are reported in `skipped`, not as errors.
///
/// # Errors
///
/// Returns `DbError` on database query failure.
pub async fn bulk_dismiss(
    pool: &PgPool,
    account_id: i64,
    public_ids: &[Uuid],
) -> Result<BulkDismissOutcome, DbError> {
    if public_ids.is_empty() {
        return Ok(BulkDismissOutcome {
            dismissed: 0,
            skipped: Vec::new(),
        });
    }

    let dismissed_ids = sqlx::query_scalar::<_, Uuid>(
        "UPDATE opportunities SET status = 'dismissed', updated_at = NOW() \
         WHERE public_id = ANY($1) AND account_id = $2 AND status = 'pending' \
         RETURNING public_id",
    )
    .bind(public_ids)
    .bind(account_id)
    .fetch_all(pool)
    .await?;

    let skipped = public_ids
        .iter()
        .filter(|id| !dismissed_ids.contains(id))
        .copied()
        .collect();

    Ok(BulkDismissOutcome {
        dismissed: dismissed_ids.len() as u64,
        skipped,
    })
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Filtered, sorted, paginated list of opportunities.
///
/// # Errors
///
/// Returns `DbError` on database query failure.
pub async fn list_opportunities(
    pool: &PgPool,
    filter: &OpportunityFilter,
) -> Result<Vec<OpportunityRow>, DbError> {
    let order_by = match filter.sort {
        OpportunitySort::Score => "total_score DESC, discovered_at DESC",
        OpportunitySort::DiscoveredAt => "discovered_at DESC",
    };
    let status = match filter.status {
        StatusFilter::All => None,
        StatusFilter::Only(s) => Some(s.as_str()),
    };

    let rows = sqlx::query_as::<_, OpportunityRow>(&format!(
        "SELECT {OPPORTUNITY_COLUMNS} FROM opportunities \
         WHERE ($1::BIGINT IS NULL OR account_id = $1) \
           AND ($2::TEXT IS NULL OR status = $2) \
         ORDER BY {order_by} LIMIT $3 OFFSET $4"
    ))
    .bind(filter.account_id)
    .bind(status)
    .bind(filter.limit)
    .bind(filter.offset)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Total row count for the same filter, for pagination metadata.
///
/// # Errors
///
/// Returns `DbError` on database query failure.
pub async fn count_opportunities(
    pool: &PgPool,
    filter: &OpportunityFilter,
) -> Result<i64, DbError> {
    let status = match filter.status {
        StatusFilter::All => None,
        StatusFilter::Only(s) => Some(s.as_str()),
    };

    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM opportunities \
         WHERE ($1::BIGINT IS NULL OR account_id = $1) \
           AND ($2::TEXT IS NULL OR status = $2)",
    )
    .bind(filter.account_id)
    .bind(status)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

/// Fetch one opportunity with its author.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the opportunity does not exist.
pub async fn get_opportunity_with_author(
    pool: &PgPool,
    public_id: Uuid,
) -> Result<OpportunityWithAuthor, DbError> {
    let opportunity = sqlx::query_as::<_, OpportunityRow>(&format!(
        "SELECT {OPPORTUNITY_COLUMNS} FROM opportunities WHERE public_id = $1"
    ))
    .bind(public_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    let author = sqlx::query_as::<_, AuthorRow>(
        "SELECT id, platform, platform_user_id, username, display_name, bio, \
                follower_count, last_updated_at \
         FROM authors WHERE id = $1",
    )
    .bind(opportunity.author_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(OpportunityWithAuthor {
        opportunity,
        author,
    })
}

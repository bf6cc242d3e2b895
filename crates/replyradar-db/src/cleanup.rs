//! Database operations backing the cleanup pass.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// Flip every `pending` opportunity whose `expires_at` has passed to
/// `expired`, bumping `updated_at`. Returns the number of rows expired.
///
/// The status predicate makes this a no-op for rows a concurrent writer
/// already moved out of `pending`.
///
/// # Errors
///
/// Returns `DbError` on database query failure.
pub async fn expire_overdue_pending(pool: &PgPool, now: DateTime<Utc>) -> Result<u64, DbError> {
    let result = sqlx::query(
        "UPDATE opportunities SET status = 'expired', updated_at = $1 \
         WHERE status = 'pending' AND expires_at <= $1",
    )
    .bind(now)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Internal ids of every `expired` opportunity.
///
/// # Errors
///
/// Returns `DbError` on database query failure.
pub async fn list_expired_ids(pool: &PgPool) -> Result<Vec<i64>, DbError> {
    Ok(
        sqlx::query_scalar::<_, i64>(
            "SELECT id FROM opportunities WHERE status = 'expired' ORDER BY id",
        )
        .fetch_all(pool)
        .await?,
    )
}

/// Internal ids of `dismissed` opportunities whose last status change is
/// older than the retention cutoff.
///
/// # Errors
///
/// Returns `DbError` on database query failure.
pub async fn list_deletable_dismissed_ids(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
) -> Result<Vec<i64>, DbError> {
    Ok(sqlx::query_scalar::<_, i64>(
        "SELECT id FROM opportunities \
         WHERE status = 'dismissed' AND updated_at < $1 ORDER BY id",
    )
    .bind(cutoff)
    .fetch_all(pool)
    .await?)
}

/// Delete one opportunity and the responses referencing it.
///
/// Children first, so a crash between the two statements leaves an
/// opportunity with no responses (harmless, retried next pass) rather than
/// orphaned responses. Returns the number of responses deleted.
///
/// `responded` rows are refused outright; cleanup never deletes them and no
/// other caller should either.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the opportunity does not exist, or
/// [`DbError::Sqlx`] on query failure.
pub async fn delete_opportunity_cascade(pool: &PgPool, opportunity_id: i64) -> Result<u64, DbError> {
    let mut tx = pool.begin().await?;

    let responses_deleted = sqlx::query("DELETE FROM responses WHERE opportunity_id = $1")
        .bind(opportunity_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let result = sqlx::query("DELETE FROM opportunities WHERE id = $1 AND status <> 'responded'")
        .bind(opportunity_id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        tx.rollback().await?;
        return Err(DbError::NotFound);
    }

    tx.commit().await?;
    Ok(responses_deleted)
}

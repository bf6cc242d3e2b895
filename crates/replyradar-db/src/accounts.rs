//! Database operations for `accounts` and `account_schedules`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `accounts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AccountRow {
    pub id: i64,
    pub public_id: Uuid,
    pub platform: String,
    pub handle: String,
    pub display_name: Option<String>,
    pub keywords: Vec<String>,
    pub is_paused: bool,
    /// `active` or `error`; `error` accounts are skipped at job registration.
    pub status: String,
    pub discovery_last_at: Option<DateTime<Utc>>,
    pub discovery_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A row from the `account_schedules` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScheduleRow {
    pub id: i64,
    pub account_id: i64,
    pub discovery_type: String,
    pub enabled: bool,
    pub schedule: String,
    pub last_run_at: Option<DateTime<Utc>>,
}

/// An account together with all of its discovery schedules.
#[derive(Debug, Clone)]
pub struct AccountWithSchedules {
    pub account: AccountRow,
    pub schedules: Vec<ScheduleRow>,
}

const ACCOUNT_COLUMNS: &str = "id, public_id, platform, handle, display_name, keywords, \
     is_paused, status, discovery_last_at, discovery_error, created_at";

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Fetch an account by internal id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no such account exists.
pub async fn get_account(pool: &PgPool, account_id: i64) -> Result<AccountRow, DbError> {
    sqlx::query_as::<_, AccountRow>(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
    ))
    .bind(account_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Fetch an account by its API-visible UUID.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no such account exists.
pub async fn get_account_by_public_id(pool: &PgPool, public_id: Uuid) -> Result<AccountRow, DbError> {
    sqlx::query_as::<_, AccountRow>(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE public_id = $1"
    ))
    .bind(public_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Fetch one account's schedule row for a discovery type.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the account has no schedule of that type.
pub async fn get_schedule(
    pool: &PgPool,
    account_id: i64,
    discovery_type: &str,
) -> Result<ScheduleRow, DbError> {
    sqlx::query_as::<_, ScheduleRow>(
        "SELECT id, account_id, discovery_type, enabled, schedule, last_run_at \
         FROM account_schedules WHERE account_id = $1 AND discovery_type = $2",
    )
    .bind(account_id)
    .bind(discovery_type)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// All accounts with their schedules, for scheduler registration.
///
/// Returns every account; paused/error filtering is the scheduler's policy,
/// not the query's.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn list_accounts_with_schedules(pool: &PgPool) -> Result<Vec<AccountWithSchedules>, DbError> {
    let accounts = sqlx::query_as::<_, AccountRow>(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY id"
    ))
    .fetch_all(pool)
    .await?;

    let schedules = sqlx::query_as::<_, ScheduleRow>(
        "SELECT id, account_id, discovery_type, enabled, schedule, last_run_at \
         FROM account_schedules ORDER BY account_id, discovery_type",
    )
    .fetch_all(pool)
    .await?;

    let mut result: Vec<AccountWithSchedules> = accounts
        .into_iter()
        .map(|account| AccountWithSchedules {
            account,
            schedules: Vec::new(),
        })
        .collect();

    for schedule in schedules {
        if let Some(entry) = result
            .iter_mut()
            .find(|e| e.account.id == schedule.account_id)
        {
            entry.schedules.push(schedule);
        }
    }

    Ok(result)
}

// ---------------------------------------------------------------------------
// Discovery run bookkeeping
// ---------------------------------------------------------------------------

/// Record a successful discovery run in one pass: advance the schedule
/// cursor, stamp the account-level last-success time, and clear any error.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn mark_discovery_success(
    pool: &PgPool,
    account_id: i64,
    discovery_type: &str,
    ran_at: DateTime<Utc>,
) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        "UPDATE account_schedules SET last_run_at = $3 \
         WHERE account_id = $1 AND discovery_type = $2",
    )
    .bind(account_id)
    .bind(discovery_type)
    .bind(ran_at)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE accounts SET discovery_last_at = $2, discovery_error = NULL WHERE id = $1",
    )
    .bind(account_id)
    .bind(ran_at)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Record a failed discovery run.
///
/// The schedule cursor is deliberately left alone so the next run retries
/// the same window.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn record_discovery_error(
    pool: &PgPool,
    account_id: i64,
    message: &str,
) -> Result<(), DbError> {
    sqlx::query("UPDATE accounts SET discovery_error = $2 WHERE id = $1")
        .bind(account_id)
        .bind(message)
        .execute(pool)
        .await?;
    Ok(())
}

/// Enable or disable one discovery schedule.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the schedule does not exist.
pub async fn set_schedule_enabled(
    pool: &PgPool,
    account_id: i64,
    discovery_type: &str,
    enabled: bool,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE account_schedules SET enabled = $3 \
         WHERE account_id = $1 AND discovery_type = $2",
    )
    .bind(account_id)
    .bind(discovery_type)
    .bind(enabled)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

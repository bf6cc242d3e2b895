//! Database operations for `authors`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `authors` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuthorRow {
    pub id: i64,
    pub platform: String,
    pub platform_user_id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub follower_count: i32,
    pub last_updated_at: DateTime<Utc>,
}

pub struct NewAuthor<'a> {
    pub platform: &'a str,
    pub platform_user_id: &'a str,
    pub username: &'a str,
    pub display_name: Option<&'a str>,
    pub bio: Option<&'a str>,
    pub follower_count: i32,
}

/// Create or refresh an author. Returns the internal ID.
///
/// Dedup key: (`platform`, `platform_user_id`) — one row per platform user.
/// Every discovery run refreshes the profile fields so engagement scoring
/// always sees the latest follower count.
///
/// # Errors
///
/// Returns `DbError` on database query failure.
pub async fn upsert_author(pool: &PgPool, author: &NewAuthor<'_>) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO authors \
           (platform, platform_user_id, username, display_name, bio, follower_count) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (platform, platform_user_id) DO UPDATE SET \
           username = EXCLUDED.username, \
           display_name = EXCLUDED.display_name, \
           bio = EXCLUDED.bio, \
           follower_count = EXCLUDED.follower_count, \
           last_updated_at = NOW() \
         RETURNING id",
    )
    .bind(author.platform)
    .bind(author.platform_user_id)
    .bind(author.username)
    .bind(author.display_name)
    .bind(author.bio)
    .bind(author.follower_count.max(0))
    .fetch_one(pool)
    .await?;
    Ok(id)
}

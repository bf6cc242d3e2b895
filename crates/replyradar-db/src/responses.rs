//! Database operations for `responses`.
//!
//! Responses are written by the response-generation pipeline outside this
//! workspace; the engine only reads them for cascades and inserts them in
//! tests.

use sqlx::PgPool;

use crate::DbError;

/// Insert a response for an opportunity. Returns the new row id.
///
/// # Errors
///
/// Returns `DbError` on database query failure.
pub async fn insert_response(
    pool: &PgPool,
    opportunity_id: i64,
    content: &str,
) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO responses (opportunity_id, content) VALUES ($1, $2) RETURNING id",
    )
    .bind(opportunity_id)
    .bind(content)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

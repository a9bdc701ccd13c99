//! Database operations for the `ambassadors` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `ambassadors` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AmbassadorRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Creates a new ambassador, generating its UUID in Rust.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including a duplicate
/// email, which violates the unique constraint).
pub async fn create_ambassador(
    pool: &PgPool,
    name: &str,
    email: &str,
) -> Result<AmbassadorRow, DbError> {
    let id = Uuid::new_v4();

    let row = sqlx::query_as::<_, AmbassadorRow>(
        "INSERT INTO ambassadors (id, name, email) \
         VALUES ($1, $2, $3) \
         RETURNING id, name, email, created_at",
    )
    .bind(id)
    .bind(name)
    .bind(email)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Fetches a single ambassador by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_ambassador<'e, E: sqlx::PgExecutor<'e>>(
    exec: E,
    id: Uuid,
) -> Result<AmbassadorRow, DbError> {
    let row = sqlx::query_as::<_, AmbassadorRow>(
        "SELECT id, name, email, created_at FROM ambassadors WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(exec)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Returns all ambassadors ordered by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_ambassadors(pool: &PgPool) -> Result<Vec<AmbassadorRow>, DbError> {
    let rows = sqlx::query_as::<_, AmbassadorRow>(
        "SELECT id, name, email, created_at FROM ambassadors ORDER BY name, id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Total number of registered ambassadors.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_ambassadors(pool: &PgPool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM ambassadors")
        .fetch_one(pool)
        .await?;

    Ok(count)
}

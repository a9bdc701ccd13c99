//! Database operations for the `indications` table.

use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::DbError;

/// A row from the `indications` table.
///
/// `status` holds the raw database string; the engine parses it into
/// [`amber_core::IndicationStatus`] at the boundary.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct IndicationRow {
    pub id: Uuid,
    pub ambassador_id: Uuid,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: String,
    pub origin: String,
    pub segment: String,
    pub status: String,
    pub converted: bool,
    pub approval_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const INDICATION_COLUMNS: &str = "id, ambassador_id, client_name, client_email, client_phone, \
     origin, segment, status, converted, approval_date, created_at, updated_at";

/// Fields for a new indication. Status always starts as `scheduled`.
#[derive(Debug, Clone)]
pub struct NewIndication {
    pub ambassador_id: Uuid,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: String,
    pub origin: String,
    pub segment: String,
}

/// Optional descriptive-field updates; `None` leaves a column untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateIndication {
    pub client_name: Option<String>,
    pub client_email: Option<String>,
    pub client_phone: Option<String>,
    pub origin: Option<String>,
    pub segment: Option<String>,
    pub converted: Option<bool>,
}

/// Input filters for indication listing.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndicationFilters<'a> {
    pub ambassador_id: Option<Uuid>,
    pub status: Option<&'a str>,
}

/// Creates a new indication in `scheduled` status, generating its UUID in
/// Rust. Returns the full newly-created row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including an unknown
/// `ambassador_id`, which violates the foreign key).
pub async fn create_indication(
    pool: &PgPool,
    new: &NewIndication,
) -> Result<IndicationRow, DbError> {
    let id = Uuid::new_v4();

    let row = sqlx::query_as::<_, IndicationRow>(&format!(
        "INSERT INTO indications \
             (id, ambassador_id, client_name, client_email, client_phone, origin, segment) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING {INDICATION_COLUMNS}"
    ))
    .bind(id)
    .bind(new.ambassador_id)
    .bind(&new.client_name)
    .bind(&new.client_email)
    .bind(&new.client_phone)
    .bind(&new.origin)
    .bind(&new.segment)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Fetches a single indication by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_indication<'e, E: PgExecutor<'e>>(
    exec: E,
    id: Uuid,
) -> Result<IndicationRow, DbError> {
    let row = sqlx::query_as::<_, IndicationRow>(&format!(
        "SELECT {INDICATION_COLUMNS} FROM indications WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(exec)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Returns indications matching the filters, most recent first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_indications(
    pool: &PgPool,
    filters: IndicationFilters<'_>,
) -> Result<Vec<IndicationRow>, DbError> {
    let rows = sqlx::query_as::<_, IndicationRow>(&format!(
        "SELECT {INDICATION_COLUMNS} \
         FROM indications \
         WHERE ($1::UUID IS NULL OR ambassador_id = $1) \
           AND ($2::TEXT IS NULL OR status = $2) \
         ORDER BY created_at DESC, id"
    ))
    .bind(filters.ambassador_id)
    .bind(filters.status)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Sets the indication status and approval date in one statement.
///
/// The table CHECK constraint ties `approval_date IS NOT NULL` to
/// `status = 'approved'`, so callers must pass a date exactly when
/// approving.
///
/// Takes any executor so the lifecycle manager can run it inside the same
/// transaction as installment generation.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn set_indication_status<'e, E: PgExecutor<'e>>(
    exec: E,
    id: Uuid,
    status: &str,
    approval_date: Option<DateTime<Utc>>,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE indications \
         SET status = $1, approval_date = $2, updated_at = NOW() \
         WHERE id = $3",
    )
    .bind(status)
    .bind(approval_date)
    .bind(id)
    .execute(exec)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

/// Applies descriptive-field updates, leaving unset fields as they are.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_indication_fields(
    pool: &PgPool,
    id: Uuid,
    update: &UpdateIndication,
) -> Result<IndicationRow, DbError> {
    let row = sqlx::query_as::<_, IndicationRow>(&format!(
        "UPDATE indications SET \
             client_name  = COALESCE($1, client_name), \
             client_email = COALESCE($2, client_email), \
             client_phone = COALESCE($3, client_phone), \
             origin       = COALESCE($4, origin), \
             segment      = COALESCE($5, segment), \
             converted    = COALESCE($6, converted), \
             updated_at   = NOW() \
         WHERE id = $7 \
         RETURNING {INDICATION_COLUMNS}"
    ))
    .bind(update.client_name.as_deref())
    .bind(update.client_email.as_deref())
    .bind(update.client_phone.as_deref())
    .bind(update.origin.as_deref())
    .bind(update.segment.as_deref())
    .bind(update.converted)
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Deletes an indication. Installment rows go with it via `ON DELETE
/// CASCADE`; callers run reconciliation first so the removal is logged.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the delete fails.
pub async fn delete_indication<'e, E: PgExecutor<'e>>(exec: E, id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM indications WHERE id = $1")
        .bind(id)
        .execute(exec)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

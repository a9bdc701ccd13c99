//! Database operations for the `commission_installments` table.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::DbError;

/// A row from the `commission_installments` table.
///
/// Ambassador and client names are denormalized onto the row so reporting
/// never needs a join back to the owning indication.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InstallmentRow {
    pub id: Uuid,
    pub indication_id: Uuid,
    pub ambassador_id: Uuid,
    pub ambassador_name: String,
    pub client_name: String,
    pub installment_number: i32,
    pub value: Decimal,
    pub due_date: DateTime<Utc>,
    pub status: String,
    pub payment_date: Option<DateTime<Utc>>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const INSTALLMENT_COLUMNS: &str = "id, indication_id, ambassador_id, ambassador_name, \
     client_name, installment_number, value, due_date, status, payment_date, notes, \
     created_at, updated_at";

/// Fields for a new installment row, created in `pending` status.
#[derive(Debug, Clone)]
pub struct NewInstallment {
    pub indication_id: Uuid,
    pub ambassador_id: Uuid,
    pub ambassador_name: String,
    pub client_name: String,
    pub installment_number: i32,
    pub value: Decimal,
    pub due_date: DateTime<Utc>,
}

/// Input filters for installment listing.
///
/// `month`/`year` filter on the due date's calendar month and year (UTC).
#[derive(Debug, Clone, Copy, Default)]
pub struct InstallmentFilters<'a> {
    pub status: Option<&'a str>,
    pub ambassador_id: Option<Uuid>,
    pub month: Option<i32>,
    pub year: Option<i32>,
}

/// Counts and value sums per installment status. Cancelled rows are
/// excluded from every figure, including the totals.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InstallmentSummaryRow {
    pub total_installments: i64,
    pub total_value: Decimal,
    pub paid_installments: i64,
    pub paid_value: Decimal,
    pub pending_installments: i64,
    pub pending_value: Decimal,
    pub overdue_installments: i64,
    pub overdue_value: Decimal,
}

/// Inserts a single installment row, skipping it when a live (non-cancelled)
/// row already occupies the same `(indication_id, installment_number)` slot.
///
/// Returns the new row's id, or `None` when the slot was already taken.
/// Takes any executor so the generator can batch the three inserts inside
/// one transaction.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_installment<'e, E: PgExecutor<'e>>(
    exec: E,
    new: &NewInstallment,
) -> Result<Option<Uuid>, DbError> {
    let id = Uuid::new_v4();

    let inserted = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO commission_installments \
             (id, indication_id, ambassador_id, ambassador_name, client_name, \
              installment_number, value, due_date) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         ON CONFLICT (indication_id, installment_number) WHERE status <> 'cancelled' \
             DO NOTHING \
         RETURNING id",
    )
    .bind(id)
    .bind(new.indication_id)
    .bind(new.ambassador_id)
    .bind(&new.ambassador_name)
    .bind(&new.client_name)
    .bind(new.installment_number)
    .bind(new.value)
    .bind(new.due_date)
    .fetch_optional(exec)
    .await?;

    Ok(inserted)
}

/// Installment numbers of an indication's live (non-cancelled) rows.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_live_numbers<'e, E: PgExecutor<'e>>(
    exec: E,
    indication_id: Uuid,
) -> Result<Vec<i32>, DbError> {
    let numbers = sqlx::query_scalar::<_, i32>(
        "SELECT installment_number \
         FROM commission_installments \
         WHERE indication_id = $1 AND status <> 'cancelled' \
         ORDER BY installment_number",
    )
    .bind(indication_id)
    .fetch_all(exec)
    .await?;

    Ok(numbers)
}

/// Fetches a single installment by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_installment(pool: &PgPool, id: Uuid) -> Result<InstallmentRow, DbError> {
    let row = sqlx::query_as::<_, InstallmentRow>(&format!(
        "SELECT {INSTALLMENT_COLUMNS} FROM commission_installments WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Returns installments matching the filters, ordered by due date.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_installments(
    pool: &PgPool,
    filters: InstallmentFilters<'_>,
) -> Result<Vec<InstallmentRow>, DbError> {
    let rows = sqlx::query_as::<_, InstallmentRow>(&format!(
        "SELECT {INSTALLMENT_COLUMNS} \
         FROM commission_installments \
         WHERE ($1::TEXT IS NULL OR status = $1) \
           AND ($2::UUID IS NULL OR ambassador_id = $2) \
           AND ($3::INT IS NULL \
                OR EXTRACT(MONTH FROM due_date AT TIME ZONE 'UTC')::INT = $3) \
           AND ($4::INT IS NULL \
                OR EXTRACT(YEAR FROM due_date AT TIME ZONE 'UTC')::INT = $4) \
         ORDER BY due_date, installment_number, id"
    ))
    .bind(filters.status)
    .bind(filters.ambassador_id)
    .bind(filters.month)
    .bind(filters.year)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// All `pending` installments whose due date has passed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_pending_due_before(
    pool: &PgPool,
    now: DateTime<Utc>,
) -> Result<Vec<InstallmentRow>, DbError> {
    let rows = sqlx::query_as::<_, InstallmentRow>(&format!(
        "SELECT {INSTALLMENT_COLUMNS} \
         FROM commission_installments \
         WHERE status = 'pending' AND due_date < $1 \
         ORDER BY due_date, id"
    ))
    .bind(now)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Transitions one installment from `pending` to `overdue`.
///
/// Returns `false` when the row was no longer pending (already paid,
/// overdue, or cancelled by a concurrent operation); the scanner treats
/// that as "nothing to do".
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn mark_installment_overdue(pool: &PgPool, id: Uuid) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE commission_installments \
         SET status = 'overdue', updated_at = NOW() \
         WHERE id = $1 AND status = 'pending'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Sets an installment's status, payment date, and (optionally) notes.
///
/// `payment_date` is written as given — `None` clears it. `notes = None`
/// keeps the existing text. Returns the updated row.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_installment_status(
    pool: &PgPool,
    id: Uuid,
    status: &str,
    payment_date: Option<DateTime<Utc>>,
    notes: Option<&str>,
) -> Result<InstallmentRow, DbError> {
    let row = sqlx::query_as::<_, InstallmentRow>(&format!(
        "UPDATE commission_installments \
         SET status = $1, payment_date = $2, notes = COALESCE($3, notes), updated_at = NOW() \
         WHERE id = $4 \
         RETURNING {INSTALLMENT_COLUMNS}"
    ))
    .bind(status)
    .bind(payment_date)
    .bind(notes)
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Soft-cancels every unpaid (pending or overdue) installment of an
/// indication. Paid rows are never touched. Returns how many rows were
/// cancelled.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn cancel_unpaid_installments<'e, E: PgExecutor<'e>>(
    exec: E,
    indication_id: Uuid,
) -> Result<u64, DbError> {
    let result = sqlx::query(
        "UPDATE commission_installments \
         SET status = 'cancelled', updated_at = NOW() \
         WHERE indication_id = $1 AND status IN ('pending', 'overdue')",
    )
    .bind(indication_id)
    .execute(exec)
    .await?;

    Ok(result.rows_affected())
}

/// Aggregates installment counts and value sums, optionally scoped to one
/// ambassador. Cancelled rows are excluded from all figures.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn summarize_installments(
    pool: &PgPool,
    ambassador_id: Option<Uuid>,
) -> Result<InstallmentSummaryRow, DbError> {
    let row = sqlx::query_as::<_, InstallmentSummaryRow>(
        "SELECT \
             COUNT(*) FILTER (WHERE status <> 'cancelled')                    AS total_installments, \
             COALESCE(SUM(value) FILTER (WHERE status <> 'cancelled'), 0)     AS total_value, \
             COUNT(*) FILTER (WHERE status = 'paid')                          AS paid_installments, \
             COALESCE(SUM(value) FILTER (WHERE status = 'paid'), 0)           AS paid_value, \
             COUNT(*) FILTER (WHERE status = 'pending')                       AS pending_installments, \
             COALESCE(SUM(value) FILTER (WHERE status = 'pending'), 0)        AS pending_value, \
             COUNT(*) FILTER (WHERE status = 'overdue')                       AS overdue_installments, \
             COALESCE(SUM(value) FILTER (WHERE status = 'overdue'), 0)        AS overdue_value \
         FROM commission_installments \
         WHERE ($1::UUID IS NULL OR ambassador_id = $1)",
    )
    .bind(ambassador_id)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

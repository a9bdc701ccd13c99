//! Read-model queries used by the dashboard endpoints.
//!
//! Month buckets are keyed by `YYYY-MM` strings derived from the UTC
//! timestamp, so series never aggregate the same month across different
//! years.

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// Indication totals for approval-rate style figures.
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct IndicationCountsRow {
    pub total: i64,
    pub approved: i64,
    pub converted: i64,
}

/// Indications created in one calendar month.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MonthlyCountRow {
    /// `YYYY-MM` bucket label.
    pub month: String,
    pub count: i64,
}

/// Installment value falling due in one calendar month.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MonthlyValueRow {
    /// `YYYY-MM` bucket label.
    pub month: String,
    pub total_value: Decimal,
}

/// Leaderboard row: indication volume per ambassador.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TopAmbassadorRow {
    pub ambassador_id: Uuid,
    pub name: String,
    pub indication_count: i64,
}

/// Conversion figures per client segment.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SegmentConversionRow {
    pub segment: String,
    pub total: i64,
    pub converted: i64,
}

/// Total / approved / converted indication counts, optionally scoped to one
/// ambassador.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_indications_by_status(
    pool: &PgPool,
    ambassador_id: Option<Uuid>,
) -> Result<IndicationCountsRow, DbError> {
    let row = sqlx::query_as::<_, IndicationCountsRow>(
        "SELECT \
             COUNT(*)                                      AS total, \
             COUNT(*) FILTER (WHERE status = 'approved')   AS approved, \
             COUNT(*) FILTER (WHERE converted)             AS converted \
         FROM indications \
         WHERE ($1::UUID IS NULL OR ambassador_id = $1)",
    )
    .bind(ambassador_id)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Indication counts per calendar month over the trailing window.
///
/// Months with no indications are absent from the result; the aggregator
/// fills the gaps with zeros.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn monthly_indication_counts(
    pool: &PgPool,
    ambassador_id: Option<Uuid>,
    trailing_months: i32,
) -> Result<Vec<MonthlyCountRow>, DbError> {
    let rows = sqlx::query_as::<_, MonthlyCountRow>(
        "SELECT \
             to_char(date_trunc('month', created_at AT TIME ZONE 'UTC'), 'YYYY-MM') AS month, \
             COUNT(*) AS count \
         FROM indications \
         WHERE ($1::UUID IS NULL OR ambassador_id = $1) \
           AND created_at >= date_trunc('month', NOW() AT TIME ZONE 'UTC') AT TIME ZONE 'UTC' \
                             - make_interval(months => $2 - 1) \
         GROUP BY 1 \
         ORDER BY 1",
    )
    .bind(ambassador_id)
    .bind(trailing_months)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Non-cancelled installment value falling due per calendar month over the
/// trailing window.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn monthly_installment_values(
    pool: &PgPool,
    ambassador_id: Option<Uuid>,
    trailing_months: i32,
) -> Result<Vec<MonthlyValueRow>, DbError> {
    let rows = sqlx::query_as::<_, MonthlyValueRow>(
        "SELECT \
             to_char(date_trunc('month', due_date AT TIME ZONE 'UTC'), 'YYYY-MM') AS month, \
             COALESCE(SUM(value), 0) AS total_value \
         FROM commission_installments \
         WHERE status <> 'cancelled' \
           AND ($1::UUID IS NULL OR ambassador_id = $1) \
           AND due_date >= date_trunc('month', NOW() AT TIME ZONE 'UTC') AT TIME ZONE 'UTC' \
                           - make_interval(months => $2 - 1) \
         GROUP BY 1 \
         ORDER BY 1",
    )
    .bind(ambassador_id)
    .bind(trailing_months)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Ambassadors with at least one indication created inside the trailing
/// window.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_active_ambassadors(pool: &PgPool, window_days: i64) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(DISTINCT ambassador_id) \
         FROM indications \
         WHERE created_at >= NOW() - make_interval(days => $1::INT)",
    )
    .bind(window_days)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Ambassadors ranked by indication count, descending. Ties break on the
/// ambassador id so the ordering is deterministic.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn top_ambassadors(pool: &PgPool, limit: i64) -> Result<Vec<TopAmbassadorRow>, DbError> {
    let rows = sqlx::query_as::<_, TopAmbassadorRow>(
        "SELECT a.id AS ambassador_id, a.name, COUNT(i.id) AS indication_count \
         FROM ambassadors a \
         LEFT JOIN indications i ON i.ambassador_id = a.id \
         GROUP BY a.id, a.name \
         ORDER BY indication_count DESC, a.id \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Total and converted indication counts per client segment.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn segment_conversion(
    pool: &PgPool,
    ambassador_id: Option<Uuid>,
) -> Result<Vec<SegmentConversionRow>, DbError> {
    let rows = sqlx::query_as::<_, SegmentConversionRow>(
        "SELECT segment, COUNT(*) AS total, COUNT(*) FILTER (WHERE converted) AS converted \
         FROM indications \
         WHERE ($1::UUID IS NULL OR ambassador_id = $1) \
         GROUP BY segment \
         ORDER BY segment",
    )
    .bind(ambassador_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

//! Read-only dashboard statistics over indications and installments.

use amber_db::InstallmentSummaryRow;
use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::EngineError;

/// Whose numbers a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportScope {
    /// Every ambassador (admin dashboard).
    All,
    /// One ambassador's own view.
    Ambassador(Uuid),
}

impl ReportScope {
    fn ambassador_id(self) -> Option<Uuid> {
        match self {
            ReportScope::All => None,
            ReportScope::Ambassador(id) => Some(id),
        }
    }
}

/// Tuning knobs for the aggregator, sourced from [`amber_core::AppConfig`].
#[derive(Debug, Clone, Copy)]
pub struct ReportOptions {
    pub trailing_months: u32,
    pub active_window_days: i64,
    pub top_limit: i64,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            trailing_months: 6,
            active_window_days: 60,
            top_limit: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyIndications {
    /// `YYYY-MM` bucket label.
    pub month: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyCommission {
    /// `YYYY-MM` bucket label.
    pub month: String,
    pub total_value: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopAmbassador {
    pub ambassador_id: Uuid,
    pub name: String,
    pub indication_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SegmentConversion {
    pub segment: String,
    pub total: i64,
    pub converted: i64,
    pub conversion_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActiveAmbassadorStats {
    pub active: i64,
    pub total: i64,
    pub active_percentage: f64,
}

/// Installment counts and value sums per status. Cancelled rows are
/// excluded everywhere.
#[derive(Debug, Clone, Serialize)]
pub struct CommissionSummary {
    pub total_installments: i64,
    pub total_value: Decimal,
    pub paid_installments: i64,
    pub paid_value: Decimal,
    pub pending_installments: i64,
    pub pending_value: Decimal,
    pub overdue_installments: i64,
    pub overdue_value: Decimal,
}

impl From<InstallmentSummaryRow> for CommissionSummary {
    fn from(row: InstallmentSummaryRow) -> Self {
        Self {
            total_installments: row.total_installments,
            total_value: row.total_value,
            paid_installments: row.paid_installments,
            paid_value: row.paid_value,
            pending_installments: row.pending_installments,
            pending_value: row.pending_value,
            overdue_installments: row.overdue_installments,
            overdue_value: row.overdue_value,
        }
    }
}

/// The full dashboard payload.
///
/// `active_ambassadors` and `top_ambassadors` are population-wide figures
/// and only present for [`ReportScope::All`].
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub total_indications: i64,
    pub approved_indications: i64,
    pub approval_rate: f64,
    pub converted_indications: i64,
    pub conversion_rate: f64,
    pub monthly_indications: Vec<MonthlyIndications>,
    pub monthly_commission: Vec<MonthlyCommission>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_ambassadors: Option<ActiveAmbassadorStats>,
    pub top_ambassadors: Vec<TopAmbassador>,
    pub segment_conversion: Vec<SegmentConversion>,
    pub installments: CommissionSummary,
}

/// Read-only aggregation over the indication and installment stores.
#[derive(Debug, Clone)]
pub struct ReportAggregator {
    pool: PgPool,
    options: ReportOptions,
}

impl ReportAggregator {
    #[must_use]
    pub fn new(pool: PgPool, options: ReportOptions) -> Self {
        Self { pool, options }
    }

    /// Computes the dashboard statistics for the given scope.
    ///
    /// Every rate is defined as 0 when its denominator is 0.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Storage`] if any underlying query fails.
    pub async fn dashboard_stats(&self, scope: ReportScope) -> Result<DashboardStats, EngineError> {
        let ambassador_id = scope.ambassador_id();
        let months = i32::try_from(self.options.trailing_months).unwrap_or(6);

        let counts = amber_db::count_indications_by_status(&self.pool, ambassador_id).await?;
        let monthly_counts =
            amber_db::monthly_indication_counts(&self.pool, ambassador_id, months).await?;
        let monthly_values =
            amber_db::monthly_installment_values(&self.pool, ambassador_id, months).await?;
        let segments = amber_db::segment_conversion(&self.pool, ambassador_id).await?;
        let installments = amber_db::summarize_installments(&self.pool, ambassador_id).await?;

        let (active_ambassadors, top_ambassadors) = match scope {
            ReportScope::All => {
                let total = amber_db::count_ambassadors(&self.pool).await?;
                let active = amber_db::count_active_ambassadors(
                    &self.pool,
                    self.options.active_window_days,
                )
                .await?;
                let top = amber_db::top_ambassadors(&self.pool, self.options.top_limit).await?;

                (
                    Some(ActiveAmbassadorStats {
                        active,
                        total,
                        active_percentage: percentage(active, total),
                    }),
                    top.into_iter()
                        .map(|row| TopAmbassador {
                            ambassador_id: row.ambassador_id,
                            name: row.name,
                            indication_count: row.indication_count,
                        })
                        .collect(),
                )
            }
            ReportScope::Ambassador(_) => (None, Vec::new()),
        };

        let labels = trailing_month_labels(Utc::now(), self.options.trailing_months);
        let monthly_indications = labels
            .iter()
            .map(|label| MonthlyIndications {
                month: label.clone(),
                count: monthly_counts
                    .iter()
                    .find(|r| &r.month == label)
                    .map_or(0, |r| r.count),
            })
            .collect();
        let monthly_commission = labels
            .iter()
            .map(|label| MonthlyCommission {
                month: label.clone(),
                total_value: monthly_values
                    .iter()
                    .find(|r| &r.month == label)
                    .map_or(Decimal::ZERO, |r| r.total_value),
            })
            .collect();

        Ok(DashboardStats {
            total_indications: counts.total,
            approved_indications: counts.approved,
            approval_rate: percentage(counts.approved, counts.total),
            converted_indications: counts.converted,
            conversion_rate: percentage(counts.converted, counts.total),
            monthly_indications,
            monthly_commission,
            active_ambassadors,
            top_ambassadors,
            segment_conversion: segments
                .into_iter()
                .map(|row| SegmentConversion {
                    conversion_rate: percentage(row.converted, row.total),
                    segment: row.segment,
                    total: row.total,
                    converted: row.converted,
                })
                .collect(),
            installments: installments.into(),
        })
    }

    /// Commission totals per status for the summary endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Storage`] if the query fails.
    pub async fn commission_summary(
        &self,
        scope: ReportScope,
    ) -> Result<CommissionSummary, EngineError> {
        let row = amber_db::summarize_installments(&self.pool, scope.ambassador_id()).await?;
        Ok(row.into())
    }
}

/// `part / total * 100`, defined as 0 when `total` is 0.
#[allow(clippy::cast_precision_loss)]
fn percentage(part: i64, total: i64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// The `YYYY-MM` labels of the `n` calendar months ending at `now`'s
/// month, oldest first.
fn trailing_month_labels(now: DateTime<Utc>, n: u32) -> Vec<String> {
    let mut year = now.year();
    // 0-based for the arithmetic below.
    let mut month = i32::try_from(now.month0()).expect("month0 fits i32");

    let mut labels = Vec::with_capacity(n as usize);
    for _ in 0..n {
        labels.push(format!("{year:04}-{:02}", month + 1));
        month -= 1;
        if month < 0 {
            month = 11;
            year -= 1;
        }
    }
    labels.reverse();
    labels
}

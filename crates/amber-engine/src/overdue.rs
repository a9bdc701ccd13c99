//! Batch detection of overdue installments.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::EngineError;

/// Result of one overdue scan.
#[derive(Debug, Default)]
pub struct OverdueScanOutcome {
    /// Installments transitioned to `overdue` in this run.
    pub transitioned: Vec<Uuid>,
    /// Individual record updates that failed and were skipped.
    pub failed: usize,
}

/// Marks pending installments whose due date has passed as `overdue`.
///
/// Runs as a scheduled background job and on demand through the API. The
/// scan is idempotent: paid, cancelled, and already-overdue rows are never
/// touched, and a second run with the same clock does nothing.
#[derive(Debug, Clone)]
pub struct OverdueScanner {
    pool: PgPool,
}

impl OverdueScanner {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Scans with the current wall clock.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Storage`] only if the initial listing query
    /// fails; individual update failures are logged, counted, and skipped.
    pub async fn scan(&self) -> Result<OverdueScanOutcome, EngineError> {
        self.scan_at(Utc::now()).await
    }

    /// Scans against an explicit `now`, for deterministic tests and
    /// backfills.
    ///
    /// Each installment is updated independently; a failure on one record
    /// does not abort the rest of the scan.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Storage`] only if the initial listing query
    /// fails.
    pub async fn scan_at(&self, now: DateTime<Utc>) -> Result<OverdueScanOutcome, EngineError> {
        let due = amber_db::list_pending_due_before(&self.pool, now).await?;

        let mut outcome = OverdueScanOutcome::default();
        for installment in &due {
            match amber_db::mark_installment_overdue(&self.pool, installment.id).await {
                // false: a concurrent update already moved the row on;
                // nothing to count.
                Ok(true) => outcome.transitioned.push(installment.id),
                Ok(false) => {}
                Err(e) => {
                    outcome.failed += 1;
                    tracing::warn!(
                        installment_id = %installment.id,
                        error = %e,
                        "overdue scan: failed to transition installment; skipping"
                    );
                }
            }
        }

        tracing::info!(
            scanned = due.len(),
            transitioned = outcome.transitioned.len(),
            failed = outcome.failed,
            "overdue scan complete"
        );
        Ok(outcome)
    }
}

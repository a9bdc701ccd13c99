//! Reconciliation: withdrawing the installments of a reversed approval.

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{map_not_found, EngineError};

/// Cancels the unpaid installments of an indication.
///
/// Cancellation is a soft delete: rows flip to `cancelled` and stay in the
/// table, excluded from every sum and from the live-slot uniqueness guard.
/// Paid installments are never touched, preserving payment history.
#[derive(Debug, Clone)]
pub struct ReconciliationService {
    pool: PgPool,
}

impl ReconciliationService {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Cancels all `pending` and `overdue` installments of the indication,
    /// returning how many rows were cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] if the indication does not exist,
    /// or [`EngineError::Storage`] on store failure.
    pub async fn cancel(&self, indication_id: Uuid) -> Result<u64, EngineError> {
        // Existence check first so a bad id surfaces as NotFound rather
        // than as a silent zero-row update.
        amber_db::get_indication(&self.pool, indication_id)
            .await
            .map_err(map_not_found("indication"))?;

        let cancelled = amber_db::cancel_unpaid_installments(&self.pool, indication_id).await?;

        tracing::info!(
            indication_id = %indication_id,
            cancelled,
            "reconciled commission installments"
        );
        Ok(cancelled)
    }
}

//! The indication status state machine.

use amber_core::IndicationStatus;
use amber_db::IndicationRow;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{map_not_found, EngineError};
use crate::generator::generate_missing;

/// What a transition did, for logging and API responses.
#[derive(Debug)]
pub struct TransitionOutcome {
    pub indication: IndicationRow,
    pub installments_created: usize,
    pub installments_cancelled: u64,
}

/// Drives indication status transitions and their installment side
/// effects.
///
/// Approval and generation run inside a single transaction: an indication
/// can never end up persisted as `approved` with no installment set. A
/// reversal likewise cancels unpaid installments and clears the approval
/// date atomically.
#[derive(Debug, Clone)]
pub struct LifecycleManager {
    pool: PgPool,
}

impl LifecycleManager {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Moves an indication to `new_status` and applies the side effects
    /// the transition implies.
    ///
    /// - non-approved → `approved`: sets the approval date to now and
    ///   generates the installment set. Retries are no-ops.
    /// - `approved` → non-approved: cancels unpaid installments and clears
    ///   the approval date. Paid installments survive.
    /// - anything else: a plain status update.
    ///
    /// `rejected → approved` is allowed directly; generation reuses any
    /// surviving paid installments and fills the remaining slots.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NotFound`] if the indication does not exist.
    /// - [`EngineError::Storage`] on store failure; all side effects of
    ///   the attempted transition are rolled back.
    pub async fn transition(
        &self,
        indication_id: Uuid,
        new_status: IndicationStatus,
    ) -> Result<TransitionOutcome, EngineError> {
        let mut tx = self.pool.begin().await?;

        let indication = amber_db::get_indication(&mut *tx, indication_id)
            .await
            .map_err(map_not_found("indication"))?;
        let old_status: IndicationStatus = indication
            .status
            .parse()
            .map_err(EngineError::Validation)?;

        let mut created = Vec::new();
        let mut cancelled = 0;

        if new_status == IndicationStatus::Approved {
            // A retried approval keeps its original approval date.
            let approval_date = indication.approval_date.unwrap_or_else(Utc::now);
            amber_db::set_indication_status(
                &mut *tx,
                indication_id,
                new_status.as_str(),
                Some(approval_date),
            )
            .await?;
            created = generate_missing(&mut tx, &indication, approval_date).await?;
        } else {
            if old_status == IndicationStatus::Approved {
                cancelled = amber_db::cancel_unpaid_installments(&mut *tx, indication_id).await?;
            }
            amber_db::set_indication_status(&mut *tx, indication_id, new_status.as_str(), None)
                .await?;
        }

        let updated = amber_db::get_indication(&mut *tx, indication_id).await?;
        tx.commit().await?;

        tracing::info!(
            indication_id = %indication_id,
            from = %old_status,
            to = %new_status,
            installments_created = created.len(),
            installments_cancelled = cancelled,
            "indication transitioned"
        );

        Ok(TransitionOutcome {
            indication: updated,
            installments_created: created.len(),
            installments_cancelled: cancelled,
        })
    }

    /// Deletes an indication outright.
    ///
    /// Unpaid installments are reconciled (cancelled) first so the removal
    /// is observable in the log; the remaining rows go with the indication
    /// via the store's cascade.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] if the indication does not exist,
    /// or [`EngineError::Storage`] on store failure.
    pub async fn delete(&self, indication_id: Uuid) -> Result<(), EngineError> {
        let mut tx = self.pool.begin().await?;

        let cancelled = amber_db::cancel_unpaid_installments(&mut *tx, indication_id).await?;
        amber_db::delete_indication(&mut *tx, indication_id)
            .await
            .map_err(map_not_found("indication"))?;

        tx.commit().await?;

        tracing::info!(
            indication_id = %indication_id,
            installments_cancelled = cancelled,
            "indication deleted"
        );
        Ok(())
    }
}

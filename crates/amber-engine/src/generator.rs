//! Installment generation for approved indications.

use amber_core::schedule;
use amber_db::{IndicationRow, NewInstallment};
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{map_not_found, EngineError};

/// Creates the three commission installments owed for an approved
/// indication.
///
/// Generation only fills the *missing* installment numbers: slots already
/// held by a live (non-cancelled) row are left alone. That makes a retried
/// approval a no-op and lets a re-approval after reversal reuse a surviving
/// paid installment while regenerating the cancelled ones. The partial
/// unique index on `(indication_id, installment_number)` backs this up
/// against concurrent duplicates.
#[derive(Debug, Clone)]
pub struct InstallmentGenerator {
    pool: PgPool,
}

impl InstallmentGenerator {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Generates installments for an already-approved indication and
    /// returns the full live installment set (pre-existing and created).
    ///
    /// Duplicate calls are no-ops that return the existing IDs.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NotFound`] if the indication does not exist.
    /// - [`EngineError::Validation`] if the indication is not approved.
    /// - [`EngineError::Storage`] on store failure; the transaction is
    ///   rolled back, so no partial installment set survives.
    pub async fn generate(&self, indication_id: Uuid) -> Result<Vec<Uuid>, EngineError> {
        let mut tx = self.pool.begin().await?;

        let indication = amber_db::get_indication(&mut *tx, indication_id)
            .await
            .map_err(map_not_found("indication"))?;
        let approval_date = indication.approval_date.ok_or_else(|| {
            EngineError::Validation(format!(
                "indication {indication_id} is not approved; nothing to generate"
            ))
        })?;

        let created = generate_missing(&mut tx, &indication, approval_date).await?;
        if !created.is_empty() {
            tracing::info!(
                indication_id = %indication_id,
                created = created.len(),
                "generated commission installments"
            );
        }

        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM commission_installments \
             WHERE indication_id = $1 AND status <> 'cancelled' \
             ORDER BY installment_number",
        )
        .bind(indication_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(amber_db::DbError::from)?;

        tx.commit().await?;
        Ok(ids)
    }
}

/// Inserts the missing installments for `indication` on the caller's
/// connection, returning the IDs that were actually created.
///
/// Runs inside the lifecycle manager's approval transaction so the status
/// flip and the installment set commit or roll back together.
pub(crate) async fn generate_missing(
    conn: &mut PgConnection,
    indication: &IndicationRow,
    approval_date: DateTime<Utc>,
) -> Result<Vec<Uuid>, EngineError> {
    let existing = amber_db::list_live_numbers(&mut *conn, indication.id).await?;
    let ambassador = amber_db::get_ambassador(&mut *conn, indication.ambassador_id)
        .await
        .map_err(map_not_found("ambassador"))?;

    let mut created = Vec::new();
    for number in schedule::installment_numbers() {
        let number_i32 = i32::try_from(number).expect("installment number fits i32");
        if existing.contains(&number_i32) {
            continue;
        }

        let new = NewInstallment {
            indication_id: indication.id,
            ambassador_id: indication.ambassador_id,
            ambassador_name: ambassador.name.clone(),
            client_name: indication.client_name.clone(),
            installment_number: number_i32,
            value: schedule::installment_value(),
            due_date: schedule::due_date(approval_date, number),
        };

        // A concurrent generator may have taken the slot between the
        // read above and this insert; the conflict skip keeps us exact.
        if let Some(id) = amber_db::insert_installment(&mut *conn, &new).await? {
            created.push(id);
        }
    }

    Ok(created)
}

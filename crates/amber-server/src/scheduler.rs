//! Background job scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the
//! recurring overdue-installment scan.

use std::sync::Arc;

use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use amber_engine::OverdueScanner;

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process — dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// the cron expression is invalid, or the scheduler fails to start.
pub async fn build_scheduler(
    pool: PgPool,
    config: Arc<amber_core::AppConfig>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_overdue_scan_job(&scheduler, pool, &config.overdue_scan_cron).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the recurring overdue scan.
///
/// Runs on the configured cron expression (daily at 06:00 UTC by default)
/// and flips pending installments whose due date has passed to `overdue`.
async fn register_overdue_scan_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    cron: &str,
) -> Result<(), JobSchedulerError> {
    let scanner = Arc::new(OverdueScanner::new(pool));

    let job = Job::new_async(cron, move |_uuid, _lock| {
        let scanner = Arc::clone(&scanner);

        Box::pin(async move {
            tracing::info!("scheduler: starting overdue installment scan");
            match scanner.scan().await {
                Ok(outcome) => {
                    tracing::info!(
                        transitioned = outcome.transitioned.len(),
                        failed = outcome.failed,
                        "scheduler: overdue scan complete"
                    );
                }
                Err(e) => {
                    tracing::error!(error = %e, "scheduler: overdue scan failed");
                }
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

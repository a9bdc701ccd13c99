//! End-to-end lifecycle tests for the commission engine using
//! `#[sqlx::test]`. Each test runs against a fresh, fully-migrated
//! Postgres database.

use amber_core::IndicationStatus;
use amber_db::{InstallmentFilters, NewIndication};
use amber_engine::{
    InstallmentGenerator, LifecycleManager, OverdueScanner, ReconciliationService,
    ReportAggregator, ReportOptions, ReportScope,
};
use chrono::{Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn seed_ambassador(pool: &sqlx::PgPool, name: &str, email: &str) -> Uuid {
    amber_db::create_ambassador(pool, name, email)
        .await
        .expect("create_ambassador failed")
        .id
}

async fn seed_indication(pool: &sqlx::PgPool, ambassador_id: Uuid, client: &str) -> Uuid {
    seed_indication_in_segment(pool, ambassador_id, client, "general").await
}

async fn seed_indication_in_segment(
    pool: &sqlx::PgPool,
    ambassador_id: Uuid,
    client: &str,
    segment: &str,
) -> Uuid {
    amber_db::create_indication(
        pool,
        &NewIndication {
            ambassador_id,
            client_name: client.to_string(),
            client_email: format!("{client}@client.example.com"),
            client_phone: "+55 11 98888-7777".to_string(),
            origin: "website".to_string(),
            segment: segment.to_string(),
        },
    )
    .await
    .expect("create_indication failed")
    .id
}

/// Rewrite an indication's approval date and its installments' due dates as
/// if it had been approved at `approved_at`.
async fn backdate_approval(
    pool: &sqlx::PgPool,
    indication_id: Uuid,
    approved_at: chrono::DateTime<Utc>,
) {
    sqlx::query("UPDATE indications SET approval_date = $1 WHERE id = $2")
        .bind(approved_at)
        .bind(indication_id)
        .execute(pool)
        .await
        .expect("backdate indication");

    for (number, offset_days) in [(1, 0_i64), (2, 30), (3, 90)] {
        sqlx::query(
            "UPDATE commission_installments SET due_date = $1 \
             WHERE indication_id = $2 AND installment_number = $3",
        )
        .bind(approved_at + Duration::days(offset_days))
        .bind(indication_id)
        .bind(number)
        .execute(pool)
        .await
        .expect("backdate installment");
    }
}

async fn live_installments(
    pool: &sqlx::PgPool,
    indication_id: Uuid,
) -> Vec<amber_db::InstallmentRow> {
    amber_db::list_installments(pool, InstallmentFilters::default())
        .await
        .expect("list failed")
        .into_iter()
        .filter(|r| r.indication_id == indication_id && r.status != "cancelled")
        .collect()
}

// ---------------------------------------------------------------------------
// Approval and generation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn approval_generates_exactly_three_installments_summing_to_900(pool: sqlx::PgPool) {
    let ambassador_id = seed_ambassador(&pool, "Maria Silva", "maria@example.com").await;
    let indication_id = seed_indication(&pool, ambassador_id, "Acme").await;
    let lifecycle = LifecycleManager::new(pool.clone());

    let outcome = lifecycle
        .transition(indication_id, IndicationStatus::Approved)
        .await
        .expect("transition failed");

    assert_eq!(outcome.installments_created, 3);
    assert_eq!(outcome.indication.status, "approved");
    assert!(outcome.indication.approval_date.is_some());

    let rows = live_installments(&pool, indication_id).await;
    assert_eq!(rows.len(), 3);

    let numbers: Vec<i32> = rows.iter().map(|r| r.installment_number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);

    let total: Decimal = rows.iter().map(|r| r.value).sum();
    assert_eq!(total, Decimal::new(900_00, 2));

    // Denormalized reporting fields carried over.
    assert!(rows.iter().all(|r| r.ambassador_name == "Maria Silva"));
    assert!(rows.iter().all(|r| r.client_name == "Acme"));

    // Due dates follow the 0/30/90-day schedule, non-decreasing by number.
    let approval = outcome.indication.approval_date.unwrap();
    assert_eq!(rows[0].due_date, approval);
    assert_eq!(rows[1].due_date, approval + Duration::days(30));
    assert_eq!(rows[2].due_date, approval + Duration::days(90));
}

#[sqlx::test(migrations = "../../migrations")]
async fn retried_approval_is_a_no_op(pool: sqlx::PgPool) {
    let ambassador_id = seed_ambassador(&pool, "Maria Silva", "maria@example.com").await;
    let indication_id = seed_indication(&pool, ambassador_id, "Acme").await;
    let lifecycle = LifecycleManager::new(pool.clone());

    let first = lifecycle
        .transition(indication_id, IndicationStatus::Approved)
        .await
        .expect("first approval failed");
    let second = lifecycle
        .transition(indication_id, IndicationStatus::Approved)
        .await
        .expect("retried approval failed");

    assert_eq!(first.installments_created, 3);
    assert_eq!(second.installments_created, 0, "retry creates nothing");
    assert_eq!(
        second.indication.approval_date, first.indication.approval_date,
        "retry keeps the original approval date"
    );
    assert_eq!(live_installments(&pool, indication_id).await.len(), 3);
}

#[sqlx::test(migrations = "../../migrations")]
async fn standalone_generator_returns_existing_ids_on_duplicate_call(pool: sqlx::PgPool) {
    let ambassador_id = seed_ambassador(&pool, "Maria Silva", "maria@example.com").await;
    let indication_id = seed_indication(&pool, ambassador_id, "Acme").await;
    LifecycleManager::new(pool.clone())
        .transition(indication_id, IndicationStatus::Approved)
        .await
        .expect("approval failed");

    let generator = InstallmentGenerator::new(pool.clone());
    let first = generator.generate(indication_id).await.expect("generate");
    let second = generator.generate(indication_id).await.expect("generate");

    assert_eq!(first.len(), 3);
    assert_eq!(first, second, "duplicate call returns the same set");
}

#[sqlx::test(migrations = "../../migrations")]
async fn generator_rejects_unapproved_indication(pool: sqlx::PgPool) {
    let ambassador_id = seed_ambassador(&pool, "Maria Silva", "maria@example.com").await;
    let indication_id = seed_indication(&pool, ambassador_id, "Acme").await;

    let generator = InstallmentGenerator::new(pool.clone());
    let err = generator.generate(indication_id).await.unwrap_err();
    assert!(matches!(err, amber_engine::EngineError::Validation(_)));

    let err = generator.generate(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, amber_engine::EngineError::NotFound(_)));
}

#[sqlx::test(migrations = "../../migrations")]
async fn scheduled_to_rejected_creates_no_installments(pool: sqlx::PgPool) {
    let ambassador_id = seed_ambassador(&pool, "Maria Silva", "maria@example.com").await;
    let indication_id = seed_indication(&pool, ambassador_id, "Acme").await;

    let outcome = LifecycleManager::new(pool.clone())
        .transition(indication_id, IndicationStatus::Rejected)
        .await
        .expect("transition failed");

    assert_eq!(outcome.installments_created, 0);
    assert!(live_installments(&pool, indication_id).await.is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn transition_on_unknown_indication_is_not_found(pool: sqlx::PgPool) {
    let err = LifecycleManager::new(pool)
        .transition(Uuid::new_v4(), IndicationStatus::Approved)
        .await
        .unwrap_err();
    assert!(matches!(err, amber_engine::EngineError::NotFound(_)));
}

// ---------------------------------------------------------------------------
// Reversal and reconciliation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn reversal_cancels_pending_and_preserves_paid(pool: sqlx::PgPool) {
    let ambassador_id = seed_ambassador(&pool, "Maria Silva", "maria@example.com").await;
    let indication_id = seed_indication(&pool, ambassador_id, "Acme").await;
    let lifecycle = LifecycleManager::new(pool.clone());

    lifecycle
        .transition(indication_id, IndicationStatus::Approved)
        .await
        .expect("approval failed");

    // Pay installment #1, leave #2 and #3 pending.
    let rows = live_installments(&pool, indication_id).await;
    let first = rows.iter().find(|r| r.installment_number == 1).unwrap();
    amber_db::update_installment_status(&pool, first.id, "paid", Some(Utc::now()), None)
        .await
        .expect("mark paid failed");

    let outcome = lifecycle
        .transition(indication_id, IndicationStatus::Rejected)
        .await
        .expect("reversal failed");

    assert_eq!(outcome.installments_cancelled, 2);
    assert!(outcome.indication.approval_date.is_none());

    let survivors = live_installments(&pool, indication_id).await;
    assert_eq!(survivors.len(), 1);
    assert_eq!(survivors[0].installment_number, 1);
    assert_eq!(survivors[0].status, "paid");
}

#[sqlx::test(migrations = "../../migrations")]
async fn reapproval_after_reversal_regenerates_missing_slots(pool: sqlx::PgPool) {
    let ambassador_id = seed_ambassador(&pool, "Maria Silva", "maria@example.com").await;
    let indication_id = seed_indication(&pool, ambassador_id, "Acme").await;
    let lifecycle = LifecycleManager::new(pool.clone());

    lifecycle
        .transition(indication_id, IndicationStatus::Approved)
        .await
        .expect("approval failed");
    let rows = live_installments(&pool, indication_id).await;
    let first = rows.iter().find(|r| r.installment_number == 1).unwrap();
    amber_db::update_installment_status(&pool, first.id, "paid", Some(Utc::now()), None)
        .await
        .expect("mark paid failed");

    lifecycle
        .transition(indication_id, IndicationStatus::Rejected)
        .await
        .expect("reversal failed");
    let outcome = lifecycle
        .transition(indication_id, IndicationStatus::Approved)
        .await
        .expect("re-approval failed");

    // The paid installment survives; only the two cancelled slots refill.
    assert_eq!(outcome.installments_created, 2);
    let rows = live_installments(&pool, indication_id).await;
    assert_eq!(rows.len(), 3);
    let paid: Vec<i32> = rows
        .iter()
        .filter(|r| r.status == "paid")
        .map(|r| r.installment_number)
        .collect();
    assert_eq!(paid, vec![1]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn reconciliation_service_reports_not_found_for_unknown_indication(pool: sqlx::PgPool) {
    let err = ReconciliationService::new(pool)
        .cancel(Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, amber_engine::EngineError::NotFound(_)));
}

#[sqlx::test(migrations = "../../migrations")]
async fn delete_cancels_unpaid_and_removes_indication(pool: sqlx::PgPool) {
    let ambassador_id = seed_ambassador(&pool, "Maria Silva", "maria@example.com").await;
    let indication_id = seed_indication(&pool, ambassador_id, "Acme").await;
    let lifecycle = LifecycleManager::new(pool.clone());

    lifecycle
        .transition(indication_id, IndicationStatus::Approved)
        .await
        .expect("approval failed");
    lifecycle
        .delete(indication_id)
        .await
        .expect("delete failed");

    let err = amber_db::get_indication(&pool, indication_id)
        .await
        .unwrap_err();
    assert!(matches!(err, amber_db::DbError::NotFound));
    assert!(live_installments(&pool, indication_id).await.is_empty());
}

// ---------------------------------------------------------------------------
// Overdue scan
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn scan_marks_past_due_pending_installments_only(pool: sqlx::PgPool) {
    let ambassador_id = seed_ambassador(&pool, "Maria Silva", "maria@example.com").await;
    let indication_id = seed_indication(&pool, ambassador_id, "Acme").await;
    LifecycleManager::new(pool.clone())
        .transition(indication_id, IndicationStatus::Approved)
        .await
        .expect("approval failed");

    // Approved 2024-01-01: installments due Jan 1, Jan 31, Mar 31.
    let approved_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    backdate_approval(&pool, indication_id, approved_at).await;

    let scanner = OverdueScanner::new(pool.clone());
    let scan_time = Utc.with_ymd_and_hms(2024, 2, 15, 0, 0, 0).unwrap();
    let outcome = scanner.scan_at(scan_time).await.expect("scan failed");
    assert_eq!(outcome.transitioned.len(), 2, "#1 and #2 are past due");
    assert_eq!(outcome.failed, 0);

    let rows = live_installments(&pool, indication_id).await;
    let status_of = |n: i32| {
        rows.iter()
            .find(|r| r.installment_number == n)
            .map(|r| r.status.clone())
            .unwrap()
    };
    assert_eq!(status_of(1), "overdue");
    assert_eq!(status_of(2), "overdue");
    assert_eq!(status_of(3), "pending");

    // Second run with the same clock is a no-op.
    let again = scanner.scan_at(scan_time).await.expect("rescan failed");
    assert!(again.transitioned.is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn scan_never_reverts_a_paid_installment(pool: sqlx::PgPool) {
    let ambassador_id = seed_ambassador(&pool, "Maria Silva", "maria@example.com").await;
    let indication_id = seed_indication(&pool, ambassador_id, "Acme").await;
    LifecycleManager::new(pool.clone())
        .transition(indication_id, IndicationStatus::Approved)
        .await
        .expect("approval failed");

    let approved_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    backdate_approval(&pool, indication_id, approved_at).await;

    // Pay #1 on Jan 5, then scan well past every due date.
    let rows = live_installments(&pool, indication_id).await;
    let first = rows.iter().find(|r| r.installment_number == 1).unwrap();
    let paid_on = Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap();
    amber_db::update_installment_status(&pool, first.id, "paid", Some(paid_on), None)
        .await
        .expect("mark paid failed");

    let scanner = OverdueScanner::new(pool.clone());
    let outcome = scanner
        .scan_at(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap())
        .await
        .expect("scan failed");
    assert_eq!(outcome.transitioned.len(), 2);

    let refreshed = amber_db::get_installment(&pool, first.id)
        .await
        .expect("get failed");
    assert_eq!(refreshed.status, "paid");
    assert_eq!(refreshed.payment_date, Some(paid_on));
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn dashboard_rates_are_zero_on_an_empty_database(pool: sqlx::PgPool) {
    let aggregator = ReportAggregator::new(pool, ReportOptions::default());

    let stats = aggregator
        .dashboard_stats(ReportScope::All)
        .await
        .expect("dashboard_stats failed");

    assert_eq!(stats.total_indications, 0);
    assert!((stats.approval_rate - 0.0).abs() < f64::EPSILON);
    let active = stats.active_ambassadors.expect("admin scope has figures");
    assert_eq!(active.total, 0);
    assert!((active.active_percentage - 0.0).abs() < f64::EPSILON);
    assert_eq!(stats.installments.total_installments, 0);
    assert_eq!(stats.monthly_indications.len(), 6, "gaps filled with zeros");
}

#[sqlx::test(migrations = "../../migrations")]
async fn dashboard_aggregates_scope_and_segments(pool: sqlx::PgPool) {
    let maria = seed_ambassador(&pool, "Maria Silva", "maria@example.com").await;
    let ana = seed_ambassador(&pool, "Ana Costa", "ana@example.com").await;
    let lifecycle = LifecycleManager::new(pool.clone());

    let a1 = seed_indication_in_segment(&pool, maria, "Acme", "premium").await;
    seed_indication_in_segment(&pool, maria, "Globex", "premium").await;
    let b1 = seed_indication_in_segment(&pool, ana, "Initech", "startup").await;

    lifecycle
        .transition(a1, IndicationStatus::Approved)
        .await
        .expect("approve failed");
    amber_db::update_indication_fields(
        &pool,
        a1,
        &amber_db::UpdateIndication {
            converted: Some(true),
            ..amber_db::UpdateIndication::default()
        },
    )
    .await
    .expect("update failed");
    lifecycle
        .transition(b1, IndicationStatus::Rejected)
        .await
        .expect("reject failed");

    let aggregator = ReportAggregator::new(pool.clone(), ReportOptions::default());

    let admin = aggregator
        .dashboard_stats(ReportScope::All)
        .await
        .expect("admin stats failed");
    assert_eq!(admin.total_indications, 3);
    assert_eq!(admin.approved_indications, 1);
    assert!((admin.approval_rate - 100.0 / 3.0).abs() < 1e-9);
    assert_eq!(admin.installments.total_installments, 3);

    // Maria leads the board; the tie-less ordering is by count desc.
    assert_eq!(admin.top_ambassadors[0].name, "Maria Silva");
    assert_eq!(admin.top_ambassadors[0].indication_count, 2);

    let premium = admin
        .segment_conversion
        .iter()
        .find(|s| s.segment == "premium")
        .expect("premium segment present");
    assert_eq!(premium.total, 2);
    assert_eq!(premium.converted, 1);
    assert!((premium.conversion_rate - 50.0).abs() < f64::EPSILON);

    // Both ambassadors indicated within the window.
    let active = admin.active_ambassadors.expect("admin scope has figures");
    assert_eq!(active.active, 2);
    assert_eq!(active.total, 2);
    assert!((active.active_percentage - 100.0).abs() < f64::EPSILON);

    // Ambassador scope only sees its own rows and no population figures.
    let own = aggregator
        .dashboard_stats(ReportScope::Ambassador(maria))
        .await
        .expect("ambassador stats failed");
    assert_eq!(own.total_indications, 2);
    assert!(own.active_ambassadors.is_none());
    assert!(own.top_ambassadors.is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn commission_summary_tracks_status_buckets(pool: sqlx::PgPool) {
    let maria = seed_ambassador(&pool, "Maria Silva", "maria@example.com").await;
    let indication_id = seed_indication(&pool, maria, "Acme").await;
    LifecycleManager::new(pool.clone())
        .transition(indication_id, IndicationStatus::Approved)
        .await
        .expect("approve failed");

    let rows = live_installments(&pool, indication_id).await;
    let first = rows.iter().find(|r| r.installment_number == 1).unwrap();
    amber_db::update_installment_status(&pool, first.id, "paid", Some(Utc::now()), None)
        .await
        .expect("mark paid failed");

    let aggregator = ReportAggregator::new(pool.clone(), ReportOptions::default());
    let summary = aggregator
        .commission_summary(ReportScope::Ambassador(maria))
        .await
        .expect("summary failed");

    assert_eq!(summary.total_installments, 3);
    assert_eq!(summary.total_value, Decimal::new(900_00, 2));
    assert_eq!(summary.paid_installments, 1);
    assert_eq!(summary.paid_value, Decimal::new(300_00, 2));
    assert_eq!(summary.pending_installments, 2);
    assert_eq!(summary.pending_value, Decimal::new(600_00, 2));
}

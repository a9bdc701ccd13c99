//! Commission installment handlers: listing, manual status updates, the
//! on-demand overdue scan, and the summary endpoint.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use amber_core::InstallmentStatus;
use amber_db::{InstallmentFilters, InstallmentRow};
use amber_engine::{CommissionSummary, OverdueScanner, ReportAggregator, ReportScope};

use crate::middleware::RequestId;

use super::{map_db_error, map_engine_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct InstallmentItem {
    id: Uuid,
    indication_id: Uuid,
    ambassador_id: Uuid,
    ambassador_name: String,
    client_name: String,
    installment_number: i32,
    value: Decimal,
    due_date: DateTime<Utc>,
    status: String,
    payment_date: Option<DateTime<Utc>>,
    notes: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<InstallmentRow> for InstallmentItem {
    fn from(row: InstallmentRow) -> Self {
        Self {
            id: row.id,
            indication_id: row.indication_id,
            ambassador_id: row.ambassador_id,
            ambassador_name: row.ambassador_name,
            client_name: row.client_name,
            installment_number: row.installment_number,
            value: row.value,
            due_date: row.due_date,
            status: row.status,
            payment_date: row.payment_date,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct InstallmentsQuery {
    pub status: Option<String>,
    pub ambassador_id: Option<Uuid>,
    pub month: Option<i32>,
    pub year: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub(super) struct InstallmentStatusRequest {
    pub status: String,
    pub payment_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SummaryQuery {
    pub ambassador_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub(super) struct ScanResponse {
    transitioned: usize,
    failed: usize,
}

pub(super) async fn list_installments(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<InstallmentsQuery>,
) -> Result<Json<ApiResponse<Vec<InstallmentItem>>>, ApiError> {
    let rid = &req_id.0;

    if let Some(ref status) = query.status {
        status
            .parse::<InstallmentStatus>()
            .map_err(|message| ApiError::new(rid, "validation_error", message))?;
    }
    if let Some(month) = query.month {
        if !(1..=12).contains(&month) {
            return Err(ApiError::new(
                rid,
                "validation_error",
                format!("month must be between 1 and 12, got {month}"),
            ));
        }
    }

    let rows = amber_db::list_installments(
        &state.pool,
        InstallmentFilters {
            status: query.status.as_deref(),
            ambassador_id: query.ambassador_id,
            month: query.month,
            year: query.year,
        },
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(InstallmentItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// PUT /api/v1/commission-installments/{id}/status — manual update.
///
/// Only `pending`, `paid`, and `overdue` may be set here; `cancelled` is
/// reserved for the reconciliation path. Marking a row `paid` stamps the
/// payment date (request value, or now); any other target clears it.
pub(super) async fn set_installment_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
    Json(body): Json<InstallmentStatusRequest>,
) -> Result<Json<ApiResponse<InstallmentItem>>, ApiError> {
    let rid = &req_id.0;

    let status = body
        .status
        .parse::<InstallmentStatus>()
        .map_err(|message| ApiError::new(rid, "validation_error", message))?;
    if !status.is_manually_settable() {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "status 'cancelled' is reserved for reconciliation",
        ));
    }

    let current = amber_db::get_installment(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    if current.status == InstallmentStatus::Cancelled.as_str() {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "a cancelled installment cannot be updated",
        ));
    }

    let payment_date = match status {
        InstallmentStatus::Paid => Some(body.payment_date.unwrap_or_else(Utc::now)),
        _ => None,
    };

    let row = amber_db::update_installment_status(
        &state.pool,
        id,
        status.as_str(),
        payment_date,
        body.notes.as_deref(),
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: row.into(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn check_overdue(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<ScanResponse>>, ApiError> {
    let outcome = OverdueScanner::new(state.pool.clone())
        .scan()
        .await
        .map_err(|e| map_engine_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: ScanResponse {
            transitioned: outcome.transitioned.len(),
            failed: outcome.failed,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn installment_summary(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<ApiResponse<CommissionSummary>>, ApiError> {
    let scope = query
        .ambassador_id
        .map_or(ReportScope::All, ReportScope::Ambassador);

    let summary = ReportAggregator::new(state.pool.clone(), state.report_options)
        .commission_summary(scope)
        .await
        .map_err(|e| map_engine_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: summary,
        meta: ResponseMeta::new(req_id.0),
    }))
}

//! Indication CRUD and lifecycle transition handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use amber_core::IndicationStatus;
use amber_db::{IndicationFilters, IndicationRow, NewIndication, UpdateIndication};
use amber_engine::LifecycleManager;

use crate::middleware::RequestId;

use super::{map_db_error, map_engine_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct IndicationItem {
    id: Uuid,
    ambassador_id: Uuid,
    client_name: String,
    client_email: String,
    client_phone: String,
    origin: String,
    segment: String,
    status: String,
    converted: bool,
    approval_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<IndicationRow> for IndicationItem {
    fn from(row: IndicationRow) -> Self {
        Self {
            id: row.id,
            ambassador_id: row.ambassador_id,
            client_name: row.client_name,
            client_email: row.client_email,
            client_phone: row.client_phone,
            origin: row.origin,
            segment: row.segment,
            status: row.status,
            converted: row.converted,
            approval_date: row.approval_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct IndicationsQuery {
    pub ambassador_id: Option<Uuid>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateIndicationRequest {
    pub ambassador_id: Uuid,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: Option<String>,
    pub origin: Option<String>,
    pub segment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateIndicationRequest {
    pub client_name: Option<String>,
    pub client_email: Option<String>,
    pub client_phone: Option<String>,
    pub origin: Option<String>,
    pub segment: Option<String>,
    pub converted: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub(super) struct StatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub(super) struct TransitionResponse {
    indication: IndicationItem,
    installments_created: usize,
    installments_cancelled: u64,
}

fn parse_indication_status(req_id: &str, raw: &str) -> Result<IndicationStatus, ApiError> {
    raw.parse()
        .map_err(|message: String| ApiError::new(req_id, "validation_error", message))
}

pub(super) async fn list_indications(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<IndicationsQuery>,
) -> Result<Json<ApiResponse<Vec<IndicationItem>>>, ApiError> {
    if let Some(ref status) = query.status {
        parse_indication_status(&req_id.0, status)?;
    }

    let rows = amber_db::list_indications(
        &state.pool,
        IndicationFilters {
            ambassador_id: query.ambassador_id,
            status: query.status.as_deref(),
        },
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(IndicationItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn create_indication(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateIndicationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<IndicationItem>>), ApiError> {
    let rid = &req_id.0;

    let client_name = body.client_name.trim().to_owned();
    if client_name.is_empty() {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "client_name must not be empty",
        ));
    }
    let client_email = body.client_email.trim().to_owned();
    if !client_email.contains('@') {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "client_email must be a valid email address",
        ));
    }

    amber_db::get_ambassador(&state.pool, body.ambassador_id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    let row = amber_db::create_indication(
        &state.pool,
        &NewIndication {
            ambassador_id: body.ambassador_id,
            client_name,
            client_email,
            client_phone: body.client_phone.unwrap_or_default(),
            origin: body.origin.unwrap_or_else(|| "website".to_string()),
            segment: body.segment.unwrap_or_else(|| "general".to_string()),
        },
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: row.into(),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

pub(super) async fn update_indication(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateIndicationRequest>,
) -> Result<Json<ApiResponse<IndicationItem>>, ApiError> {
    let row = amber_db::update_indication_fields(
        &state.pool,
        id,
        &UpdateIndication {
            client_name: body.client_name,
            client_email: body.client_email,
            client_phone: body.client_phone,
            origin: body.origin,
            segment: body.segment,
            converted: body.converted,
        },
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: row.into(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn delete_indication(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    LifecycleManager::new(state.pool.clone())
        .delete(id)
        .await
        .map_err(|e| map_engine_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: serde_json::json!({ "deleted": true }),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn set_indication_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<ApiResponse<TransitionResponse>>, ApiError> {
    let status = parse_indication_status(&req_id.0, &body.status)?;

    let outcome = LifecycleManager::new(state.pool.clone())
        .transition(id, status)
        .await
        .map_err(|e| map_engine_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: TransitionResponse {
            indication: outcome.indication.into(),
            installments_created: outcome.installments_created,
            installments_cancelled: outcome.installments_cancelled,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

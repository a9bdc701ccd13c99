//! Ambassador roster handlers.

use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use amber_db::AmbassadorRow;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct AmbassadorItem {
    id: Uuid,
    name: String,
    email: String,
    created_at: DateTime<Utc>,
}

impl From<AmbassadorRow> for AmbassadorItem {
    fn from(row: AmbassadorRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateAmbassadorRequest {
    pub name: String,
    pub email: String,
}

fn map_unique_violation(req_id: &str, e: &amber_db::DbError) -> ApiError {
    if e.is_unique_violation() {
        return ApiError::new(
            req_id,
            "conflict",
            "an ambassador with that email already exists",
        );
    }
    map_db_error(req_id.to_owned(), e)
}

pub(super) async fn create_ambassador(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateAmbassadorRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AmbassadorItem>>), ApiError> {
    let rid = &req_id.0;

    let name = body.name.trim().to_owned();
    if name.is_empty() {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "name must not be empty",
        ));
    }
    let email = body.email.trim().to_owned();
    if !email.contains('@') {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "email must be a valid email address",
        ));
    }

    let row = amber_db::create_ambassador(&state.pool, &name, &email)
        .await
        .map_err(|e| map_unique_violation(rid, &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: row.into(),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

pub(super) async fn list_ambassadors(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<AmbassadorItem>>>, ApiError> {
    let rows = amber_db::list_ambassadors(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(AmbassadorItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

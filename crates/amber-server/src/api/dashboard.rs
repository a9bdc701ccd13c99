//! Dashboard report handlers, one per audience.

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use amber_engine::{DashboardStats, ReportAggregator, ReportScope};

use crate::middleware::RequestId;

use super::{map_db_error, map_engine_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct AmbassadorDashboardQuery {
    pub ambassador_id: Option<Uuid>,
}

pub(super) async fn admin_dashboard(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<DashboardStats>>, ApiError> {
    let stats = ReportAggregator::new(state.pool.clone(), state.report_options)
        .dashboard_stats(ReportScope::All)
        .await
        .map_err(|e| map_engine_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: stats,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn ambassador_dashboard(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<AmbassadorDashboardQuery>,
) -> Result<Json<ApiResponse<DashboardStats>>, ApiError> {
    let rid = &req_id.0;

    let Some(ambassador_id) = query.ambassador_id else {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "ambassador_id query parameter is required",
        ));
    };

    amber_db::get_ambassador(&state.pool, ambassador_id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    let stats = ReportAggregator::new(state.pool.clone(), state.report_options)
        .dashboard_stats(ReportScope::Ambassador(ambassador_id))
        .await
        .map_err(|e| map_engine_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: stats,
        meta: ResponseMeta::new(req_id.0),
    }))
}

use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
};
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::auth::AuthUser;
use crate::modules::history::model::{HistoryDetailResponse, HistoryFilterParams, HistoryListItem};
use crate::modules::history::service::HistoryService;
use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::utils::response::ApiResponse;

#[utoipa::path(
    get,
    path = "/api/history",
    params(
        ("schoolId" = Option<Uuid>, Query, description = "Filter by school"),
        ("materialId" = Option<Uuid>, Query, description = "Filter by material"),
        ("search" = Option<String>, Query, description = "Match material title, school name, or remarks"),
        ("startDate" = Option<String>, Query, description = "Earliest delivery date (YYYY-MM-DD or RFC 3339)"),
        ("endDate" = Option<String>, Query, description = "Latest delivery date (YYYY-MM-DD or RFC 3339)"),
        ("page" = Option<i64>, Query, description = "Page number (1-based)"),
        ("limit" = Option<i64>, Query, description = "Page size")
    ),
    responses(
        (status = 200, description = "Paginated delivery history"),
        (status = 400, description = "Invalid query parameters"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "History",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, filters))]
pub async fn get_history(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    filters: Result<Query<HistoryFilterParams>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<HistoryListItem>>>, AppError> {
    let Query(filters) = filters
        .map_err(|e| AppError::bad_request(anyhow::anyhow!("Invalid query parameters: {}", e)))?;

    let (records, meta) = HistoryService::get_all_completed_issuances(&state.db, filters).await?;
    Ok(Json(ApiResponse::paginated(records, meta)))
}

#[utoipa::path(
    get,
    path = "/api/history/{id}",
    params(
        ("id" = Uuid, Path, description = "Completed issuance ID")
    ),
    responses(
        (status = 200, description = "Delivery record with material and school", body = HistoryDetailResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Completed issuance not found")
    ),
    tag = "History",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_history_record(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<HistoryDetailResponse>>, AppError> {
    let record = HistoryService::get_completed_issuance_by_id(&state.db, id).await?;
    Ok(Json(ApiResponse::ok(record)))
}

#[utoipa::path(
    delete,
    path = "/api/history/{id}",
    params(
        ("id" = Uuid, Path, description = "Completed issuance ID")
    ),
    responses(
        (status = 200, description = "Delivery record deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Completed issuance not found")
    ),
    tag = "History",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_history_record(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    HistoryService::delete_completed_issuance(&state.db, id).await?;
    Ok(Json(ApiResponse::message(
        "Completed issuance deleted successfully",
    )))
}

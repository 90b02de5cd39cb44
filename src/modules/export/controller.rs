use axum::{
    extract::{Query, State, rejection::QueryRejection},
    http::header,
    response::{IntoResponse, Response},
};
use tracing::instrument;

use crate::middleware::auth::AuthUser;
use crate::modules::export::model::{HistoryExportParams, MaterialExportParams, SchoolExportParams};
use crate::modules::export::service::ExportService;
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Wraps CSV text in a download response named `{prefix}-{date}.csv`.
fn csv_download(prefix: &str, csv: String) -> Response {
    let filename = format!("{}-{}.csv", prefix, chrono::Utc::now().format("%Y-%m-%d"));
    (
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        csv,
    )
        .into_response()
}

#[utoipa::path(
    get,
    path = "/api/export/history",
    params(
        ("schoolId" = Option<Uuid>, Query, description = "Filter by school"),
        ("materialId" = Option<Uuid>, Query, description = "Filter by material"),
        ("startDate" = Option<String>, Query, description = "Earliest delivery date (YYYY-MM-DD or RFC 3339)"),
        ("endDate" = Option<String>, Query, description = "Latest delivery date (YYYY-MM-DD or RFC 3339)")
    ),
    responses(
        (status = 200, description = "Delivery history CSV download", content_type = "text/csv"),
        (status = 400, description = "Invalid query parameters"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Export",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, params))]
pub async fn export_history(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    params: Result<Query<HistoryExportParams>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(params) = params
        .map_err(|e| AppError::bad_request(anyhow::anyhow!("Invalid query parameters: {}", e)))?;

    let csv = ExportService::export_history(&state.db, params).await?;
    Ok(csv_download("delivery-history", csv))
}

#[utoipa::path(
    get,
    path = "/api/export/materials",
    params(
        ("educationStage" = Option<String>, Query, description = "Filter by education stage"),
        ("subjectId" = Option<Uuid>, Query, description = "Filter by subject")
    ),
    responses(
        (status = 200, description = "Materials inventory CSV download", content_type = "text/csv"),
        (status = 400, description = "Invalid query parameters"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Export",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, params))]
pub async fn export_materials(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    params: Result<Query<MaterialExportParams>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(params) = params
        .map_err(|e| AppError::bad_request(anyhow::anyhow!("Invalid query parameters: {}", e)))?;

    let csv = ExportService::export_materials(&state.db, params).await?;
    Ok(csv_download("materials", csv))
}

#[utoipa::path(
    get,
    path = "/api/export/schools",
    params(
        ("type" = Option<String>, Query, description = "Filter by school type"),
        ("municipality" = Option<String>, Query, description = "Filter by municipality (exact match)"),
        ("congressionalDistrict" = Option<i64>, Query, description = "Filter by congressional district")
    ),
    responses(
        (status = 200, description = "School directory CSV download", content_type = "text/csv"),
        (status = 400, description = "Invalid query parameters"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Export",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, params))]
pub async fn export_schools(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    params: Result<Query<SchoolExportParams>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(params) = params
        .map_err(|e| AppError::bad_request(anyhow::anyhow!("Invalid query parameters: {}", e)))?;

    let csv = ExportService::export_schools(&state.db, params).await?;
    Ok(csv_download("schools", csv))
}

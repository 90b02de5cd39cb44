use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
};
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::auth::AuthUser;
use crate::modules::issuances::model::{
    CompleteIssuanceDto, CompletedWithIssuance, CreateIssuanceDto, IssuanceFilterParams,
    IssuanceResponse, UpdateIssuanceDto,
};
use crate::modules::issuances::service::IssuanceService;
use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::utils::response::ApiResponse;
use crate::validator::ValidatedJson;

#[utoipa::path(
    get,
    path = "/api/issuances",
    params(
        ("status" = Option<String>, Query, description = "Filter by status: pending or completed"),
        ("schoolId" = Option<Uuid>, Query, description = "Filter by school"),
        ("materialId" = Option<Uuid>, Query, description = "Filter by material"),
        ("page" = Option<i64>, Query, description = "Page number (1-based)"),
        ("limit" = Option<i64>, Query, description = "Page size")
    ),
    responses(
        (status = 200, description = "Paginated list of issuances"),
        (status = 400, description = "Invalid query parameters"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Issuances",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, filters))]
pub async fn get_issuances(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    filters: Result<Query<IssuanceFilterParams>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<IssuanceResponse>>>, AppError> {
    let Query(filters) = filters
        .map_err(|e| AppError::bad_request(anyhow::anyhow!("Invalid query parameters: {}", e)))?;

    let (issuances, meta) = IssuanceService::get_all_issuances(&state.db, filters).await?;
    Ok(Json(ApiResponse::paginated(issuances, meta)))
}

#[utoipa::path(
    get,
    path = "/api/issuances/{id}",
    params(
        ("id" = Uuid, Path, description = "Issuance ID")
    ),
    responses(
        (status = 200, description = "Issuance with related entities", body = IssuanceResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Issuance not found")
    ),
    tag = "Issuances",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_issuance(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<IssuanceResponse>>, AppError> {
    let issuance = IssuanceService::get_issuance_by_id(&state.db, id).await?;
    Ok(Json(ApiResponse::ok(issuance)))
}

#[utoipa::path(
    post,
    path = "/api/issuances",
    request_body = CreateIssuanceDto,
    responses(
        (status = 200, description = "Issuance created and stock deducted", body = IssuanceResponse),
        (status = 400, description = "Missing required fields, non-positive quantity, or insufficient stock"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Material, school, or user not found")
    ),
    tag = "Issuances",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn create_issuance(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<CreateIssuanceDto>,
) -> Result<Json<ApiResponse<IssuanceResponse>>, AppError> {
    let issuance = IssuanceService::create_issuance(&state.db, dto).await?;
    Ok(Json(ApiResponse::ok(issuance)))
}

#[utoipa::path(
    put,
    path = "/api/issuances/{id}",
    params(
        ("id" = Uuid, Path, description = "Issuance ID")
    ),
    request_body = UpdateIssuanceDto,
    responses(
        (status = 200, description = "Issuance updated, stock adjusted by the difference", body = IssuanceResponse),
        (status = 400, description = "Completed issuance, non-positive quantity, or insufficient stock"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Issuance not found")
    ),
    tag = "Issuances",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn update_issuance(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateIssuanceDto>,
) -> Result<Json<ApiResponse<IssuanceResponse>>, AppError> {
    let issuance = IssuanceService::update_issuance(&state.db, id, dto).await?;
    Ok(Json(ApiResponse::ok(issuance)))
}

#[utoipa::path(
    delete,
    path = "/api/issuances/{id}",
    params(
        ("id" = Uuid, Path, description = "Issuance ID")
    ),
    responses(
        (status = 200, description = "Issuance deleted and stock restored"),
        (status = 400, description = "Issuance is already completed"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Issuance not found")
    ),
    tag = "Issuances",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_issuance(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    IssuanceService::delete_issuance(&state.db, id).await?;
    Ok(Json(ApiResponse::message(
        "Issuance deleted and quantity returned to inventory",
    )))
}

#[utoipa::path(
    post,
    path = "/api/issuances/{id}/complete",
    params(
        ("id" = Uuid, Path, description = "Issuance ID")
    ),
    request_body = CompleteIssuanceDto,
    responses(
        (status = 200, description = "Delivery recorded", body = CompletedWithIssuance),
        (status = 400, description = "Issuance is already completed"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Issuance not found")
    ),
    tag = "Issuances",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn complete_issuance(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<CompleteIssuanceDto>,
) -> Result<Json<ApiResponse<CompletedWithIssuance>>, AppError> {
    let completed = IssuanceService::complete_issuance(&state.db, id, dto).await?;
    Ok(Json(ApiResponse::ok(completed)))
}

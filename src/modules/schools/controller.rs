use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
};
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::auth::AuthUser;
use crate::modules::schools::model::{
    CreateSchoolDto, School, SchoolDetailResponse, SchoolFilterParams, SchoolWithCount,
    UpdateSchoolDto,
};
use crate::modules::schools::service::SchoolService;
use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::utils::response::ApiResponse;
use crate::validator::ValidatedJson;

#[utoipa::path(
    get,
    path = "/api/schools",
    params(
        ("search" = Option<String>, Query, description = "Filter by school name (partial match)"),
        ("type" = Option<String>, Query, description = "Filter by school type"),
        ("municipality" = Option<String>, Query, description = "Filter by municipality (partial match)"),
        ("congressionalDistrict" = Option<i64>, Query, description = "Filter by congressional district"),
        ("page" = Option<i64>, Query, description = "Page number (1-based)"),
        ("limit" = Option<i64>, Query, description = "Page size")
    ),
    responses(
        (status = 200, description = "Paginated list of schools with issuance counts"),
        (status = 400, description = "Invalid query parameters"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Schools",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, filters))]
pub async fn get_schools(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    filters: Result<Query<SchoolFilterParams>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<SchoolWithCount>>>, AppError> {
    let Query(filters) = filters
        .map_err(|e| AppError::bad_request(anyhow::anyhow!("Invalid query parameters: {}", e)))?;

    let (schools, meta) = SchoolService::get_all_schools(&state.db, filters).await?;
    Ok(Json(ApiResponse::paginated(schools, meta)))
}

#[utoipa::path(
    get,
    path = "/api/schools/{id}",
    params(
        ("id" = Uuid, Path, description = "School ID")
    ),
    responses(
        (status = 200, description = "School with recent issuances", body = SchoolDetailResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "School not found")
    ),
    tag = "Schools",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_school(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<SchoolDetailResponse>>, AppError> {
    let school = SchoolService::get_school_by_id(&state.db, id).await?;
    Ok(Json(ApiResponse::ok(school)))
}

#[utoipa::path(
    post,
    path = "/api/schools",
    request_body = CreateSchoolDto,
    responses(
        (status = 200, description = "School created", body = School),
        (status = 400, description = "Missing required fields or duplicate school"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Schools",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn create_school(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<CreateSchoolDto>,
) -> Result<Json<ApiResponse<School>>, AppError> {
    let school = SchoolService::create_school(&state.db, dto).await?;
    Ok(Json(ApiResponse::ok(school)))
}

#[utoipa::path(
    put,
    path = "/api/schools/{id}",
    params(
        ("id" = Uuid, Path, description = "School ID")
    ),
    request_body = UpdateSchoolDto,
    responses(
        (status = 200, description = "School updated", body = School),
        (status = 400, description = "Duplicate school name in municipality"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "School not found")
    ),
    tag = "Schools",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn update_school(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateSchoolDto>,
) -> Result<Json<ApiResponse<School>>, AppError> {
    let school = SchoolService::update_school(&state.db, id, dto).await?;
    Ok(Json(ApiResponse::ok(school)))
}

#[utoipa::path(
    delete,
    path = "/api/schools/{id}",
    params(
        ("id" = Uuid, Path, description = "School ID")
    ),
    responses(
        (status = 200, description = "School deleted"),
        (status = 400, description = "School still has issuances"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "School not found")
    ),
    tag = "Schools",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_school(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    SchoolService::delete_school(&state.db, id).await?;
    Ok(Json(ApiResponse::message("School deleted successfully")))
}

use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
};
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::auth::AuthUser;
use crate::modules::materials::model::{
    CreateMaterialDto, MaterialDetailResponse, MaterialFilterParams, MaterialResponse,
    UpdateMaterialDto,
};
use crate::modules::materials::service::MaterialService;
use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::utils::response::ApiResponse;
use crate::validator::ValidatedJson;

#[utoipa::path(
    get,
    path = "/api/materials",
    params(
        ("search" = Option<String>, Query, description = "Filter by title (partial match)"),
        ("gradeLevel" = Option<i64>, Query, description = "Filter by numeric grade level"),
        ("subjectId" = Option<Uuid>, Query, description = "Filter by subject"),
        ("educationStage" = Option<String>, Query, description = "Filter by education stage"),
        ("page" = Option<i64>, Query, description = "Page number (1-based)"),
        ("limit" = Option<i64>, Query, description = "Page size")
    ),
    responses(
        (status = 200, description = "Paginated list of materials"),
        (status = 400, description = "Invalid query parameters"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Materials",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, filters))]
pub async fn get_materials(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    filters: Result<Query<MaterialFilterParams>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<MaterialResponse>>>, AppError> {
    let Query(filters) = filters
        .map_err(|e| AppError::bad_request(anyhow::anyhow!("Invalid query parameters: {}", e)))?;

    let (materials, meta) = MaterialService::get_all_materials(&state.db, filters).await?;
    Ok(Json(ApiResponse::paginated(materials, meta)))
}

#[utoipa::path(
    get,
    path = "/api/materials/{id}",
    params(
        ("id" = Uuid, Path, description = "Material ID")
    ),
    responses(
        (status = 200, description = "Material with subject and recent issuances", body = MaterialDetailResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Material not found")
    ),
    tag = "Materials",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_material(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<MaterialDetailResponse>>, AppError> {
    let material = MaterialService::get_material_by_id(&state.db, id).await?;
    Ok(Json(ApiResponse::ok(material)))
}

#[utoipa::path(
    post,
    path = "/api/materials",
    request_body = CreateMaterialDto,
    responses(
        (status = 200, description = "Material created", body = MaterialResponse),
        (status = 400, description = "Missing required fields or grade level out of range"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Subject not found")
    ),
    tag = "Materials",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn create_material(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<CreateMaterialDto>,
) -> Result<Json<ApiResponse<MaterialResponse>>, AppError> {
    let material = MaterialService::create_material(&state.db, dto).await?;
    Ok(Json(ApiResponse::ok(material)))
}

#[utoipa::path(
    put,
    path = "/api/materials/{id}",
    params(
        ("id" = Uuid, Path, description = "Material ID")
    ),
    request_body = UpdateMaterialDto,
    responses(
        (status = 200, description = "Material updated", body = MaterialResponse),
        (status = 400, description = "Grade level out of range"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Material or subject not found")
    ),
    tag = "Materials",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn update_material(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateMaterialDto>,
) -> Result<Json<ApiResponse<MaterialResponse>>, AppError> {
    let material = MaterialService::update_material(&state.db, id, dto).await?;
    Ok(Json(ApiResponse::ok(material)))
}

#[utoipa::path(
    delete,
    path = "/api/materials/{id}",
    params(
        ("id" = Uuid, Path, description = "Material ID")
    ),
    responses(
        (status = 200, description = "Material deleted"),
        (status = 400, description = "Material has issuance records"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Material not found")
    ),
    tag = "Materials",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_material(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    MaterialService::delete_material(&state.db, id).await?;
    Ok(Json(ApiResponse::message("Material deleted successfully")))
}

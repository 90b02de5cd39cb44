use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
};
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::auth::AuthUser;
use crate::modules::users::model::{
    ChangePasswordDto, CreateUserDto, UpdateUserDto, User, UserFilterParams,
};
use crate::modules::users::service::UserService;
use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::utils::response::ApiResponse;
use crate::validator::ValidatedJson;

#[utoipa::path(
    get,
    path = "/api/users",
    params(
        ("search" = Option<String>, Query, description = "Match username or display name"),
        ("role" = Option<String>, Query, description = "Filter by role: ADMIN or USER"),
        ("page" = Option<i64>, Query, description = "Page number (1-based)"),
        ("limit" = Option<i64>, Query, description = "Page size")
    ),
    responses(
        (status = 200, description = "Paginated list of users"),
        (status = 400, description = "Invalid query parameters"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Requires an admin account")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, filters))]
pub async fn get_users(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    filters: Result<Query<UserFilterParams>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<User>>>, AppError> {
    let Query(filters) = filters
        .map_err(|e| AppError::bad_request(anyhow::anyhow!("Invalid query parameters: {}", e)))?;

    let (users, meta) = UserService::get_all_users(&state.db, filters).await?;
    Ok(Json(ApiResponse::paginated(users, meta)))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User details", body = User),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Requires an admin account"),
        (status = 404, description = "User not found")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<User>>, AppError> {
    let user = UserService::get_user_by_id(&state.db, id).await?;
    Ok(Json(ApiResponse::ok(user)))
}

#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserDto,
    responses(
        (status = 200, description = "User created", body = User),
        (status = 400, description = "Missing required fields or username taken"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Requires an admin account")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn create_user(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<CreateUserDto>,
) -> Result<Json<ApiResponse<User>>, AppError> {
    let user = UserService::create_user(&state.db, dto).await?;
    Ok(Json(ApiResponse::ok_with_message(
        user,
        "User created successfully",
    )))
}

#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    request_body = UpdateUserDto,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 400, description = "Username taken"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Requires an admin account"),
        (status = 404, description = "User not found")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn update_user(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateUserDto>,
) -> Result<Json<ApiResponse<User>>, AppError> {
    let user = UserService::update_user(&state.db, id, dto).await?;
    Ok(Json(ApiResponse::ok_with_message(
        user,
        "User updated successfully",
    )))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User deleted"),
        (status = 400, description = "Admin accounts cannot be deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Requires an admin account"),
        (status = 404, description = "User not found")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    UserService::delete_user(&state.db, id).await?;
    Ok(Json(ApiResponse::message("User deleted successfully")))
}

#[utoipa::path(
    put,
    path = "/api/users/{id}/password",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    request_body = ChangePasswordDto,
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "Missing fields, short password, or wrong current password"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Requires an admin account"),
        (status = 404, description = "User not found")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn change_password(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<ChangePasswordDto>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    UserService::change_password(&state.db, id, dto).await?;
    Ok(Json(ApiResponse::message("Password changed successfully")))
}

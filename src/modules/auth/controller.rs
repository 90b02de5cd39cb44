use axum::{Json, extract::State};
use tracing::instrument;

use crate::modules::auth::model::{LoginRequest, LoginResponse};
use crate::modules::auth::service::AuthService;
use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::utils::response::ApiResponse;
use crate::validator::ValidatedJson;

/// The only unauthenticated API route.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Missing username or password"),
        (status = 401, description = "Invalid username or password")
    ),
    tag = "Authentication"
)]
#[instrument(skip(state, dto))]
pub async fn login_user(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, AppError> {
    let login_response = AuthService::login_user(&state.db, dto, &state.jwt_config).await?;
    Ok(Json(ApiResponse::ok_with_message(
        login_response,
        "Login successful",
    )))
}

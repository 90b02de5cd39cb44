use axum::{Json, extract::State};
use tracing::instrument;

use crate::middleware::auth::AuthUser;
use crate::modules::subjects::model::{CreateSubjectDto, Subject, SubjectWithCount};
use crate::modules::subjects::service::SubjectService;
use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::utils::response::ApiResponse;
use crate::validator::ValidatedJson;

#[utoipa::path(
    get,
    path = "/api/subjects",
    responses(
        (status = 200, description = "List of subjects with material counts"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Subjects",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_subjects(
    State(state): State<AppState>,
    _auth_user: AuthUser,
) -> Result<Json<ApiResponse<Vec<SubjectWithCount>>>, AppError> {
    let subjects = SubjectService::get_all_subjects(&state.db).await?;
    Ok(Json(ApiResponse::ok(subjects)))
}

#[utoipa::path(
    post,
    path = "/api/subjects",
    request_body = CreateSubjectDto,
    responses(
        (status = 200, description = "Subject created", body = Subject),
        (status = 400, description = "Missing name or education stage, or duplicate subject"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Subjects",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn create_subject(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<CreateSubjectDto>,
) -> Result<Json<ApiResponse<Subject>>, AppError> {
    let subject = SubjectService::create_subject(&state.db, dto).await?;
    Ok(Json(ApiResponse::ok(subject)))
}

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::modules::auth::model::{LoginRequest, LoginResponse};
use crate::modules::history::model::{
    HistoryDetailResponse, HistoryListItem, HistoryMaterial, HistorySchool, HistorySubject,
};
use crate::modules::issuances::model::{
    CompleteIssuanceDto, CompletedIssuance, CompletedWithIssuance, CreateIssuanceDto,
    IssuanceEmbed, IssuanceResponse, UpdateIssuanceDto,
};
use crate::modules::materials::model::{
    CreateMaterialDto, Material, MaterialDetailResponse, MaterialIssuanceItem, MaterialResponse,
    MaterialWithSubject, UpdateMaterialDto,
};
use crate::modules::schools::model::{
    CreateSchoolDto, School, SchoolDetailResponse, SchoolIssuanceItem, SchoolType,
    SchoolWithCount, UpdateSchoolDto,
};
use crate::modules::subjects::model::{
    CreateSubjectDto, EducationStage, Subject, SubjectWithCount,
};
use crate::modules::users::model::{
    ChangePasswordDto, CreateUserDto, UpdateUserDto, User, UserRole, UserSummary,
};
use crate::utils::pagination::{PaginationMeta, PaginationParams};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::auth::controller::login_user,
        crate::modules::subjects::controller::get_subjects,
        crate::modules::subjects::controller::create_subject,
        crate::modules::materials::controller::get_materials,
        crate::modules::materials::controller::get_material,
        crate::modules::materials::controller::create_material,
        crate::modules::materials::controller::update_material,
        crate::modules::materials::controller::delete_material,
        crate::modules::schools::controller::get_schools,
        crate::modules::schools::controller::get_school,
        crate::modules::schools::controller::create_school,
        crate::modules::schools::controller::update_school,
        crate::modules::schools::controller::delete_school,
        crate::modules::issuances::controller::get_issuances,
        crate::modules::issuances::controller::get_issuance,
        crate::modules::issuances::controller::create_issuance,
        crate::modules::issuances::controller::update_issuance,
        crate::modules::issuances::controller::delete_issuance,
        crate::modules::issuances::controller::complete_issuance,
        crate::modules::history::controller::get_history,
        crate::modules::history::controller::get_history_record,
        crate::modules::history::controller::delete_history_record,
        crate::modules::export::controller::export_history,
        crate::modules::export::controller::export_materials,
        crate::modules::export::controller::export_schools,
        crate::modules::users::controller::get_users,
        crate::modules::users::controller::get_user,
        crate::modules::users::controller::create_user,
        crate::modules::users::controller::update_user,
        crate::modules::users::controller::delete_user,
        crate::modules::users::controller::change_password,
    ),
    components(
        schemas(
            EducationStage,
            Subject,
            SubjectWithCount,
            CreateSubjectDto,
            Material,
            MaterialWithSubject,
            MaterialResponse,
            MaterialIssuanceItem,
            MaterialDetailResponse,
            CreateMaterialDto,
            UpdateMaterialDto,
            SchoolType,
            School,
            SchoolWithCount,
            SchoolIssuanceItem,
            SchoolDetailResponse,
            CreateSchoolDto,
            UpdateSchoolDto,
            CompletedIssuance,
            IssuanceEmbed,
            IssuanceResponse,
            CompletedWithIssuance,
            CreateIssuanceDto,
            UpdateIssuanceDto,
            CompleteIssuanceDto,
            HistoryMaterial,
            HistorySubject,
            HistorySchool,
            HistoryListItem,
            HistoryDetailResponse,
            User,
            UserRole,
            UserSummary,
            CreateUserDto,
            UpdateUserDto,
            ChangePasswordDto,
            LoginRequest,
            LoginResponse,
            PaginationMeta,
            PaginationParams,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Login and session tokens"),
        (name = "Subjects", description = "Subject catalog"),
        (name = "Materials", description = "Learning material inventory"),
        (name = "Schools", description = "School directory"),
        (name = "Issuances", description = "Stock issuance workflow"),
        (name = "History", description = "Completed delivery records"),
        (name = "Export", description = "CSV exports"),
        (name = "Users", description = "Account management (admin only)")
    ),
    info(
        title = "LRIMS API",
        version = "0.1.0",
        description = "Learning Resource Inventory Management System: subjects, materials, schools, issuance tracking, and delivery history for a schools division office. Built with Axum and PostgreSQL, with JWT-based authentication.",
        contact(
            name = "API Support"
        ),
        license(
            name = "MIT"
        )
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}

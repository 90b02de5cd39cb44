//! Material data models and DTOs.
//!
//! Materials are the inventory unit of the catalog. The database stores
//! grade levels in display form ("Grade 3"); the API boundary converts to
//! and from the bare integer, and responses expose the stored `title` under
//! both `title` and `name`.
//!
//! # Core Types
//!
//! - [`Material`] - Base material entity from the database
//! - [`MaterialWithSubject`] - Material with its subject embedded, as stored
//! - [`MaterialResponse`] - API shape with numeric grade level and `name` alias
//! - [`MaterialDetailResponse`] - Response shape with recent issuances
//!
//! # Request DTOs
//!
//! - [`CreateMaterialDto`] - Create a new material
//! - [`UpdateMaterialDto`] - Partially update a material
//! - [`MaterialFilterParams`] - Query parameters for filtering materials

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::modules::schools::model::School;
use crate::modules::subjects::model::{EducationStage, Subject};
use crate::modules::users::model::UserSummary;
use crate::utils::pagination::PaginationParams;
use crate::utils::serde::{
    deserialize_optional_flexible_i32, deserialize_optional_from_str, deserialize_optional_i64,
    deserialize_optional_uuid,
};

/// Extracts the numeric part of a stored grade level ("Grade 7" -> 7).
///
/// Returns 0 when the string carries no digits.
pub fn parse_grade_level(grade_level: &str) -> i32 {
    let digits: String = grade_level
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}

/// Formats a numeric grade level into the stored form ("Grade 7").
pub fn format_grade_level(grade_level: i32) -> String {
    format!("Grade {}", grade_level)
}

/// A material as stored in the database.
///
/// `grade_level` is the display string and `education_stage` is the copy
/// denormalized from the owning subject.
#[derive(Serialize, Deserialize, FromRow, Debug, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    pub id: Uuid,
    pub title: String,
    pub grade_level: String,
    pub education_stage: EducationStage,
    pub quantity: i32,
    pub source: Option<String>,
    pub subject_id: Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// A material with its subject embedded, both in stored form.
///
/// Used inside issuance and delivery-history responses.
#[derive(Serialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaterialWithSubject {
    #[serde(flatten)]
    pub material: Material,
    pub subject: Subject,
}

/// Flat row for a material joined to its subject.
#[derive(FromRow, Debug, Clone)]
pub struct MaterialWithSubjectRow {
    pub id: Uuid,
    pub title: String,
    pub grade_level: String,
    pub education_stage: EducationStage,
    pub quantity: i32,
    pub source: Option<String>,
    pub subject_id: Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub subject_name: String,
    pub subject_category: Option<String>,
    pub subject_strand: Option<String>,
    pub subject_education_stage: EducationStage,
    pub subject_created_at: chrono::DateTime<chrono::Utc>,
    pub subject_updated_at: chrono::DateTime<chrono::Utc>,
}

impl MaterialWithSubjectRow {
    /// Splits the flat row into the material and its subject.
    pub fn into_parts(self) -> (Material, Subject) {
        let subject = Subject {
            id: self.subject_id,
            name: self.subject_name,
            category: self.subject_category,
            strand: self.subject_strand,
            education_stage: self.subject_education_stage,
            created_at: self.subject_created_at,
            updated_at: self.subject_updated_at,
        };
        let material = Material {
            id: self.id,
            title: self.title,
            grade_level: self.grade_level,
            education_stage: self.education_stage,
            quantity: self.quantity,
            source: self.source,
            subject_id: self.subject_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        };
        (material, subject)
    }
}

/// The material shape the catalog endpoints return.
///
/// Carries the stored `title` under both keys and the grade level as a
/// bare integer.
#[derive(Serialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaterialResponse {
    pub id: Uuid,
    pub title: String,
    pub name: String,
    pub grade_level: i32,
    pub education_stage: EducationStage,
    pub quantity: i32,
    pub source: Option<String>,
    pub subject_id: Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub subject: Subject,
}

impl MaterialResponse {
    pub fn from_parts(material: Material, subject: Subject) -> Self {
        MaterialResponse {
            id: material.id,
            name: material.title.clone(),
            title: material.title,
            grade_level: parse_grade_level(&material.grade_level),
            education_stage: material.education_stage,
            quantity: material.quantity,
            source: material.source,
            subject_id: material.subject_id,
            created_at: material.created_at,
            updated_at: material.updated_at,
            subject,
        }
    }
}

impl From<MaterialWithSubjectRow> for MaterialResponse {
    fn from(row: MaterialWithSubjectRow) -> Self {
        let (material, subject) = row.into_parts();
        MaterialResponse::from_parts(material, subject)
    }
}

/// Flat row for one of a material's recent issuances.
#[derive(FromRow, Debug, Clone)]
pub struct MaterialIssuanceRow {
    pub id: Uuid,
    pub material_id: Uuid,
    pub school_id: Uuid,
    pub user_id: Uuid,
    pub quantity: i32,
    pub issued_at: chrono::DateTime<chrono::Utc>,
    pub remarks: Option<String>,
    pub s_school_id: String,
    pub s_schoolname: String,
    pub s_schooltype: crate::modules::schools::model::SchoolType,
    pub s_municipality: String,
    pub s_congressional_district: i32,
    pub s_zone: Option<String>,
    pub s_created_at: chrono::DateTime<chrono::Utc>,
    pub s_updated_at: chrono::DateTime<chrono::Utc>,
    pub u_username: String,
}

/// An issuance embedded in a material detail response.
#[derive(Serialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaterialIssuanceItem {
    pub id: Uuid,
    pub material_id: Uuid,
    pub school_id: Uuid,
    pub user_id: Uuid,
    pub quantity: i32,
    pub issued_at: chrono::DateTime<chrono::Utc>,
    pub remarks: Option<String>,
    pub school: School,
    pub user: UserSummary,
}

impl From<MaterialIssuanceRow> for MaterialIssuanceItem {
    fn from(row: MaterialIssuanceRow) -> Self {
        let school = School {
            id: row.school_id,
            school_id: row.s_school_id,
            name: row.s_schoolname.clone(),
            schoolname: row.s_schoolname,
            schooltype: row.s_schooltype,
            municipality: row.s_municipality,
            congressional_district: row.s_congressional_district,
            zone: row.s_zone,
            created_at: row.s_created_at,
            updated_at: row.s_updated_at,
        };
        let user = UserSummary {
            id: row.user_id,
            username: row.u_username,
        };
        MaterialIssuanceItem {
            id: row.id,
            material_id: row.material_id,
            school_id: row.school_id,
            user_id: row.user_id,
            quantity: row.quantity,
            issued_at: row.issued_at,
            remarks: row.remarks,
            school,
            user,
        }
    }
}

/// Material detail: the material plus its ten most recent issuances.
#[derive(Serialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaterialDetailResponse {
    #[serde(flatten)]
    pub material: MaterialResponse,
    pub issuances: Vec<MaterialIssuanceItem>,
}

/// DTO for creating a new material.
///
/// `name`, `gradeLevel` and `subjectId` are required; their presence is
/// checked in the service so the error message can name all three at once.
/// The grade level accepts either a JSON number or a numeric string.
#[derive(Deserialize, Debug, Clone, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateMaterialDto {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_flexible_i32")]
    #[validate(range(min = 1, max = 12, message = "Grade level must be between 1 and 12"))]
    pub grade_level: Option<i32>,
    pub quantity: Option<i32>,
    pub source: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub subject_id: Option<Uuid>,
}

/// DTO for partially updating a material.
///
/// Absent fields are left untouched. Supplying `subjectId` re-syncs the
/// denormalized education stage from the new subject.
#[derive(Deserialize, Debug, Clone, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMaterialDto {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_flexible_i32")]
    #[validate(range(min = 1, max = 12, message = "Grade level must be between 1 and 12"))]
    pub grade_level: Option<i32>,
    pub quantity: Option<i32>,
    pub source: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub subject_id: Option<Uuid>,
}

/// Query parameters for filtering materials.
///
/// All filters are optional and can be combined.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaterialFilterParams {
    /// Case-insensitive substring match on the title
    pub search: Option<String>,
    /// Numeric grade level; matches materials stored as "Grade N"
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub grade_level: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub subject_id: Option<Uuid>,
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub education_stage: Option<EducationStage>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

//! School directory models and DTOs.
//!
//! Every school carries a display identifier ("SCH-000001") allocated by
//! the database on insert, and responses expose the stored `schoolname`
//! under both `schoolname` and `name`.
//!
//! # Core Types
//!
//! - [`SchoolType`] - The closed set of school types
//! - [`School`] - Base school entity from the database
//! - [`SchoolWithCount`] - School with its issuance count, for listings
//! - [`SchoolDetailResponse`] - School with recent issuances embedded
//!
//! # Request DTOs
//!
//! - [`CreateSchoolDto`] - Register a new school
//! - [`UpdateSchoolDto`] - Partially update a school
//! - [`SchoolFilterParams`] - Query parameters for filtering schools

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::modules::issuances::model::CompletedIssuance;
use crate::modules::materials::model::Material;
use crate::modules::subjects::model::EducationStage;
use crate::modules::users::model::UserSummary;
use crate::utils::pagination::PaginationParams;
use crate::utils::serde::{
    deserialize_optional_flexible_i32, deserialize_optional_from_str, deserialize_optional_i64,
};

/// Type of school.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SchoolType {
    Elementary,
    Secondary,
    Integrated,
}

impl std::fmt::Display for SchoolType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SchoolType::Elementary => "ELEMENTARY",
            SchoolType::Secondary => "SECONDARY",
            SchoolType::Integrated => "INTEGRATED",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for SchoolType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ELEMENTARY" => Ok(SchoolType::Elementary),
            "SECONDARY" => Ok(SchoolType::Secondary),
            "INTEGRATED" => Ok(SchoolType::Integrated),
            _ => Err(format!("Unknown school type: {}", s)),
        }
    }
}

/// A school in the directory.
///
/// Queries that map this struct directly must alias `schoolname AS name`
/// so both keys appear in responses.
#[derive(Serialize, Deserialize, FromRow, Debug, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct School {
    pub id: Uuid,
    pub school_id: String,
    pub schoolname: String,
    pub name: String,
    pub schooltype: SchoolType,
    pub municipality: String,
    pub congressional_district: i32,
    pub zone: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Columns for a school row, with the `name` alias included.
pub const SCHOOL_COLUMNS: &str =
    "id, school_id, schoolname, schoolname AS name, schooltype, municipality, congressional_district, zone, created_at, updated_at";

/// A school together with the number of issuances recorded against it.
#[derive(Serialize, FromRow, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SchoolWithCount {
    pub id: Uuid,
    pub school_id: String,
    pub schoolname: String,
    pub name: String,
    pub schooltype: SchoolType,
    pub municipality: String,
    pub congressional_district: i32,
    pub zone: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub issuance_count: i64,
}

/// Flat row for one of a school's recent issuances.
#[derive(FromRow, Debug, Clone)]
pub struct SchoolIssuanceRow {
    pub id: Uuid,
    pub material_id: Uuid,
    pub school_id: Uuid,
    pub user_id: Uuid,
    pub quantity: i32,
    pub issued_at: chrono::DateTime<chrono::Utc>,
    pub remarks: Option<String>,
    pub m_title: String,
    pub m_grade_level: String,
    pub m_education_stage: EducationStage,
    pub m_quantity: i32,
    pub m_source: Option<String>,
    pub m_subject_id: Uuid,
    pub m_created_at: chrono::DateTime<chrono::Utc>,
    pub m_updated_at: chrono::DateTime<chrono::Utc>,
    pub u_username: String,
    pub ci_id: Option<Uuid>,
    pub ci_quantity: Option<i32>,
    pub ci_date_issued: Option<chrono::DateTime<chrono::Utc>>,
    pub ci_delivered_at: Option<chrono::DateTime<chrono::Utc>>,
    pub ci_received_by: Option<String>,
    pub ci_remarks: Option<String>,
}

/// An issuance embedded in a school detail response.
///
/// The material is the stored row; the completed record is present only
/// when the issuance has been delivered.
#[derive(Serialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SchoolIssuanceItem {
    pub id: Uuid,
    pub material_id: Uuid,
    pub school_id: Uuid,
    pub user_id: Uuid,
    pub quantity: i32,
    pub issued_at: chrono::DateTime<chrono::Utc>,
    pub remarks: Option<String>,
    pub material: Material,
    pub user: UserSummary,
    pub completed_issuance: Option<CompletedIssuance>,
}

impl From<SchoolIssuanceRow> for SchoolIssuanceItem {
    fn from(row: SchoolIssuanceRow) -> Self {
        let material = Material {
            id: row.material_id,
            title: row.m_title,
            grade_level: row.m_grade_level,
            education_stage: row.m_education_stage,
            quantity: row.m_quantity,
            source: row.m_source,
            subject_id: row.m_subject_id,
            created_at: row.m_created_at,
            updated_at: row.m_updated_at,
        };
        let user = UserSummary {
            id: row.user_id,
            username: row.u_username,
        };
        let completed_issuance = row.ci_id.map(|ci_id| CompletedIssuance {
            id: ci_id,
            issuance_id: row.id,
            material_id: row.material_id,
            school_id: row.school_id,
            quantity: row.ci_quantity.unwrap_or(row.quantity),
            date_issued: row.ci_date_issued.unwrap_or(row.issued_at),
            delivered_at: row.ci_delivered_at.unwrap_or(row.issued_at),
            received_by: row.ci_received_by,
            remarks: row.ci_remarks,
        });
        SchoolIssuanceItem {
            id: row.id,
            material_id: row.material_id,
            school_id: row.school_id,
            user_id: row.user_id,
            quantity: row.quantity,
            issued_at: row.issued_at,
            remarks: row.remarks,
            material,
            user,
            completed_issuance,
        }
    }
}

/// School detail: the school, its issuance count, and its twenty most
/// recent issuances.
#[derive(Serialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SchoolDetailResponse {
    #[serde(flatten)]
    pub school: School,
    pub issuance_count: i64,
    pub issuances: Vec<SchoolIssuanceItem>,
}

/// DTO for registering a new school.
///
/// Required fields are checked in the service so the error message can
/// name them all at once. The congressional district accepts a JSON
/// number or a numeric string.
#[derive(Deserialize, Debug, Clone, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSchoolDto {
    pub schoolname: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub schooltype: Option<SchoolType>,
    pub municipality: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_flexible_i32")]
    #[validate(range(min = 1, max = 2, message = "Congressional district must be 1 or 2"))]
    pub congressional_district: Option<i32>,
    pub zone: Option<String>,
}

/// DTO for partially updating a school.
#[derive(Deserialize, Debug, Clone, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSchoolDto {
    pub schoolname: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub schooltype: Option<SchoolType>,
    pub municipality: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_flexible_i32")]
    #[validate(range(min = 1, max = 2, message = "Congressional district must be 1 or 2"))]
    pub congressional_district: Option<i32>,
    pub zone: Option<String>,
}

/// Query parameters for filtering schools.
///
/// All filters are optional and can be combined.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SchoolFilterParams {
    /// Case-insensitive substring match on the school name
    pub search: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "deserialize_optional_from_str")]
    pub schooltype: Option<SchoolType>,
    /// Case-insensitive substring match on the municipality
    pub municipality: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub congressional_district: Option<i64>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_school_type_parse_round_trips() {
        for schooltype in [
            SchoolType::Elementary,
            SchoolType::Secondary,
            SchoolType::Integrated,
        ] {
            let parsed = SchoolType::from_str(&schooltype.to_string()).unwrap();
            assert_eq!(parsed, schooltype);
        }
    }

    #[test]
    fn test_school_type_rejects_unknown_value() {
        assert!(SchoolType::from_str("PRIMARY").is_err());
    }

    #[test]
    fn test_create_dto_accepts_string_district() {
        let dto: CreateSchoolDto = serde_json::from_str(
            r#"{"schoolname": "Mabini Elementary School", "schooltype": "ELEMENTARY", "municipality": "Mabini", "congressionalDistrict": "2"}"#,
        )
        .unwrap();
        assert_eq!(dto.congressional_district, Some(2));
    }

    #[test]
    fn test_congressional_district_range_is_validated() {
        use validator::Validate;

        let dto: CreateSchoolDto =
            serde_json::from_str(r#"{"schoolname": "X", "congressionalDistrict": 3}"#).unwrap();
        let err = dto.validate().unwrap_err();
        assert!(err.to_string().contains("Congressional district must be 1 or 2"));
    }

    #[test]
    fn test_filter_params_type_key() {
        let filters: SchoolFilterParams =
            serde_json::from_str(r#"{"type": "INTEGRATED", "municipality": "Monkayo"}"#).unwrap();
        assert_eq!(filters.schooltype, Some(SchoolType::Integrated));
        assert_eq!(filters.municipality.as_deref(), Some("Monkayo"));
    }
}

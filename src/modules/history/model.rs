//! Delivery-history types.
//!
//! History rows are completed-issuance records joined to the material and
//! school they belong to. The list shape carries trimmed summaries; the
//! detail shape carries the full related entities.

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::modules::issuances::model::CompletedIssuance;
use crate::modules::materials::model::{Material, MaterialWithSubject};
use crate::modules::schools::model::{School, SchoolType};
use crate::modules::subjects::model::{EducationStage, Subject};
use crate::utils::pagination::PaginationParams;
use crate::utils::serde::{deserialize_optional_datetime, deserialize_optional_uuid};

/// Flat row for a history listing: the delivery record plus material,
/// subject-name, and school summary columns.
#[derive(FromRow, Debug, Clone)]
pub struct HistoryRow {
    pub id: Uuid,
    pub issuance_id: Uuid,
    pub material_id: Uuid,
    pub school_id: Uuid,
    pub quantity: i32,
    pub date_issued: chrono::DateTime<chrono::Utc>,
    pub delivered_at: chrono::DateTime<chrono::Utc>,
    pub received_by: Option<String>,
    pub remarks: Option<String>,
    pub m_title: String,
    pub m_grade_level: String,
    pub m_education_stage: EducationStage,
    pub sub_name: String,
    pub s_schoolname: String,
    pub s_municipality: String,
    pub s_congressional_district: i32,
}

/// Material summary inside a history listing. Grade level stays in its
/// stored display form.
#[derive(Serialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryMaterial {
    pub id: Uuid,
    pub title: String,
    pub grade_level: String,
    pub education_stage: EducationStage,
    pub subject: HistorySubject,
}

#[derive(Serialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistorySubject {
    pub name: String,
}

/// School summary inside a history listing, with `name` mirroring
/// `schoolname`.
#[derive(Serialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistorySchool {
    pub id: Uuid,
    pub schoolname: String,
    pub name: String,
    pub municipality: String,
    pub congressional_district: i32,
}

/// One entry in the delivery-history listing.
#[derive(Serialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryListItem {
    #[serde(flatten)]
    pub record: CompletedIssuance,
    pub material: HistoryMaterial,
    pub school: HistorySchool,
}

impl From<HistoryRow> for HistoryListItem {
    fn from(row: HistoryRow) -> Self {
        Self {
            record: CompletedIssuance {
                id: row.id,
                issuance_id: row.issuance_id,
                material_id: row.material_id,
                school_id: row.school_id,
                quantity: row.quantity,
                date_issued: row.date_issued,
                delivered_at: row.delivered_at,
                received_by: row.received_by,
                remarks: row.remarks,
            },
            material: HistoryMaterial {
                id: row.material_id,
                title: row.m_title,
                grade_level: row.m_grade_level,
                education_stage: row.m_education_stage,
                subject: HistorySubject { name: row.sub_name },
            },
            school: HistorySchool {
                id: row.school_id,
                schoolname: row.s_schoolname.clone(),
                name: row.s_schoolname,
                municipality: row.s_municipality,
                congressional_district: row.s_congressional_district,
            },
        }
    }
}

/// Flat row for a single history record with the full material, subject,
/// and school columns.
#[derive(FromRow, Debug, Clone)]
pub struct HistoryDetailRow {
    pub id: Uuid,
    pub issuance_id: Uuid,
    pub material_id: Uuid,
    pub school_id: Uuid,
    pub quantity: i32,
    pub date_issued: chrono::DateTime<chrono::Utc>,
    pub delivered_at: chrono::DateTime<chrono::Utc>,
    pub received_by: Option<String>,
    pub remarks: Option<String>,
    pub m_title: String,
    pub m_grade_level: String,
    pub m_education_stage: EducationStage,
    pub m_quantity: i32,
    pub m_source: Option<String>,
    pub m_created_at: chrono::DateTime<chrono::Utc>,
    pub m_updated_at: chrono::DateTime<chrono::Utc>,
    pub sub_id: Uuid,
    pub sub_name: String,
    pub sub_category: Option<String>,
    pub sub_strand: Option<String>,
    pub sub_education_stage: EducationStage,
    pub sub_created_at: chrono::DateTime<chrono::Utc>,
    pub sub_updated_at: chrono::DateTime<chrono::Utc>,
    pub s_school_id: String,
    pub s_schoolname: String,
    pub s_schooltype: SchoolType,
    pub s_municipality: String,
    pub s_congressional_district: i32,
    pub s_zone: Option<String>,
    pub s_created_at: chrono::DateTime<chrono::Utc>,
    pub s_updated_at: chrono::DateTime<chrono::Utc>,
}

/// A single delivery record with its full material and school.
#[derive(Serialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryDetailResponse {
    #[serde(flatten)]
    pub record: CompletedIssuance,
    pub material: MaterialWithSubject,
    pub school: School,
}

impl From<HistoryDetailRow> for HistoryDetailResponse {
    fn from(row: HistoryDetailRow) -> Self {
        Self {
            record: CompletedIssuance {
                id: row.id,
                issuance_id: row.issuance_id,
                material_id: row.material_id,
                school_id: row.school_id,
                quantity: row.quantity,
                date_issued: row.date_issued,
                delivered_at: row.delivered_at,
                received_by: row.received_by,
                remarks: row.remarks,
            },
            material: MaterialWithSubject {
                material: Material {
                    id: row.material_id,
                    title: row.m_title,
                    grade_level: row.m_grade_level,
                    education_stage: row.m_education_stage,
                    quantity: row.m_quantity,
                    source: row.m_source,
                    subject_id: row.sub_id,
                    created_at: row.m_created_at,
                    updated_at: row.m_updated_at,
                },
                subject: Subject {
                    id: row.sub_id,
                    name: row.sub_name,
                    category: row.sub_category,
                    strand: row.sub_strand,
                    education_stage: row.sub_education_stage,
                    created_at: row.sub_created_at,
                    updated_at: row.sub_updated_at,
                },
            },
            school: School {
                id: row.school_id,
                school_id: row.s_school_id,
                schoolname: row.s_schoolname.clone(),
                name: row.s_schoolname,
                schooltype: row.s_schooltype,
                municipality: row.s_municipality,
                congressional_district: row.s_congressional_district,
                zone: row.s_zone,
                created_at: row.s_created_at,
                updated_at: row.s_updated_at,
            },
        }
    }
}

/// Delivery-history filters. Dates bound either side of `deliveredAt`;
/// the search term matches material title, school name, or remarks.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub school_id: Option<Uuid>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub material_id: Option<Uuid>,
    pub search: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_datetime")]
    pub start_date: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default, deserialize_with = "deserialize_optional_datetime")]
    pub end_date: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

//! Filter parameters and row shapes for the CSV export endpoints.

use serde::Deserialize;
use sqlx::prelude::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::modules::schools::model::SchoolType;
use crate::modules::subjects::model::EducationStage;
use crate::utils::serde::{
    deserialize_optional_datetime, deserialize_optional_from_str, deserialize_optional_i64,
    deserialize_optional_uuid,
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryExportParams {
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub school_id: Option<Uuid>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub material_id: Option<Uuid>,
    #[serde(default, deserialize_with = "deserialize_optional_datetime")]
    pub start_date: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default, deserialize_with = "deserialize_optional_datetime")]
    pub end_date: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaterialExportParams {
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub education_stage: Option<EducationStage>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub subject_id: Option<Uuid>,
}

/// School export filters. Municipality is an exact match here, unlike the
/// listing filter.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SchoolExportParams {
    #[serde(rename = "type", default, deserialize_with = "deserialize_optional_from_str")]
    pub schooltype: Option<SchoolType>,
    pub municipality: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub congressional_district: Option<i64>,
}

#[derive(FromRow, Debug, Clone)]
pub struct HistoryExportRow {
    pub quantity: i32,
    pub date_issued: chrono::DateTime<chrono::Utc>,
    pub delivered_at: chrono::DateTime<chrono::Utc>,
    pub remarks: Option<String>,
    pub m_title: String,
    pub m_grade_level: String,
    pub m_education_stage: EducationStage,
    pub sub_name: String,
    pub s_schoolname: String,
    pub s_municipality: String,
    pub s_congressional_district: i32,
}

#[derive(FromRow, Debug, Clone)]
pub struct MaterialExportRow {
    pub title: String,
    pub grade_level: String,
    pub education_stage: EducationStage,
    pub quantity: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub sub_name: String,
}

#[derive(FromRow, Debug, Clone)]
pub struct SchoolExportRow {
    pub school_id: String,
    pub schoolname: String,
    pub schooltype: SchoolType,
    pub municipality: String,
    pub congressional_district: i32,
    pub zone: Option<String>,
}

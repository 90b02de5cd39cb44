//! Issuance workflow models and DTOs.
//!
//! An issuance starts PENDING and becomes COMPLETED when a delivery record
//! is written for it. Status is never stored; it is derived from the
//! presence of that record.
//!
//! # Core Types
//!
//! - [`CompletedIssuance`] - The delivery record closing an issuance
//! - [`IssuanceEmbed`] - An issuance with material, school, and user embedded
//! - [`IssuanceResponse`] - The issuance shape list/detail endpoints return
//! - [`CompletedWithIssuance`] - Response shape of the completion endpoint
//!
//! # Request DTOs
//!
//! - [`CreateIssuanceDto`] - Issue stock to a school
//! - [`UpdateIssuanceDto`] - Adjust a pending issuance
//! - [`CompleteIssuanceDto`] - Record the delivery of an issuance
//! - [`IssuanceFilterParams`] - Query parameters for filtering issuances

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::modules::materials::model::{Material, MaterialWithSubject};
use crate::modules::schools::model::{School, SchoolType};
use crate::modules::subjects::model::{EducationStage, Subject};
use crate::modules::users::model::UserSummary;
use crate::utils::pagination::PaginationParams;
use crate::utils::serde::{deserialize_optional_datetime, deserialize_optional_uuid};

/// Derived status of an issuance on the wire.
pub const STATUS_PENDING: &str = "PENDING";
/// Derived status of a delivered issuance on the wire.
pub const STATUS_COMPLETED: &str = "COMPLETED";

/// The delivery record that closes an issuance.
///
/// Material, school, quantity, and issue date are snapshotted from the
/// issuance at completion time.
#[derive(Serialize, Deserialize, FromRow, Debug, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompletedIssuance {
    pub id: Uuid,
    pub issuance_id: Uuid,
    pub material_id: Uuid,
    pub school_id: Uuid,
    pub quantity: i32,
    pub date_issued: chrono::DateTime<chrono::Utc>,
    pub delivered_at: chrono::DateTime<chrono::Utc>,
    pub received_by: Option<String>,
    pub remarks: Option<String>,
}

/// Flat row for an issuance joined to its material (with subject), school,
/// user, and optional delivery record.
#[derive(FromRow, Debug, Clone)]
pub struct IssuanceRow {
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
    pub u_username: String,
    pub ci_id: Option<Uuid>,
    pub ci_quantity: Option<i32>,
    pub ci_date_issued: Option<chrono::DateTime<chrono::Utc>>,
    pub ci_delivered_at: Option<chrono::DateTime<chrono::Utc>>,
    pub ci_received_by: Option<String>,
    pub ci_remarks: Option<String>,
}

impl IssuanceRow {
    /// Builds the delivery record embed when one exists.
    fn completed_record(&self) -> Option<CompletedIssuance> {
        self.ci_id.map(|ci_id| CompletedIssuance {
            id: ci_id,
            issuance_id: self.id,
            material_id: self.material_id,
            school_id: self.school_id,
            quantity: self.ci_quantity.unwrap_or(self.quantity),
            date_issued: self.ci_date_issued.unwrap_or(self.issued_at),
            delivered_at: self.ci_delivered_at.unwrap_or(self.issued_at),
            received_by: self.ci_received_by.clone(),
            remarks: self.ci_remarks.clone(),
        })
    }
}

/// An issuance with its related entities embedded.
#[derive(Serialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssuanceEmbed {
    pub id: Uuid,
    pub material_id: Uuid,
    pub school_id: Uuid,
    pub user_id: Uuid,
    pub quantity: i32,
    pub issued_at: chrono::DateTime<chrono::Utc>,
    pub remarks: Option<String>,
    pub material: MaterialWithSubject,
    pub school: School,
    pub user: UserSummary,
}

impl From<IssuanceRow> for IssuanceEmbed {
    fn from(row: IssuanceRow) -> Self {
        let subject = Subject {
            id: row.sub_id,
            name: row.sub_name,
            category: row.sub_category,
            strand: row.sub_strand,
            education_stage: row.sub_education_stage,
            created_at: row.sub_created_at,
            updated_at: row.sub_updated_at,
        };
        let material = MaterialWithSubject {
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
            subject,
        };
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
        IssuanceEmbed {
            id: row.id,
            material_id: row.material_id,
            school_id: row.school_id,
            user_id: row.user_id,
            quantity: row.quantity,
            issued_at: row.issued_at,
            remarks: row.remarks,
            material,
            school,
            user,
        }
    }
}

/// The issuance shape the workflow endpoints return.
///
/// `dateIssued` duplicates `issuedAt` and `status` is derived from the
/// delivery record.
#[derive(Serialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssuanceResponse {
    #[serde(flatten)]
    pub issuance: IssuanceEmbed,
    pub status: String,
    pub date_issued: chrono::DateTime<chrono::Utc>,
    pub completed_issuance: Option<CompletedIssuance>,
}

impl From<IssuanceRow> for IssuanceResponse {
    fn from(row: IssuanceRow) -> Self {
        let status = if row.ci_id.is_some() {
            STATUS_COMPLETED
        } else {
            STATUS_PENDING
        };
        let completed_issuance = row.completed_record();
        let date_issued = row.issued_at;
        IssuanceResponse {
            issuance: IssuanceEmbed::from(row),
            status: status.to_string(),
            date_issued,
            completed_issuance,
        }
    }
}

/// Response shape of the completion endpoint: the new delivery record with
/// the source issuance embedded.
#[derive(Serialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompletedWithIssuance {
    #[serde(flatten)]
    pub record: CompletedIssuance,
    pub issuance: IssuanceEmbed,
}

/// DTO for issuing stock to a school.
///
/// All references are checked in the service so the error messages match
/// the workflow contract.
#[derive(Deserialize, Debug, Clone, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateIssuanceDto {
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub material_id: Option<Uuid>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub school_id: Option<Uuid>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub user_id: Option<Uuid>,
    pub quantity: Option<i32>,
    pub remarks: Option<String>,
}

/// DTO for adjusting a pending issuance.
#[derive(Deserialize, Debug, Clone, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIssuanceDto {
    #[validate(range(min = 1, message = "Quantity must be greater than 0"))]
    pub quantity: Option<i32>,
    pub remarks: Option<String>,
}

/// DTO for recording the delivery of an issuance.
///
/// `deliveredAt` accepts an RFC 3339 timestamp or a plain date and
/// defaults to the current time.
#[derive(Deserialize, Debug, Clone, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteIssuanceDto {
    pub received_by: Option<String>,
    pub remarks: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_datetime")]
    pub delivered_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Query parameters for filtering issuances.
///
/// `status` is matched case-insensitively; values other than "pending" or
/// "completed" leave the filter off.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssuanceFilterParams {
    pub status: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub school_id: Option<Uuid>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub material_id: Option<Uuid>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_dto_accepts_plain_date() {
        let dto: CompleteIssuanceDto =
            serde_json::from_str(r#"{"receivedBy": "J. Cruz", "deliveredAt": "2025-04-01"}"#)
                .unwrap();
        let delivered_at = dto.delivered_at.unwrap();
        assert_eq!(delivered_at.to_rfc3339(), "2025-04-01T00:00:00+00:00");
    }

    #[test]
    fn test_complete_dto_defaults_to_no_timestamp() {
        let dto: CompleteIssuanceDto = serde_json::from_str(r#"{}"#).unwrap();
        assert!(dto.delivered_at.is_none());
        assert!(dto.received_by.is_none());
    }

    #[test]
    fn test_update_dto_rejects_zero_quantity() {
        use validator::Validate;

        let dto: UpdateIssuanceDto = serde_json::from_str(r#"{"quantity": 0}"#).unwrap();
        let err = dto.validate().unwrap_err();
        assert!(err.to_string().contains("Quantity must be greater than 0"));
    }
}

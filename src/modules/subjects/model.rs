//! Subject data models and DTOs.
//!
//! Subjects are the root of the catalog: every material belongs to exactly
//! one subject, and the subject's education stage is denormalized onto its
//! materials.
//!
//! # Core Types
//!
//! - [`EducationStage`] - The closed set of education stages
//! - [`Subject`] - Base subject entity from the database
//! - [`SubjectWithCount`] - Subject with its material count, for listings
//!
//! # Request DTOs
//!
//! - [`CreateSubjectDto`] - Create a new subject

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Education stage a subject belongs to.
///
/// Stored as TEXT in the database; the API speaks the same
/// SCREAMING_SNAKE_CASE values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EducationStage {
    Elementary,
    JuniorHigh,
    SeniorHigh,
}

impl std::fmt::Display for EducationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EducationStage::Elementary => "ELEMENTARY",
            EducationStage::JuniorHigh => "JUNIOR_HIGH",
            EducationStage::SeniorHigh => "SENIOR_HIGH",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for EducationStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ELEMENTARY" => Ok(EducationStage::Elementary),
            "JUNIOR_HIGH" => Ok(EducationStage::JuniorHigh),
            "SENIOR_HIGH" => Ok(EducationStage::SeniorHigh),
            _ => Err(format!("Unknown education stage: {}", s)),
        }
    }
}

/// A subject in the catalog.
#[derive(Serialize, Deserialize, FromRow, Debug, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: Uuid,
    pub name: String,
    pub category: Option<String>,
    pub strand: Option<String>,
    pub education_stage: EducationStage,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// A subject together with the number of materials filed under it.
///
/// Returned by the subject listing so the catalog page can show counts
/// without a second round trip.
#[derive(Serialize, FromRow, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubjectWithCount {
    pub id: Uuid,
    pub name: String,
    pub category: Option<String>,
    pub strand: Option<String>,
    pub education_stage: EducationStage,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub material_count: i64,
}

/// DTO for creating a new subject.
#[derive(Deserialize, Debug, Clone, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubjectDto {
    #[validate(length(min = 1, message = "Name and education stage are required"))]
    pub name: String,
    pub category: Option<String>,
    pub strand: Option<String>,
    pub education_stage: EducationStage,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_education_stage_display_round_trips() {
        for stage in [
            EducationStage::Elementary,
            EducationStage::JuniorHigh,
            EducationStage::SeniorHigh,
        ] {
            let parsed = EducationStage::from_str(&stage.to_string()).unwrap();
            assert_eq!(parsed, stage);
        }
    }

    #[test]
    fn test_education_stage_parse_is_case_insensitive() {
        assert_eq!(
            EducationStage::from_str("junior_high").unwrap(),
            EducationStage::JuniorHigh
        );
    }

    #[test]
    fn test_education_stage_rejects_unknown_value() {
        assert!(EducationStage::from_str("COLLEGE").is_err());
    }

    #[test]
    fn test_education_stage_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&EducationStage::JuniorHigh).unwrap();
        assert_eq!(json, "\"JUNIOR_HIGH\"");
    }
}

//! CSV export queries.
//!
//! Exports are unpaginated snapshots of the filtered data, rendered with
//! the shared CSV helpers. Dates render as `YYYY-MM-DD`.

use sqlx::PgPool;
use tracing::{debug, error, instrument};

use crate::modules::export::model::{
    HistoryExportParams, HistoryExportRow, MaterialExportParams, MaterialExportRow,
    SchoolExportParams, SchoolExportRow,
};
use crate::utils::csv;
use crate::utils::errors::AppError;

pub struct ExportService;

impl ExportService {
    /// Renders the filtered delivery history as CSV, most recent delivery
    /// first.
    #[instrument(skip(db, params), fields(db.operation = "SELECT", db.table = "completed_issuances"))]
    pub async fn export_history(
        db: &PgPool,
        params: HistoryExportParams,
    ) -> Result<String, AppError> {
        debug!(
            filter.school_id = ?params.school_id,
            filter.material_id = ?params.material_id,
            "Exporting delivery history"
        );

        let mut where_clause = String::new();
        let mut binds = Vec::new();

        if let Some(school_id) = params.school_id {
            binds.push(school_id.to_string());
            where_clause.push_str(&format!(" AND ci.school_id = ${}::uuid", binds.len()));
        }

        if let Some(material_id) = params.material_id {
            binds.push(material_id.to_string());
            where_clause.push_str(&format!(" AND ci.material_id = ${}::uuid", binds.len()));
        }

        if let Some(start_date) = params.start_date {
            binds.push(start_date.to_rfc3339());
            where_clause.push_str(&format!(
                " AND ci.delivered_at >= ${}::timestamptz",
                binds.len()
            ));
        }

        if let Some(end_date) = params.end_date {
            binds.push(end_date.to_rfc3339());
            where_clause.push_str(&format!(
                " AND ci.delivered_at <= ${}::timestamptz",
                binds.len()
            ));
        }

        let mut query = String::from(
            "SELECT ci.quantity, ci.date_issued, ci.delivered_at, ci.remarks, \
             m.title AS m_title, m.grade_level AS m_grade_level, m.education_stage AS m_education_stage, \
             sub.name AS sub_name, \
             s.schoolname AS s_schoolname, s.municipality AS s_municipality, \
             s.congressional_district AS s_congressional_district \
             FROM completed_issuances ci \
             INNER JOIN materials m ON m.id = ci.material_id \
             INNER JOIN subjects sub ON sub.id = m.subject_id \
             INNER JOIN schools s ON s.id = ci.school_id WHERE 1=1",
        );
        query.push_str(&where_clause);
        query.push_str(" ORDER BY ci.delivered_at DESC");

        let mut sql = sqlx::query_as::<_, HistoryExportRow>(&query);
        for bind in binds {
            sql = sql.bind(bind);
        }
        let records = sql.fetch_all(db).await.map_err(|e| {
            error!(error = %e, "Database error exporting delivery history");
            AppError::from(e)
        })?;

        debug!(rows = records.len(), "Delivery history export rendered");

        let rows = records
            .into_iter()
            .map(|r| {
                vec![
                    csv::quote(&r.m_title),
                    csv::quote(&r.sub_name),
                    r.m_grade_level,
                    r.m_education_stage.to_string(),
                    csv::quote(&r.s_schoolname),
                    csv::quote(&r.s_municipality),
                    r.s_congressional_district.to_string(),
                    r.quantity.to_string(),
                    r.date_issued.format("%Y-%m-%d").to_string(),
                    r.delivered_at.format("%Y-%m-%d").to_string(),
                    csv::quote(r.remarks.as_deref().unwrap_or_default()),
                ]
            })
            .collect();

        Ok(csv::render(
            &[
                "Material",
                "Subject",
                "Grade Level",
                "Education Stage",
                "School",
                "Municipality",
                "Congressional District",
                "Quantity",
                "Date Issued",
                "Date Delivered",
                "Remarks",
            ],
            rows,
        ))
    }

    /// Renders the filtered materials inventory as CSV, grouped by stage
    /// then grade then title.
    #[instrument(skip(db, params), fields(db.operation = "SELECT", db.table = "materials"))]
    pub async fn export_materials(
        db: &PgPool,
        params: MaterialExportParams,
    ) -> Result<String, AppError> {
        debug!(
            filter.education_stage = ?params.education_stage,
            filter.subject_id = ?params.subject_id,
            "Exporting materials"
        );

        let mut where_clause = String::new();
        let mut binds = Vec::new();

        if let Some(education_stage) = params.education_stage {
            binds.push(education_stage.to_string());
            where_clause.push_str(&format!(" AND m.education_stage = ${}", binds.len()));
        }

        if let Some(subject_id) = params.subject_id {
            binds.push(subject_id.to_string());
            where_clause.push_str(&format!(" AND m.subject_id = ${}::uuid", binds.len()));
        }

        let mut query = String::from(
            "SELECT m.title, m.grade_level, m.education_stage, m.quantity, m.created_at, \
             sub.name AS sub_name \
             FROM materials m \
             INNER JOIN subjects sub ON sub.id = m.subject_id WHERE 1=1",
        );
        query.push_str(&where_clause);
        query.push_str(" ORDER BY m.education_stage ASC, m.grade_level ASC, m.title ASC");

        let mut sql = sqlx::query_as::<_, MaterialExportRow>(&query);
        for bind in binds {
            sql = sql.bind(bind);
        }
        let records = sql.fetch_all(db).await.map_err(|e| {
            error!(error = %e, "Database error exporting materials");
            AppError::from(e)
        })?;

        debug!(rows = records.len(), "Materials export rendered");

        let rows = records
            .into_iter()
            .map(|r| {
                vec![
                    csv::quote(&r.title),
                    csv::quote(&r.sub_name),
                    r.grade_level,
                    r.education_stage.to_string(),
                    r.quantity.to_string(),
                    r.created_at.format("%Y-%m-%d").to_string(),
                ]
            })
            .collect();

        Ok(csv::render(
            &[
                "Title",
                "Subject",
                "Grade Level",
                "Education Stage",
                "Quantity",
                "Created At",
            ],
            rows,
        ))
    }

    /// Renders the filtered school directory as CSV, grouped by district
    /// then municipality then name.
    #[instrument(skip(db, params), fields(db.operation = "SELECT", db.table = "schools"))]
    pub async fn export_schools(
        db: &PgPool,
        params: SchoolExportParams,
    ) -> Result<String, AppError> {
        debug!(
            filter.schooltype = ?params.schooltype,
            filter.municipality = ?params.municipality,
            "Exporting schools"
        );

        let mut where_clause = String::new();
        let mut binds = Vec::new();

        if let Some(schooltype) = params.schooltype {
            binds.push(schooltype.to_string());
            where_clause.push_str(&format!(" AND schooltype = ${}", binds.len()));
        }

        if let Some(municipality) = &params.municipality {
            binds.push(municipality.clone());
            where_clause.push_str(&format!(" AND municipality = ${}", binds.len()));
        }

        if let Some(congressional_district) = params.congressional_district {
            binds.push(congressional_district.to_string());
            where_clause.push_str(&format!(
                " AND congressional_district = ${}::int",
                binds.len()
            ));
        }

        let mut query = String::from(
            "SELECT school_id, schoolname, schooltype, municipality, congressional_district, zone \
             FROM schools WHERE 1=1",
        );
        query.push_str(&where_clause);
        query.push_str(" ORDER BY congressional_district ASC, municipality ASC, schoolname ASC");

        let mut sql = sqlx::query_as::<_, SchoolExportRow>(&query);
        for bind in binds {
            sql = sql.bind(bind);
        }
        let records = sql.fetch_all(db).await.map_err(|e| {
            error!(error = %e, "Database error exporting schools");
            AppError::from(e)
        })?;

        debug!(rows = records.len(), "Schools export rendered");

        let rows = records
            .into_iter()
            .map(|r| {
                vec![
                    r.school_id,
                    csv::quote(&r.schoolname),
                    r.schooltype.to_string(),
                    csv::quote(&r.municipality),
                    r.congressional_district.to_string(),
                    csv::escape(r.zone.as_deref().unwrap_or_default()),
                ]
            })
            .collect();

        Ok(csv::render(
            &[
                "School ID",
                "Name",
                "Type",
                "Municipality",
                "Congressional District",
                "Zone",
            ],
            rows,
        ))
    }
}

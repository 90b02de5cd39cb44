//! Material inventory service.
//!
//! Creation and updates keep the denormalized education stage in lockstep
//! with the owning subject. Stock quantities are only adjusted here through
//! direct edits; the issuance workflow owns transactional stock movement.

use sqlx::PgPool;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::modules::materials::model::{
    CreateMaterialDto, Material, MaterialDetailResponse, MaterialFilterParams,
    MaterialIssuanceItem, MaterialIssuanceRow, MaterialResponse, MaterialWithSubjectRow,
    UpdateMaterialDto, format_grade_level,
};
use crate::modules::subjects::model::Subject;
use crate::utils::errors::AppError;
use crate::utils::pagination::PaginationMeta;

/// Columns for a material joined to its subject, in [`MaterialWithSubjectRow`]
/// order.
const MATERIAL_WITH_SUBJECT: &str = "SELECT m.id, m.title, m.grade_level, m.education_stage, m.quantity, m.source, m.subject_id, m.created_at, m.updated_at, \
     s.name AS subject_name, s.category AS subject_category, s.strand AS subject_strand, \
     s.education_stage AS subject_education_stage, s.created_at AS subject_created_at, s.updated_at AS subject_updated_at \
     FROM materials m INNER JOIN subjects s ON s.id = m.subject_id";

pub struct MaterialService;

impl MaterialService {
    /// Lists materials with their subjects, filtered and paginated.
    #[instrument(skip(db, filters), fields(db.operation = "SELECT", db.table = "materials"))]
    pub async fn get_all_materials(
        db: &PgPool,
        filters: MaterialFilterParams,
    ) -> Result<(Vec<MaterialResponse>, PaginationMeta), AppError> {
        let page = filters.pagination.page();
        let limit = filters.pagination.limit();
        let offset = filters.pagination.offset();

        debug!(
            page = %page,
            limit = %limit,
            filter.search = ?filters.search,
            filter.grade_level = ?filters.grade_level,
            filter.subject_id = ?filters.subject_id,
            filter.education_stage = ?filters.education_stage,
            "Fetching materials"
        );

        let mut where_clause = String::new();
        let mut params = Vec::new();

        if let Some(search) = &filters.search {
            params.push(format!("%{}%", search));
            where_clause.push_str(&format!(" AND m.title ILIKE ${}", params.len()));
        }

        if let Some(grade_level) = filters.grade_level {
            params.push(format!("Grade {}", grade_level));
            where_clause.push_str(&format!(" AND m.grade_level = ${}", params.len()));
        }

        if let Some(subject_id) = filters.subject_id {
            params.push(subject_id.to_string());
            where_clause.push_str(&format!(" AND m.subject_id = ${}::uuid", params.len()));
        }

        if let Some(education_stage) = filters.education_stage {
            params.push(education_stage.to_string());
            where_clause.push_str(&format!(" AND m.education_stage = ${}", params.len()));
        }

        let mut count_query = String::from("SELECT COUNT(*) FROM materials m WHERE 1=1");
        count_query.push_str(&where_clause);

        let mut count_sql = sqlx::query_scalar::<_, i64>(&count_query);
        for param in &params {
            count_sql = count_sql.bind(param);
        }
        let total = count_sql.fetch_one(db).await.map_err(|e| {
            error!(error = %e, "Database error counting materials");
            AppError::from(e)
        })?;

        let mut data_query = format!("{} WHERE 1=1", MATERIAL_WITH_SUBJECT);
        data_query.push_str(&where_clause);
        data_query.push_str(" ORDER BY m.created_at DESC");
        data_query.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset));

        let mut data_sql = sqlx::query_as::<_, MaterialWithSubjectRow>(&data_query);
        for param in params {
            data_sql = data_sql.bind(param);
        }
        let rows = data_sql.fetch_all(db).await.map_err(|e| {
            error!(error = %e, "Database error fetching materials");
            AppError::from(e)
        })?;

        let materials: Vec<MaterialResponse> = rows.into_iter().map(MaterialResponse::from).collect();

        debug!(total = %total, returned = materials.len(), "Materials fetched successfully");

        Ok((materials, filters.pagination.meta(total)))
    }

    /// Fetches a single material with its subject and ten most recent
    /// issuances.
    #[instrument(skip(db), fields(material.id = %material_id, db.operation = "SELECT", db.table = "materials"))]
    pub async fn get_material_by_id(
        db: &PgPool,
        material_id: Uuid,
    ) -> Result<MaterialDetailResponse, AppError> {
        debug!("Fetching material by ID");

        let query = format!("{} WHERE m.id = $1", MATERIAL_WITH_SUBJECT);
        let row = sqlx::query_as::<_, MaterialWithSubjectRow>(&query)
            .bind(material_id)
            .fetch_optional(db)
            .await
            .map_err(|e| {
                error!(material.id = %material_id, error = %e, "Database error fetching material");
                AppError::from(e)
            })?
            .ok_or_else(|| {
                debug!(material.id = %material_id, "Material not found");
                AppError::not_found(anyhow::anyhow!("Material not found"))
            })?;

        let issuance_rows = sqlx::query_as::<_, MaterialIssuanceRow>(
            "SELECT i.id, i.material_id, i.school_id, i.user_id, i.quantity, i.issued_at, i.remarks, \
                    s.school_id AS s_school_id, s.schoolname AS s_schoolname, s.schooltype AS s_schooltype, \
                    s.municipality AS s_municipality, s.congressional_district AS s_congressional_district, \
                    s.zone AS s_zone, s.created_at AS s_created_at, s.updated_at AS s_updated_at, \
                    u.username AS u_username \
             FROM issuances i \
             INNER JOIN schools s ON s.id = i.school_id \
             INNER JOIN users u ON u.id = i.user_id \
             WHERE i.material_id = $1 \
             ORDER BY i.issued_at DESC \
             LIMIT 10",
        )
        .bind(material_id)
        .fetch_all(db)
        .await
        .map_err(|e| {
            error!(material.id = %material_id, error = %e, "Database error fetching material issuances");
            AppError::from(e)
        })?;

        let issuances: Vec<MaterialIssuanceItem> =
            issuance_rows.into_iter().map(MaterialIssuanceItem::from).collect();

        debug!(issuances = issuances.len(), "Material found");

        Ok(MaterialDetailResponse {
            material: MaterialResponse::from(row),
            issuances,
        })
    }

    /// Creates a material under an existing subject.
    ///
    /// The education stage is copied from the subject, never taken from the
    /// request.
    #[instrument(skip(db, dto), fields(db.operation = "INSERT", db.table = "materials"))]
    pub async fn create_material(
        db: &PgPool,
        dto: CreateMaterialDto,
    ) -> Result<MaterialResponse, AppError> {
        let name = dto
            .name
            .as_deref()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                AppError::bad_request(anyhow::anyhow!("Name, grade level, and subject are required"))
            })?;
        let grade_level = dto.grade_level.ok_or_else(|| {
            AppError::bad_request(anyhow::anyhow!("Name, grade level, and subject are required"))
        })?;
        let subject_id = dto.subject_id.ok_or_else(|| {
            AppError::bad_request(anyhow::anyhow!("Name, grade level, and subject are required"))
        })?;

        debug!(
            material.title = %name,
            material.grade_level = %grade_level,
            subject.id = %subject_id,
            "Creating new material"
        );

        let subject = sqlx::query_as::<_, Subject>(
            "SELECT id, name, category, strand, education_stage, created_at, updated_at
             FROM subjects WHERE id = $1",
        )
        .bind(subject_id)
        .fetch_optional(db)
        .await
        .map_err(|e| {
            error!(subject.id = %subject_id, error = %e, "Database error fetching subject");
            AppError::from(e)
        })?
        .ok_or_else(|| {
            warn!(subject.id = %subject_id, "Subject not found for new material");
            AppError::not_found(anyhow::anyhow!("Subject not found"))
        })?;

        let material = sqlx::query_as::<_, Material>(
            "INSERT INTO materials (title, grade_level, education_stage, quantity, source, subject_id)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id, title, grade_level, education_stage, quantity, source, subject_id, created_at, updated_at",
        )
        .bind(name)
        .bind(format_grade_level(grade_level))
        .bind(subject.education_stage)
        .bind(dto.quantity.unwrap_or(0))
        .bind(&dto.source)
        .bind(subject_id)
        .fetch_one(db)
        .await
        .map_err(|e| {
            error!(error = %e, "Database error creating material");
            AppError::from(e)
        })?;

        info!(
            material.id = %material.id,
            material.title = %material.title,
            "Material created successfully"
        );

        Ok(MaterialResponse::from_parts(material, subject))
    }

    /// Partially updates a material.
    ///
    /// When the subject changes, the denormalized education stage is
    /// re-synced from the new subject in the same statement.
    #[instrument(skip(db, dto), fields(material.id = %material_id, db.operation = "UPDATE", db.table = "materials"))]
    pub async fn update_material(
        db: &PgPool,
        material_id: Uuid,
        dto: UpdateMaterialDto,
    ) -> Result<MaterialResponse, AppError> {
        debug!("Updating material");

        let existing = sqlx::query_scalar::<_, Uuid>("SELECT id FROM materials WHERE id = $1")
            .bind(material_id)
            .fetch_optional(db)
            .await
            .map_err(|e| {
                error!(material.id = %material_id, error = %e, "Database error fetching material");
                AppError::from(e)
            })?;

        if existing.is_none() {
            debug!(material.id = %material_id, "Material not found for update");
            return Err(AppError::not_found(anyhow::anyhow!("Material not found")));
        }

        // Resolve the new education stage before touching the row.
        let new_stage = if let Some(subject_id) = dto.subject_id {
            let subject = sqlx::query_as::<_, Subject>(
                "SELECT id, name, category, strand, education_stage, created_at, updated_at
                 FROM subjects WHERE id = $1",
            )
            .bind(subject_id)
            .fetch_optional(db)
            .await
            .map_err(|e| {
                error!(subject.id = %subject_id, error = %e, "Database error fetching subject");
                AppError::from(e)
            })?
            .ok_or_else(|| {
                warn!(subject.id = %subject_id, "Subject not found for material update");
                AppError::not_found(anyhow::anyhow!("Subject not found"))
            })?;
            Some(subject.education_stage)
        } else {
            None
        };

        let mut query = String::from("UPDATE materials SET updated_at = NOW()");
        let mut param_count = 1;

        if dto.name.is_some() {
            param_count += 1;
            query.push_str(&format!(", title = ${}", param_count));
        }
        if dto.grade_level.is_some() {
            param_count += 1;
            query.push_str(&format!(", grade_level = ${}", param_count));
        }
        if dto.quantity.is_some() {
            param_count += 1;
            query.push_str(&format!(", quantity = ${}", param_count));
        }
        if dto.source.is_some() {
            param_count += 1;
            query.push_str(&format!(", source = ${}", param_count));
        }
        if dto.subject_id.is_some() {
            param_count += 1;
            query.push_str(&format!(", subject_id = ${}", param_count));
            param_count += 1;
            query.push_str(&format!(", education_stage = ${}", param_count));
        }

        query.push_str(
            " WHERE id = $1 RETURNING id, title, grade_level, education_stage, quantity, source, subject_id, created_at, updated_at",
        );

        let mut query_builder = sqlx::query_as::<_, Material>(&query).bind(material_id);

        if let Some(name) = dto.name {
            query_builder = query_builder.bind(name);
        }
        if let Some(grade_level) = dto.grade_level {
            query_builder = query_builder.bind(format_grade_level(grade_level));
        }
        if let Some(quantity) = dto.quantity {
            query_builder = query_builder.bind(quantity);
        }
        if let Some(source) = dto.source {
            query_builder = query_builder.bind(source);
        }
        if let Some(subject_id) = dto.subject_id {
            query_builder = query_builder.bind(subject_id);
            if let Some(stage) = new_stage {
                query_builder = query_builder.bind(stage);
            }
        }

        let material = query_builder.fetch_one(db).await.map_err(|e| {
            error!(material.id = %material_id, error = %e, "Database error updating material");
            AppError::from(e)
        })?;

        let subject = sqlx::query_as::<_, Subject>(
            "SELECT id, name, category, strand, education_stage, created_at, updated_at
             FROM subjects WHERE id = $1",
        )
        .bind(material.subject_id)
        .fetch_one(db)
        .await
        .map_err(|e| {
            error!(error = %e, "Database error fetching subject for updated material");
            AppError::from(e)
        })?;

        info!(material.id = %material.id, "Material updated successfully");

        Ok(MaterialResponse::from_parts(material, subject))
    }

    /// Deletes a material that has no issuance history.
    #[instrument(skip(db), fields(material.id = %material_id, db.operation = "DELETE", db.table = "materials"))]
    pub async fn delete_material(db: &PgPool, material_id: Uuid) -> Result<(), AppError> {
        debug!("Deleting material");

        let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM materials WHERE id = $1")
            .bind(material_id)
            .fetch_one(db)
            .await
            .map_err(|e| {
                error!(material.id = %material_id, error = %e, "Database error checking material");
                AppError::from(e)
            })?;

        if exists == 0 {
            debug!(material.id = %material_id, "Material not found for deletion");
            return Err(AppError::not_found(anyhow::anyhow!("Material not found")));
        }

        sqlx::query("DELETE FROM materials WHERE id = $1")
            .bind(material_id)
            .execute(db)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e
                    && db_err.is_foreign_key_violation()
                {
                    warn!(material.id = %material_id, "Attempted to delete material with issuances");
                    return AppError::conflict(anyhow::anyhow!(
                        "Cannot delete material with existing issuance(s)"
                    ));
                }
                error!(material.id = %material_id, error = %e, "Database error deleting material");
                AppError::from(e)
            })?;

        info!(material.id = %material_id, "Material deleted successfully");

        Ok(())
    }
}

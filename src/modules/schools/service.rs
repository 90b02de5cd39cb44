//! School directory service.
//!
//! A school name is unique per municipality, compared case-insensitively.
//! Deletion is blocked while any issuance still references the school.

use sqlx::PgPool;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::modules::schools::model::{
    CreateSchoolDto, SCHOOL_COLUMNS, School, SchoolDetailResponse, SchoolFilterParams,
    SchoolIssuanceItem, SchoolIssuanceRow, SchoolWithCount, UpdateSchoolDto,
};
use crate::utils::errors::AppError;
use crate::utils::pagination::PaginationMeta;

pub struct SchoolService;

impl SchoolService {
    /// Lists schools with their issuance counts, filtered and paginated,
    /// ordered by school name.
    #[instrument(skip(db, filters), fields(db.operation = "SELECT", db.table = "schools"))]
    pub async fn get_all_schools(
        db: &PgPool,
        filters: SchoolFilterParams,
    ) -> Result<(Vec<SchoolWithCount>, PaginationMeta), AppError> {
        let page = filters.pagination.page();
        let limit = filters.pagination.limit();
        let offset = filters.pagination.offset();

        debug!(
            page = %page,
            limit = %limit,
            filter.search = ?filters.search,
            filter.schooltype = ?filters.schooltype,
            filter.municipality = ?filters.municipality,
            filter.congressional_district = ?filters.congressional_district,
            "Fetching schools"
        );

        let mut where_clause = String::new();
        let mut params = Vec::new();

        if let Some(search) = &filters.search {
            params.push(format!("%{}%", search));
            where_clause.push_str(&format!(" AND s.schoolname ILIKE ${}", params.len()));
        }

        if let Some(schooltype) = filters.schooltype {
            params.push(schooltype.to_string());
            where_clause.push_str(&format!(" AND s.schooltype = ${}", params.len()));
        }

        if let Some(municipality) = &filters.municipality {
            params.push(format!("%{}%", municipality));
            where_clause.push_str(&format!(" AND s.municipality ILIKE ${}", params.len()));
        }

        if let Some(district) = filters.congressional_district {
            params.push(district.to_string());
            where_clause.push_str(&format!(
                " AND s.congressional_district = ${}::int",
                params.len()
            ));
        }

        let mut count_query = String::from("SELECT COUNT(*) FROM schools s WHERE 1=1");
        count_query.push_str(&where_clause);

        let mut count_sql = sqlx::query_scalar::<_, i64>(&count_query);
        for param in &params {
            count_sql = count_sql.bind(param);
        }
        let total = count_sql.fetch_one(db).await.map_err(|e| {
            error!(error = %e, "Database error counting schools");
            AppError::from(e)
        })?;

        let mut data_query = String::from(
            "SELECT s.id, s.school_id, s.schoolname, s.schoolname AS name, s.schooltype, \
                    s.municipality, s.congressional_district, s.zone, s.created_at, s.updated_at, \
                    (SELECT COUNT(*) FROM issuances i WHERE i.school_id = s.id)::bigint AS issuance_count \
             FROM schools s WHERE 1=1",
        );
        data_query.push_str(&where_clause);
        data_query.push_str(" ORDER BY s.schoolname ASC");
        data_query.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset));

        let mut data_sql = sqlx::query_as::<_, SchoolWithCount>(&data_query);
        for param in params {
            data_sql = data_sql.bind(param);
        }
        let schools = data_sql.fetch_all(db).await.map_err(|e| {
            error!(error = %e, "Database error fetching schools");
            AppError::from(e)
        })?;

        debug!(total = %total, returned = schools.len(), "Schools fetched successfully");

        Ok((schools, filters.pagination.meta(total)))
    }

    /// Registers a new school. The display identifier is allocated by the
    /// database default on insert.
    #[instrument(skip(db, dto), fields(db.operation = "INSERT", db.table = "schools"))]
    pub async fn create_school(db: &PgPool, dto: CreateSchoolDto) -> Result<School, AppError> {
        let schoolname = dto
            .schoolname
            .as_deref()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                AppError::bad_request(anyhow::anyhow!(
                    "School name, type, municipality, and congressional district are required"
                ))
            })?;
        let schooltype = dto.schooltype.ok_or_else(|| {
            AppError::bad_request(anyhow::anyhow!(
                "School name, type, municipality, and congressional district are required"
            ))
        })?;
        let municipality = dto
            .municipality
            .as_deref()
            .filter(|m| !m.is_empty())
            .ok_or_else(|| {
                AppError::bad_request(anyhow::anyhow!(
                    "School name, type, municipality, and congressional district are required"
                ))
            })?;
        let congressional_district = dto.congressional_district.ok_or_else(|| {
            AppError::bad_request(anyhow::anyhow!(
                "School name, type, municipality, and congressional district are required"
            ))
        })?;

        debug!(
            school.name = %schoolname,
            school.municipality = %municipality,
            "Creating new school"
        );

        let duplicate = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM schools
             WHERE lower(schoolname) = lower($1) AND lower(municipality) = lower($2)",
        )
        .bind(schoolname)
        .bind(municipality)
        .fetch_one(db)
        .await
        .map_err(|e| {
            error!(error = %e, "Database error checking for duplicate school");
            AppError::from(e)
        })?;

        if duplicate > 0 {
            warn!(school.name = %schoolname, school.municipality = %municipality, "Duplicate school rejected");
            return Err(AppError::conflict(anyhow::anyhow!(
                "A school with this name already exists in this municipality"
            )));
        }

        let insert_query = format!(
            "INSERT INTO schools (schoolname, schooltype, municipality, congressional_district, zone)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {}",
            SCHOOL_COLUMNS
        );
        let school = sqlx::query_as::<_, School>(&insert_query)
            .bind(schoolname)
            .bind(schooltype)
            .bind(municipality)
            .bind(congressional_district)
            .bind(&dto.zone)
            .fetch_one(db)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e
                    && db_err.is_unique_violation()
                {
                    warn!(school.name = %schoolname, "Concurrent duplicate school rejected");
                    return AppError::conflict(anyhow::anyhow!(
                        "A school with this name already exists in this municipality"
                    ));
                }
                error!(error = %e, school.name = %schoolname, "Database error creating school");
                AppError::from(e)
            })?;

        info!(
            school.id = %school.id,
            school.school_id = %school.school_id,
            school.name = %school.schoolname,
            "School created successfully"
        );

        Ok(school)
    }

    /// Fetches a school with its issuance count and twenty most recent
    /// issuances.
    #[instrument(skip(db), fields(school.id = %school_id, db.operation = "SELECT", db.table = "schools"))]
    pub async fn get_school_by_id(
        db: &PgPool,
        school_id: Uuid,
    ) -> Result<SchoolDetailResponse, AppError> {
        debug!("Fetching school by ID");

        let query = format!("SELECT {} FROM schools WHERE id = $1", SCHOOL_COLUMNS);
        let school = sqlx::query_as::<_, School>(&query)
            .bind(school_id)
            .fetch_optional(db)
            .await
            .map_err(|e| {
                error!(school.id = %school_id, error = %e, "Database error fetching school");
                AppError::from(e)
            })?
            .ok_or_else(|| {
                debug!(school.id = %school_id, "School not found");
                AppError::not_found(anyhow::anyhow!("School not found"))
            })?;

        let issuance_count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM issuances WHERE school_id = $1")
                .bind(school_id)
                .fetch_one(db)
                .await
                .map_err(|e| {
                    error!(school.id = %school_id, error = %e, "Database error counting issuances");
                    AppError::from(e)
                })?;

        let issuance_rows = sqlx::query_as::<_, SchoolIssuanceRow>(
            "SELECT i.id, i.material_id, i.school_id, i.user_id, i.quantity, i.issued_at, i.remarks, \
                    m.title AS m_title, m.grade_level AS m_grade_level, m.education_stage AS m_education_stage, \
                    m.quantity AS m_quantity, m.source AS m_source, m.subject_id AS m_subject_id, \
                    m.created_at AS m_created_at, m.updated_at AS m_updated_at, \
                    u.username AS u_username, \
                    ci.id AS ci_id, ci.quantity AS ci_quantity, ci.date_issued AS ci_date_issued, \
                    ci.delivered_at AS ci_delivered_at, ci.received_by AS ci_received_by, ci.remarks AS ci_remarks \
             FROM issuances i \
             INNER JOIN materials m ON m.id = i.material_id \
             INNER JOIN users u ON u.id = i.user_id \
             LEFT JOIN completed_issuances ci ON ci.issuance_id = i.id \
             WHERE i.school_id = $1 \
             ORDER BY i.issued_at DESC \
             LIMIT 20",
        )
        .bind(school_id)
        .fetch_all(db)
        .await
        .map_err(|e| {
            error!(school.id = %school_id, error = %e, "Database error fetching school issuances");
            AppError::from(e)
        })?;

        let issuances: Vec<SchoolIssuanceItem> =
            issuance_rows.into_iter().map(SchoolIssuanceItem::from).collect();

        debug!(
            school.name = %school.schoolname,
            issuances = issuances.len(),
            "School found"
        );

        Ok(SchoolDetailResponse {
            school,
            issuance_count,
            issuances,
        })
    }

    /// Partially updates a school, re-checking the per-municipality name
    /// uniqueness against the effective values.
    #[instrument(skip(db, dto), fields(school.id = %school_id, db.operation = "UPDATE", db.table = "schools"))]
    pub async fn update_school(
        db: &PgPool,
        school_id: Uuid,
        dto: UpdateSchoolDto,
    ) -> Result<School, AppError> {
        debug!("Updating school");

        let select_query = format!("SELECT {} FROM schools WHERE id = $1", SCHOOL_COLUMNS);
        let existing = sqlx::query_as::<_, School>(&select_query)
            .bind(school_id)
            .fetch_optional(db)
            .await
            .map_err(|e| {
                error!(school.id = %school_id, error = %e, "Database error fetching school");
                AppError::from(e)
            })?
            .ok_or_else(|| {
                debug!(school.id = %school_id, "School not found for update");
                AppError::not_found(anyhow::anyhow!("School not found"))
            })?;

        if dto.schoolname.is_some() || dto.municipality.is_some() {
            let effective_name = dto.schoolname.as_deref().unwrap_or(&existing.schoolname);
            let effective_municipality =
                dto.municipality.as_deref().unwrap_or(&existing.municipality);

            let duplicate = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM schools
                 WHERE id != $1 AND lower(schoolname) = lower($2) AND lower(municipality) = lower($3)",
            )
            .bind(school_id)
            .bind(effective_name)
            .bind(effective_municipality)
            .fetch_one(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Database error checking for duplicate school");
                AppError::from(e)
            })?;

            if duplicate > 0 {
                warn!(
                    school.id = %school_id,
                    school.name = %effective_name,
                    "Duplicate school name rejected on update"
                );
                return Err(AppError::conflict(anyhow::anyhow!(
                    "A school with this name already exists in this municipality"
                )));
            }
        }

        let mut query = String::from("UPDATE schools SET updated_at = NOW()");
        let mut param_count = 1;

        if dto.schoolname.is_some() {
            param_count += 1;
            query.push_str(&format!(", schoolname = ${}", param_count));
        }
        if dto.schooltype.is_some() {
            param_count += 1;
            query.push_str(&format!(", schooltype = ${}", param_count));
        }
        if dto.municipality.is_some() {
            param_count += 1;
            query.push_str(&format!(", municipality = ${}", param_count));
        }
        if dto.congressional_district.is_some() {
            param_count += 1;
            query.push_str(&format!(", congressional_district = ${}", param_count));
        }
        if dto.zone.is_some() {
            param_count += 1;
            query.push_str(&format!(", zone = ${}", param_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {}", SCHOOL_COLUMNS));

        let mut query_builder = sqlx::query_as::<_, School>(&query).bind(school_id);

        if let Some(schoolname) = dto.schoolname {
            query_builder = query_builder.bind(schoolname);
        }
        if let Some(schooltype) = dto.schooltype {
            query_builder = query_builder.bind(schooltype);
        }
        if let Some(municipality) = dto.municipality {
            query_builder = query_builder.bind(municipality);
        }
        if let Some(district) = dto.congressional_district {
            query_builder = query_builder.bind(district);
        }
        if let Some(zone) = dto.zone {
            query_builder = query_builder.bind(zone);
        }

        let school = query_builder.fetch_one(db).await.map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e
                && db_err.is_unique_violation()
            {
                return AppError::conflict(anyhow::anyhow!(
                    "A school with this name already exists in this municipality"
                ));
            }
            error!(school.id = %school_id, error = %e, "Database error updating school");
            AppError::from(e)
        })?;

        info!(school.id = %school.id, school.name = %school.schoolname, "School updated successfully");

        Ok(school)
    }

    /// Deletes a school that has no issuance history.
    #[instrument(skip(db), fields(school.id = %school_id, db.operation = "DELETE", db.table = "schools"))]
    pub async fn delete_school(db: &PgPool, school_id: Uuid) -> Result<(), AppError> {
        debug!("Deleting school");

        let existing = sqlx::query_scalar::<_, Uuid>("SELECT id FROM schools WHERE id = $1")
            .bind(school_id)
            .fetch_optional(db)
            .await
            .map_err(|e| {
                error!(school.id = %school_id, error = %e, "Database error fetching school");
                AppError::from(e)
            })?;

        if existing.is_none() {
            debug!(school.id = %school_id, "School not found for deletion");
            return Err(AppError::not_found(anyhow::anyhow!("School not found")));
        }

        let issuance_count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM issuances WHERE school_id = $1")
                .bind(school_id)
                .fetch_one(db)
                .await
                .map_err(|e| {
                    error!(school.id = %school_id, error = %e, "Database error counting issuances");
                    AppError::from(e)
                })?;

        if issuance_count > 0 {
            warn!(
                school.id = %school_id,
                issuances = %issuance_count,
                "Attempted to delete school with issuances"
            );
            return Err(AppError::conflict(anyhow::anyhow!(
                "Cannot delete school with {} existing issuance(s). Delete the issuances first.",
                issuance_count
            )));
        }

        sqlx::query("DELETE FROM schools WHERE id = $1")
            .bind(school_id)
            .execute(db)
            .await
            .map_err(|e| {
                error!(school.id = %school_id, error = %e, "Database error deleting school");
                AppError::from(e)
            })?;

        info!(school.id = %school_id, "School deleted successfully");

        Ok(())
    }
}

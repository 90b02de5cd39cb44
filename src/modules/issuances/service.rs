//! Issuance workflow service.
//!
//! Stock movement and issuance rows always change inside one transaction,
//! with the material row locked first, so concurrent issuances can never
//! take the same stock twice. Completion never moves stock; it snapshots
//! the issuance into the delivery record.

use sqlx::PgPool;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::modules::issuances::model::{
    CompleteIssuanceDto, CompletedIssuance, CompletedWithIssuance, CreateIssuanceDto,
    IssuanceEmbed, IssuanceFilterParams, IssuanceResponse, IssuanceRow, UpdateIssuanceDto,
};
use crate::utils::errors::AppError;
use crate::utils::pagination::PaginationMeta;

/// Columns for an issuance joined to material (with subject), school, user,
/// and the optional delivery record, in [`IssuanceRow`] order.
const ISSUANCE_SELECT: &str = "SELECT i.id, i.material_id, i.school_id, i.user_id, i.quantity, i.issued_at, i.remarks, \
     m.title AS m_title, m.grade_level AS m_grade_level, m.education_stage AS m_education_stage, \
     m.quantity AS m_quantity, m.source AS m_source, m.created_at AS m_created_at, m.updated_at AS m_updated_at, \
     sub.id AS sub_id, sub.name AS sub_name, sub.category AS sub_category, sub.strand AS sub_strand, \
     sub.education_stage AS sub_education_stage, sub.created_at AS sub_created_at, sub.updated_at AS sub_updated_at, \
     s.school_id AS s_school_id, s.schoolname AS s_schoolname, s.schooltype AS s_schooltype, \
     s.municipality AS s_municipality, s.congressional_district AS s_congressional_district, \
     s.zone AS s_zone, s.created_at AS s_created_at, s.updated_at AS s_updated_at, \
     u.username AS u_username, \
     ci.id AS ci_id, ci.quantity AS ci_quantity, ci.date_issued AS ci_date_issued, \
     ci.delivered_at AS ci_delivered_at, ci.received_by AS ci_received_by, ci.remarks AS ci_remarks \
     FROM issuances i \
     INNER JOIN materials m ON m.id = i.material_id \
     INNER JOIN subjects sub ON sub.id = m.subject_id \
     INNER JOIN schools s ON s.id = i.school_id \
     INNER JOIN users u ON u.id = i.user_id \
     LEFT JOIN completed_issuances ci ON ci.issuance_id = i.id";

/// Issuance fields needed by the guarded write paths, locked FOR UPDATE.
#[derive(sqlx::FromRow)]
struct IssuanceGuardRow {
    material_id: Uuid,
    quantity: i32,
    completed: bool,
}

/// Stock counter for a material row locked FOR UPDATE.
#[derive(sqlx::FromRow)]
struct MaterialStockRow {
    quantity: i32,
}

pub struct IssuanceService;

impl IssuanceService {
    /// Lists issuances with their related entities, filtered and paginated,
    /// most recent first.
    #[instrument(skip(db, filters), fields(db.operation = "SELECT", db.table = "issuances"))]
    pub async fn get_all_issuances(
        db: &PgPool,
        filters: IssuanceFilterParams,
    ) -> Result<(Vec<IssuanceResponse>, PaginationMeta), AppError> {
        let page = filters.pagination.page();
        let limit = filters.pagination.limit();
        let offset = filters.pagination.offset();

        debug!(
            page = %page,
            limit = %limit,
            filter.status = ?filters.status,
            filter.school_id = ?filters.school_id,
            filter.material_id = ?filters.material_id,
            "Fetching issuances"
        );

        let mut where_clause = String::new();
        let mut params = Vec::new();

        if let Some(school_id) = filters.school_id {
            params.push(school_id.to_string());
            where_clause.push_str(&format!(" AND i.school_id = ${}::uuid", params.len()));
        }

        if let Some(material_id) = filters.material_id {
            params.push(material_id.to_string());
            where_clause.push_str(&format!(" AND i.material_id = ${}::uuid", params.len()));
        }

        // Unrecognized status values leave the filter off.
        match filters.status.as_deref().map(str::to_lowercase).as_deref() {
            Some("pending") => where_clause.push_str(" AND ci.id IS NULL"),
            Some("completed") => where_clause.push_str(" AND ci.id IS NOT NULL"),
            _ => {}
        }

        let mut count_query = String::from(
            "SELECT COUNT(*) FROM issuances i \
             LEFT JOIN completed_issuances ci ON ci.issuance_id = i.id WHERE 1=1",
        );
        count_query.push_str(&where_clause);

        let mut count_sql = sqlx::query_scalar::<_, i64>(&count_query);
        for param in &params {
            count_sql = count_sql.bind(param);
        }
        let total = count_sql.fetch_one(db).await.map_err(|e| {
            error!(error = %e, "Database error counting issuances");
            AppError::from(e)
        })?;

        let mut data_query = format!("{} WHERE 1=1", ISSUANCE_SELECT);
        data_query.push_str(&where_clause);
        data_query.push_str(" ORDER BY i.issued_at DESC");
        data_query.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset));

        let mut data_sql = sqlx::query_as::<_, IssuanceRow>(&data_query);
        for param in params {
            data_sql = data_sql.bind(param);
        }
        let rows = data_sql.fetch_all(db).await.map_err(|e| {
            error!(error = %e, "Database error fetching issuances");
            AppError::from(e)
        })?;

        let issuances: Vec<IssuanceResponse> =
            rows.into_iter().map(IssuanceResponse::from).collect();

        debug!(total = %total, returned = issuances.len(), "Issuances fetched successfully");

        Ok((issuances, filters.pagination.meta(total)))
    }

    /// Fetches a single issuance with its related entities.
    #[instrument(skip(db), fields(issuance.id = %issuance_id, db.operation = "SELECT", db.table = "issuances"))]
    pub async fn get_issuance_by_id(
        db: &PgPool,
        issuance_id: Uuid,
    ) -> Result<IssuanceResponse, AppError> {
        debug!("Fetching issuance by ID");

        let query = format!("{} WHERE i.id = $1", ISSUANCE_SELECT);
        let row = sqlx::query_as::<_, IssuanceRow>(&query)
            .bind(issuance_id)
            .fetch_optional(db)
            .await
            .map_err(|e| {
                error!(issuance.id = %issuance_id, error = %e, "Database error fetching issuance");
                AppError::from(e)
            })?
            .ok_or_else(|| {
                debug!(issuance.id = %issuance_id, "Issuance not found");
                AppError::not_found(anyhow::anyhow!("Issuance not found"))
            })?;

        Ok(IssuanceResponse::from(row))
    }

    /// Issues stock to a school.
    ///
    /// The material row is locked before the stock check, so two
    /// overlapping issuances settle one after the other and the second
    /// sees the decremented quantity.
    #[instrument(skip(db, dto), fields(db.operation = "INSERT", db.table = "issuances"))]
    pub async fn create_issuance(
        db: &PgPool,
        dto: CreateIssuanceDto,
    ) -> Result<IssuanceResponse, AppError> {
        let material_id = dto.material_id.ok_or_else(|| {
            AppError::bad_request(anyhow::anyhow!(
                "Material, school, user, and quantity are required"
            ))
        })?;
        let school_id = dto.school_id.ok_or_else(|| {
            AppError::bad_request(anyhow::anyhow!(
                "Material, school, user, and quantity are required"
            ))
        })?;
        let user_id = dto.user_id.ok_or_else(|| {
            AppError::bad_request(anyhow::anyhow!(
                "Material, school, user, and quantity are required"
            ))
        })?;
        let quantity = dto.quantity.ok_or_else(|| {
            AppError::bad_request(anyhow::anyhow!(
                "Material, school, user, and quantity are required"
            ))
        })?;

        if quantity <= 0 {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Quantity must be greater than 0"
            )));
        }

        debug!(
            material.id = %material_id,
            school.id = %school_id,
            quantity = %quantity,
            "Creating issuance"
        );

        let mut tx = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to begin transaction");
            AppError::from(e)
        })?;

        let material = sqlx::query_as::<_, MaterialStockRow>(
            "SELECT quantity FROM materials WHERE id = $1 FOR UPDATE",
        )
        .bind(material_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            error!(material.id = %material_id, error = %e, "Database error locking material");
            AppError::from(e)
        })?
        .ok_or_else(|| {
            warn!(material.id = %material_id, "Material not found for issuance");
            AppError::not_found(anyhow::anyhow!("Material not found"))
        })?;

        if material.quantity < quantity {
            warn!(
                material.id = %material_id,
                available = %material.quantity,
                requested = %quantity,
                "Insufficient stock for issuance"
            );
            return Err(AppError::conflict(anyhow::anyhow!(
                "Insufficient stock. Available: {}, Requested: {}",
                material.quantity,
                quantity
            )));
        }

        let school_exists =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM schools WHERE id = $1")
                .bind(school_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| {
                    error!(school.id = %school_id, error = %e, "Database error checking school");
                    AppError::from(e)
                })?;

        if school_exists == 0 {
            warn!(school.id = %school_id, "School not found for issuance");
            return Err(AppError::not_found(anyhow::anyhow!("School not found")));
        }

        sqlx::query(
            "UPDATE materials SET quantity = quantity - $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(material_id)
        .bind(quantity)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!(material.id = %material_id, error = %e, "Database error deducting stock");
            AppError::from(e)
        })?;

        let issuance_id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO issuances (material_id, school_id, user_id, quantity, remarks)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id",
        )
        .bind(material_id)
        .bind(school_id)
        .bind(user_id)
        .bind(quantity)
        .bind(&dto.remarks)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e
                && db_err.is_foreign_key_violation()
            {
                warn!(user.id = %user_id, "User not found for issuance");
                return AppError::not_found(anyhow::anyhow!("User not found"));
            }
            error!(error = %e, "Database error creating issuance");
            AppError::from(e)
        })?;

        let query = format!("{} WHERE i.id = $1", ISSUANCE_SELECT);
        let row = sqlx::query_as::<_, IssuanceRow>(&query)
            .bind(issuance_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                error!(issuance.id = %issuance_id, error = %e, "Database error fetching new issuance");
                AppError::from(e)
            })?;

        tx.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit issuance transaction");
            AppError::from(e)
        })?;

        info!(
            issuance.id = %issuance_id,
            material.id = %material_id,
            school.id = %school_id,
            quantity = %quantity,
            "Issuance created successfully"
        );

        Ok(IssuanceResponse::from(row))
    }

    /// Adjusts a pending issuance.
    ///
    /// A quantity change moves the difference against the material stock
    /// in the same transaction; increasing past the available stock is
    /// rejected.
    #[instrument(skip(db, dto), fields(issuance.id = %issuance_id, db.operation = "UPDATE", db.table = "issuances"))]
    pub async fn update_issuance(
        db: &PgPool,
        issuance_id: Uuid,
        dto: UpdateIssuanceDto,
    ) -> Result<IssuanceResponse, AppError> {
        debug!("Updating issuance");

        let mut tx = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to begin transaction");
            AppError::from(e)
        })?;

        let existing = sqlx::query_as::<_, IssuanceGuardRow>(
            "SELECT i.material_id, i.quantity, (ci.id IS NOT NULL) AS completed
             FROM issuances i
             LEFT JOIN completed_issuances ci ON ci.issuance_id = i.id
             WHERE i.id = $1
             FOR UPDATE OF i",
        )
        .bind(issuance_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            error!(issuance.id = %issuance_id, error = %e, "Database error fetching issuance");
            AppError::from(e)
        })?
        .ok_or_else(|| {
            debug!(issuance.id = %issuance_id, "Issuance not found for update");
            AppError::not_found(anyhow::anyhow!("Issuance not found"))
        })?;

        if existing.completed {
            warn!(issuance.id = %issuance_id, "Attempted to edit a completed issuance");
            return Err(AppError::conflict(anyhow::anyhow!(
                "Cannot edit a completed issuance"
            )));
        }

        if let Some(new_quantity) = dto.quantity
            && new_quantity != existing.quantity
        {
            let quantity_diff = new_quantity - existing.quantity;

            let material = sqlx::query_as::<_, MaterialStockRow>(
                "SELECT quantity FROM materials WHERE id = $1 FOR UPDATE",
            )
            .bind(existing.material_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                error!(material.id = %existing.material_id, error = %e, "Database error locking material");
                AppError::from(e)
            })?;

            if quantity_diff > 0 && material.quantity < quantity_diff {
                warn!(
                    issuance.id = %issuance_id,
                    available = %material.quantity,
                    additional = %quantity_diff,
                    "Insufficient stock for issuance adjustment"
                );
                return Err(AppError::conflict(anyhow::anyhow!(
                    "Insufficient stock. Available: {}, Additional needed: {}",
                    material.quantity,
                    quantity_diff
                )));
            }

            sqlx::query(
                "UPDATE materials SET quantity = quantity - $2, updated_at = NOW() WHERE id = $1",
            )
            .bind(existing.material_id)
            .bind(quantity_diff)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!(material.id = %existing.material_id, error = %e, "Database error adjusting stock");
                AppError::from(e)
            })?;

            sqlx::query("UPDATE issuances SET quantity = $2 WHERE id = $1")
                .bind(issuance_id)
                .bind(new_quantity)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    error!(issuance.id = %issuance_id, error = %e, "Database error updating issuance quantity");
                    AppError::from(e)
                })?;
        }

        if let Some(remarks) = &dto.remarks {
            sqlx::query("UPDATE issuances SET remarks = $2 WHERE id = $1")
                .bind(issuance_id)
                .bind(remarks)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    error!(issuance.id = %issuance_id, error = %e, "Database error updating issuance remarks");
                    AppError::from(e)
                })?;
        }

        let query = format!("{} WHERE i.id = $1", ISSUANCE_SELECT);
        let row = sqlx::query_as::<_, IssuanceRow>(&query)
            .bind(issuance_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                error!(issuance.id = %issuance_id, error = %e, "Database error fetching updated issuance");
                AppError::from(e)
            })?;

        tx.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit issuance update");
            AppError::from(e)
        })?;

        info!(issuance.id = %issuance_id, "Issuance updated successfully");

        Ok(IssuanceResponse::from(row))
    }

    /// Deletes a pending issuance and returns its quantity to the material
    /// stock.
    #[instrument(skip(db), fields(issuance.id = %issuance_id, db.operation = "DELETE", db.table = "issuances"))]
    pub async fn delete_issuance(db: &PgPool, issuance_id: Uuid) -> Result<(), AppError> {
        debug!("Deleting issuance");

        let mut tx = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to begin transaction");
            AppError::from(e)
        })?;

        let existing = sqlx::query_as::<_, IssuanceGuardRow>(
            "SELECT i.material_id, i.quantity, (ci.id IS NOT NULL) AS completed
             FROM issuances i
             LEFT JOIN completed_issuances ci ON ci.issuance_id = i.id
             WHERE i.id = $1
             FOR UPDATE OF i",
        )
        .bind(issuance_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            error!(issuance.id = %issuance_id, error = %e, "Database error fetching issuance");
            AppError::from(e)
        })?
        .ok_or_else(|| {
            debug!(issuance.id = %issuance_id, "Issuance not found for deletion");
            AppError::not_found(anyhow::anyhow!("Issuance not found"))
        })?;

        if existing.completed {
            warn!(issuance.id = %issuance_id, "Attempted to delete a completed issuance");
            return Err(AppError::conflict(anyhow::anyhow!(
                "Cannot delete a completed issuance"
            )));
        }

        sqlx::query(
            "UPDATE materials SET quantity = quantity + $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(existing.material_id)
        .bind(existing.quantity)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!(material.id = %existing.material_id, error = %e, "Database error restoring stock");
            AppError::from(e)
        })?;

        sqlx::query("DELETE FROM issuances WHERE id = $1")
            .bind(issuance_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!(issuance.id = %issuance_id, error = %e, "Database error deleting issuance");
                AppError::from(e)
            })?;

        tx.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit issuance deletion");
            AppError::from(e)
        })?;

        info!(
            issuance.id = %issuance_id,
            restored = %existing.quantity,
            "Issuance deleted and quantity returned to inventory"
        );

        Ok(())
    }

    /// Records the delivery of an issuance, closing it.
    ///
    /// The issuance row is locked while the delivery record is written;
    /// the unique constraint on the issuance reference backstops the
    /// already-completed check.
    #[instrument(skip(db, dto), fields(issuance.id = %issuance_id, db.operation = "INSERT", db.table = "completed_issuances"))]
    pub async fn complete_issuance(
        db: &PgPool,
        issuance_id: Uuid,
        dto: CompleteIssuanceDto,
    ) -> Result<CompletedWithIssuance, AppError> {
        debug!("Completing issuance");

        let mut tx = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to begin transaction");
            AppError::from(e)
        })?;

        let existing = sqlx::query_as::<_, IssuanceGuardRow>(
            "SELECT i.material_id, i.quantity, (ci.id IS NOT NULL) AS completed
             FROM issuances i
             LEFT JOIN completed_issuances ci ON ci.issuance_id = i.id
             WHERE i.id = $1
             FOR UPDATE OF i",
        )
        .bind(issuance_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            error!(issuance.id = %issuance_id, error = %e, "Database error fetching issuance");
            AppError::from(e)
        })?
        .ok_or_else(|| {
            debug!(issuance.id = %issuance_id, "Issuance not found for completion");
            AppError::not_found(anyhow::anyhow!("Issuance not found"))
        })?;

        if existing.completed {
            warn!(issuance.id = %issuance_id, "Issuance already completed");
            return Err(AppError::conflict(anyhow::anyhow!(
                "Issuance is already completed"
            )));
        }

        let record = sqlx::query_as::<_, CompletedIssuance>(
            "INSERT INTO completed_issuances
                 (issuance_id, material_id, school_id, quantity, date_issued, delivered_at, received_by, remarks)
             SELECT i.id, i.material_id, i.school_id, i.quantity, i.issued_at, COALESCE($2, NOW()), $3, $4
             FROM issuances i WHERE i.id = $1
             RETURNING id, issuance_id, material_id, school_id, quantity, date_issued, delivered_at, received_by, remarks",
        )
        .bind(issuance_id)
        .bind(dto.delivered_at)
        .bind(&dto.received_by)
        .bind(&dto.remarks)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e
                && db_err.is_unique_violation()
            {
                warn!(issuance.id = %issuance_id, "Concurrent completion rejected");
                return AppError::conflict(anyhow::anyhow!("Issuance is already completed"));
            }
            error!(issuance.id = %issuance_id, error = %e, "Database error completing issuance");
            AppError::from(e)
        })?;

        let query = format!("{} WHERE i.id = $1", ISSUANCE_SELECT);
        let row = sqlx::query_as::<_, IssuanceRow>(&query)
            .bind(issuance_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                error!(issuance.id = %issuance_id, error = %e, "Database error fetching completed issuance");
                AppError::from(e)
            })?;

        tx.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit issuance completion");
            AppError::from(e)
        })?;

        info!(
            issuance.id = %issuance_id,
            completed.id = %record.id,
            "Issuance completed successfully"
        );

        Ok(CompletedWithIssuance {
            record,
            issuance: IssuanceEmbed::from(row),
        })
    }
}

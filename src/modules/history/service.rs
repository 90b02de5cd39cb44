//! Delivery-history queries over completed issuances.

use sqlx::PgPool;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::modules::history::model::{
    HistoryDetailResponse, HistoryDetailRow, HistoryFilterParams, HistoryListItem, HistoryRow,
};
use crate::utils::errors::AppError;
use crate::utils::pagination::PaginationMeta;

/// Listing columns: the delivery record plus material, subject-name, and
/// school summary fields, in [`HistoryRow`] order.
const HISTORY_LIST_SELECT: &str = "SELECT ci.id, ci.issuance_id, ci.material_id, ci.school_id, ci.quantity, \
     ci.date_issued, ci.delivered_at, ci.received_by, ci.remarks, \
     m.title AS m_title, m.grade_level AS m_grade_level, m.education_stage AS m_education_stage, \
     sub.name AS sub_name, \
     s.schoolname AS s_schoolname, s.municipality AS s_municipality, \
     s.congressional_district AS s_congressional_district \
     FROM completed_issuances ci \
     INNER JOIN materials m ON m.id = ci.material_id \
     INNER JOIN subjects sub ON sub.id = m.subject_id \
     INNER JOIN schools s ON s.id = ci.school_id";

const HISTORY_DETAIL_SELECT: &str = "SELECT ci.id, ci.issuance_id, ci.material_id, ci.school_id, ci.quantity, \
     ci.date_issued, ci.delivered_at, ci.received_by, ci.remarks, \
     m.title AS m_title, m.grade_level AS m_grade_level, m.education_stage AS m_education_stage, \
     m.quantity AS m_quantity, m.source AS m_source, m.created_at AS m_created_at, m.updated_at AS m_updated_at, \
     sub.id AS sub_id, sub.name AS sub_name, sub.category AS sub_category, sub.strand AS sub_strand, \
     sub.education_stage AS sub_education_stage, sub.created_at AS sub_created_at, sub.updated_at AS sub_updated_at, \
     s.school_id AS s_school_id, s.schoolname AS s_schoolname, s.schooltype AS s_schooltype, \
     s.municipality AS s_municipality, s.congressional_district AS s_congressional_district, \
     s.zone AS s_zone, s.created_at AS s_created_at, s.updated_at AS s_updated_at \
     FROM completed_issuances ci \
     INNER JOIN materials m ON m.id = ci.material_id \
     INNER JOIN subjects sub ON sub.id = m.subject_id \
     INNER JOIN schools s ON s.id = ci.school_id";

pub struct HistoryService;

impl HistoryService {
    /// Lists delivery records, filtered and paginated, most recent
    /// delivery first.
    #[instrument(skip(db, filters), fields(db.operation = "SELECT", db.table = "completed_issuances"))]
    pub async fn get_all_completed_issuances(
        db: &PgPool,
        filters: HistoryFilterParams,
    ) -> Result<(Vec<HistoryListItem>, PaginationMeta), AppError> {
        let page = filters.pagination.page();
        let limit = filters.pagination.limit();
        let offset = filters.pagination.offset();

        debug!(
            page = %page,
            limit = %limit,
            filter.school_id = ?filters.school_id,
            filter.material_id = ?filters.material_id,
            filter.search = ?filters.search,
            "Fetching delivery history"
        );

        let mut where_clause = String::new();
        let mut params = Vec::new();

        if let Some(school_id) = filters.school_id {
            params.push(school_id.to_string());
            where_clause.push_str(&format!(" AND ci.school_id = ${}::uuid", params.len()));
        }

        if let Some(material_id) = filters.material_id {
            params.push(material_id.to_string());
            where_clause.push_str(&format!(" AND ci.material_id = ${}::uuid", params.len()));
        }

        if let Some(start_date) = filters.start_date {
            params.push(start_date.to_rfc3339());
            where_clause.push_str(&format!(
                " AND ci.delivered_at >= ${}::timestamptz",
                params.len()
            ));
        }

        if let Some(end_date) = filters.end_date {
            params.push(end_date.to_rfc3339());
            where_clause.push_str(&format!(
                " AND ci.delivered_at <= ${}::timestamptz",
                params.len()
            ));
        }

        if let Some(search) = &filters.search {
            params.push(format!("%{}%", search));
            where_clause.push_str(&format!(
                " AND (m.title ILIKE ${p} OR s.schoolname ILIKE ${p} OR ci.remarks ILIKE ${p})",
                p = params.len()
            ));
        }

        let mut count_query = String::from(
            "SELECT COUNT(*) FROM completed_issuances ci \
             INNER JOIN materials m ON m.id = ci.material_id \
             INNER JOIN schools s ON s.id = ci.school_id WHERE 1=1",
        );
        count_query.push_str(&where_clause);

        let mut count_sql = sqlx::query_scalar::<_, i64>(&count_query);
        for param in &params {
            count_sql = count_sql.bind(param);
        }
        let total = count_sql.fetch_one(db).await.map_err(|e| {
            error!(error = %e, "Database error counting delivery history");
            AppError::from(e)
        })?;

        let mut data_query = format!("{} WHERE 1=1", HISTORY_LIST_SELECT);
        data_query.push_str(&where_clause);
        data_query.push_str(" ORDER BY ci.delivered_at DESC");
        data_query.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset));

        let mut data_sql = sqlx::query_as::<_, HistoryRow>(&data_query);
        for param in params {
            data_sql = data_sql.bind(param);
        }
        let rows = data_sql.fetch_all(db).await.map_err(|e| {
            error!(error = %e, "Database error fetching delivery history");
            AppError::from(e)
        })?;

        let records: Vec<HistoryListItem> = rows.into_iter().map(HistoryListItem::from).collect();

        debug!(total = %total, returned = records.len(), "Delivery history fetched successfully");

        Ok((records, filters.pagination.meta(total)))
    }

    /// Fetches a single delivery record with its full material and school.
    #[instrument(skip(db), fields(completed.id = %record_id, db.operation = "SELECT", db.table = "completed_issuances"))]
    pub async fn get_completed_issuance_by_id(
        db: &PgPool,
        record_id: Uuid,
    ) -> Result<HistoryDetailResponse, AppError> {
        debug!("Fetching delivery record by ID");

        let query = format!("{} WHERE ci.id = $1", HISTORY_DETAIL_SELECT);
        let row = sqlx::query_as::<_, HistoryDetailRow>(&query)
            .bind(record_id)
            .fetch_optional(db)
            .await
            .map_err(|e| {
                error!(completed.id = %record_id, error = %e, "Database error fetching delivery record");
                AppError::from(e)
            })?
            .ok_or_else(|| {
                debug!(completed.id = %record_id, "Delivery record not found");
                AppError::not_found(anyhow::anyhow!("Completed issuance not found"))
            })?;

        Ok(HistoryDetailResponse::from(row))
    }

    /// Removes a delivery record. The underlying issuance keeps its stock
    /// deduction and reverts to pending.
    #[instrument(skip(db), fields(completed.id = %record_id, db.operation = "DELETE", db.table = "completed_issuances"))]
    pub async fn delete_completed_issuance(db: &PgPool, record_id: Uuid) -> Result<(), AppError> {
        debug!("Deleting delivery record");

        let exists =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM completed_issuances WHERE id = $1")
                .bind(record_id)
                .fetch_one(db)
                .await
                .map_err(|e| {
                    error!(completed.id = %record_id, error = %e, "Database error checking delivery record");
                    AppError::from(e)
                })?;

        if exists == 0 {
            debug!(completed.id = %record_id, "Delivery record not found for deletion");
            return Err(AppError::not_found(anyhow::anyhow!(
                "Completed issuance not found"
            )));
        }

        sqlx::query("DELETE FROM completed_issuances WHERE id = $1")
            .bind(record_id)
            .execute(db)
            .await
            .map_err(|e| {
                error!(completed.id = %record_id, error = %e, "Database error deleting delivery record");
                AppError::from(e)
            })?;

        info!(completed.id = %record_id, "Delivery record deleted successfully");

        Ok(())
    }
}

//! Subject management service.

use sqlx::PgPool;
use tracing::{debug, error, info, instrument, warn};

use crate::modules::subjects::model::{CreateSubjectDto, Subject, SubjectWithCount};
use crate::utils::errors::AppError;

pub struct SubjectService;

impl SubjectService {
    /// Lists every subject with its material count, ordered by education
    /// stage and then name.
    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "subjects"))]
    pub async fn get_all_subjects(db: &PgPool) -> Result<Vec<SubjectWithCount>, AppError> {
        debug!("Fetching all subjects with material counts");

        let subjects = sqlx::query_as::<_, SubjectWithCount>(
            "SELECT s.id, s.name, s.category, s.strand, s.education_stage,
                    s.created_at, s.updated_at,
                    COUNT(m.id)::bigint AS material_count
             FROM subjects s
             LEFT JOIN materials m ON m.subject_id = s.id
             GROUP BY s.id
             ORDER BY s.education_stage, s.name",
        )
        .fetch_all(db)
        .await
        .map_err(|e| {
            error!(error = %e, "Database error fetching subjects");
            AppError::from(e)
        })?;

        debug!(returned = subjects.len(), "Subjects fetched successfully");
        Ok(subjects)
    }

    /// Creates a subject. A (name, education stage) pair can only exist once.
    #[instrument(skip(db, dto), fields(subject.name = %dto.name, db.operation = "INSERT", db.table = "subjects"))]
    pub async fn create_subject(db: &PgPool, dto: CreateSubjectDto) -> Result<Subject, AppError> {
        debug!(
            subject.name = %dto.name,
            subject.education_stage = %dto.education_stage,
            "Creating new subject"
        );

        let subject = sqlx::query_as::<_, Subject>(
            "INSERT INTO subjects (name, category, strand, education_stage)
             VALUES ($1, $2, $3, $4)
             RETURNING id, name, category, strand, education_stage, created_at, updated_at",
        )
        .bind(&dto.name)
        .bind(&dto.category)
        .bind(&dto.strand)
        .bind(dto.education_stage)
        .fetch_one(db)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e
                && db_err.is_unique_violation()
            {
                warn!(subject.name = %dto.name, "Attempted to create duplicate subject");
                return AppError::conflict(anyhow::anyhow!(
                    "A subject with this name already exists for this education stage"
                ));
            }
            error!(error = %e, subject.name = %dto.name, "Database error creating subject");
            AppError::from(e)
        })?;

        info!(
            subject.id = %subject.id,
            subject.name = %subject.name,
            "Subject created successfully"
        );

        Ok(subject)
    }
}

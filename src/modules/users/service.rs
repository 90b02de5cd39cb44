//! Account management service.
//!
//! Password hashes never leave this layer; every query that returns rows
//! to a caller selects [`USER_COLUMNS`].

use sqlx::PgPool;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::modules::users::model::{
    ChangePasswordDto, CreateUserDto, USER_COLUMNS, UpdateUserDto, User, UserFilterParams, UserRole,
};
use crate::utils::errors::AppError;
use crate::utils::pagination::PaginationMeta;
use crate::utils::password::{hash_password, verify_password};

#[derive(sqlx::FromRow)]
struct PasswordRow {
    password: String,
}

pub struct UserService;

impl UserService {
    /// Lists accounts, filtered and paginated, newest first.
    #[instrument(skip(db, filters), fields(db.operation = "SELECT", db.table = "users"))]
    pub async fn get_all_users(
        db: &PgPool,
        filters: UserFilterParams,
    ) -> Result<(Vec<User>, PaginationMeta), AppError> {
        let page = filters.pagination.page();
        let limit = filters.pagination.limit();
        let offset = filters.pagination.offset();

        debug!(
            page = %page,
            limit = %limit,
            filter.search = ?filters.search,
            filter.role = ?filters.role,
            "Fetching users"
        );

        let mut where_clause = String::new();
        let mut params = Vec::new();

        if let Some(search) = &filters.search {
            params.push(format!("%{}%", search));
            where_clause.push_str(&format!(
                " AND (username ILIKE ${p} OR name ILIKE ${p})",
                p = params.len()
            ));
        }

        if let Some(role) = filters.role {
            params.push(role.to_string());
            where_clause.push_str(&format!(" AND role = ${}", params.len()));
        }

        let mut count_query = String::from("SELECT COUNT(*) FROM users WHERE 1=1");
        count_query.push_str(&where_clause);

        let mut count_sql = sqlx::query_scalar::<_, i64>(&count_query);
        for param in &params {
            count_sql = count_sql.bind(param);
        }
        let total = count_sql.fetch_one(db).await.map_err(|e| {
            error!(error = %e, "Database error counting users");
            AppError::from(e)
        })?;

        let mut data_query = format!("SELECT {} FROM users WHERE 1=1", USER_COLUMNS);
        data_query.push_str(&where_clause);
        data_query.push_str(" ORDER BY created_at DESC");
        data_query.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset));

        let mut data_sql = sqlx::query_as::<_, User>(&data_query);
        for param in params {
            data_sql = data_sql.bind(param);
        }
        let users = data_sql.fetch_all(db).await.map_err(|e| {
            error!(error = %e, "Database error fetching users");
            AppError::from(e)
        })?;

        debug!(total = %total, returned = users.len(), "Users fetched successfully");

        Ok((users, filters.pagination.meta(total)))
    }

    /// Fetches a single account.
    #[instrument(skip(db), fields(user.id = %user_id, db.operation = "SELECT", db.table = "users"))]
    pub async fn get_user_by_id(db: &PgPool, user_id: Uuid) -> Result<User, AppError> {
        debug!("Fetching user by ID");

        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        sqlx::query_as::<_, User>(&query)
            .bind(user_id)
            .fetch_optional(db)
            .await
            .map_err(|e| {
                error!(user.id = %user_id, error = %e, "Database error fetching user");
                AppError::from(e)
            })?
            .ok_or_else(|| {
                debug!(user.id = %user_id, "User not found");
                AppError::not_found(anyhow::anyhow!("User not found"))
            })
    }

    /// Creates an account with a freshly hashed password. Role defaults
    /// to `USER`.
    #[instrument(skip(db, dto), fields(db.operation = "INSERT", db.table = "users"))]
    pub async fn create_user(db: &PgPool, dto: CreateUserDto) -> Result<User, AppError> {
        let (Some(username), Some(password), Some(name)) = (dto.username, dto.password, dto.name)
        else {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Username, password, and name are required"
            )));
        };

        debug!(user.username = %username, "Creating user");

        let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE username = $1")
            .bind(&username)
            .fetch_one(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Database error checking username");
                AppError::from(e)
            })?;

        if existing > 0 {
            warn!(user.username = %username, "Username already taken");
            return Err(AppError::conflict(anyhow::anyhow!("Username already exists")));
        }

        let hashed = hash_password(&password)?;
        let role = dto.role.unwrap_or(UserRole::User);

        let query = format!(
            "INSERT INTO users (username, password, name, role)
             VALUES ($1, $2, $3, $4)
             RETURNING {}",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(&username)
            .bind(&hashed)
            .bind(&name)
            .bind(role)
            .fetch_one(db)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e
                    && db_err.is_unique_violation()
                {
                    warn!(user.username = %username, "Username already taken");
                    return AppError::conflict(anyhow::anyhow!("Username already exists"));
                }
                error!(error = %e, "Database error creating user");
                AppError::from(e)
            })?;

        info!(user.id = %user.id, user.username = %user.username, "User created successfully");

        Ok(user)
    }

    /// Applies a partial update to an account. A provided password is
    /// re-hashed before storage.
    #[instrument(skip(db, dto), fields(user.id = %user_id, db.operation = "UPDATE", db.table = "users"))]
    pub async fn update_user(
        db: &PgPool,
        user_id: Uuid,
        dto: UpdateUserDto,
    ) -> Result<User, AppError> {
        debug!("Updating user");

        let existing = Self::get_user_by_id(db, user_id).await?;

        if let Some(username) = &dto.username
            && *username != existing.username
        {
            let taken =
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE username = $1")
                    .bind(username)
                    .fetch_one(db)
                    .await
                    .map_err(|e| {
                        error!(error = %e, "Database error checking username");
                        AppError::from(e)
                    })?;

            if taken > 0 {
                warn!(user.username = %username, "Username already taken");
                return Err(AppError::conflict(anyhow::anyhow!("Username already exists")));
            }
        }

        let mut query = String::from("UPDATE users SET updated_at = NOW()");
        let mut param_count = 1;

        if dto.username.is_some() {
            param_count += 1;
            query.push_str(&format!(", username = ${}", param_count));
        }
        if dto.name.is_some() {
            param_count += 1;
            query.push_str(&format!(", name = ${}", param_count));
        }
        if dto.role.is_some() {
            param_count += 1;
            query.push_str(&format!(", role = ${}", param_count));
        }
        let hashed = match &dto.password {
            Some(password) => {
                param_count += 1;
                query.push_str(&format!(", password = ${}", param_count));
                Some(hash_password(password)?)
            }
            None => None,
        };

        query.push_str(&format!(" WHERE id = $1 RETURNING {}", USER_COLUMNS));

        let mut query_builder = sqlx::query_as::<_, User>(&query).bind(user_id);
        if let Some(username) = dto.username {
            query_builder = query_builder.bind(username);
        }
        if let Some(name) = dto.name {
            query_builder = query_builder.bind(name);
        }
        if let Some(role) = dto.role {
            query_builder = query_builder.bind(role);
        }
        if let Some(hashed) = hashed {
            query_builder = query_builder.bind(hashed);
        }

        let user = query_builder.fetch_one(db).await.map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e
                && db_err.is_unique_violation()
            {
                return AppError::conflict(anyhow::anyhow!("Username already exists"));
            }
            error!(user.id = %user_id, error = %e, "Database error updating user");
            AppError::from(e)
        })?;

        info!(user.id = %user_id, "User updated successfully");

        Ok(user)
    }

    /// Deletes an account. Admin accounts are protected.
    #[instrument(skip(db), fields(user.id = %user_id, db.operation = "DELETE", db.table = "users"))]
    pub async fn delete_user(db: &PgPool, user_id: Uuid) -> Result<(), AppError> {
        debug!("Deleting user");

        let role = sqlx::query_scalar::<_, UserRole>("SELECT role FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(db)
            .await
            .map_err(|e| {
                error!(user.id = %user_id, error = %e, "Database error fetching user");
                AppError::from(e)
            })?
            .ok_or_else(|| {
                debug!(user.id = %user_id, "User not found for deletion");
                AppError::not_found(anyhow::anyhow!("User not found"))
            })?;

        if role == UserRole::Admin {
            warn!(user.id = %user_id, "Attempted to delete an admin account");
            return Err(AppError::conflict(anyhow::anyhow!(
                "Cannot delete admin account"
            )));
        }

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(db)
            .await
            .map_err(|e| {
                error!(user.id = %user_id, error = %e, "Database error deleting user");
                AppError::from(e)
            })?;

        info!(user.id = %user_id, "User deleted successfully");

        Ok(())
    }

    /// Changes a password after verifying the current one.
    #[instrument(skip(db, dto), fields(user.id = %user_id, db.operation = "UPDATE", db.table = "users"))]
    pub async fn change_password(
        db: &PgPool,
        user_id: Uuid,
        dto: ChangePasswordDto,
    ) -> Result<(), AppError> {
        let (Some(current_password), Some(new_password)) = (dto.current_password, dto.new_password)
        else {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Current password and new password are required"
            )));
        };

        debug!("Changing password");

        let row = sqlx::query_as::<_, PasswordRow>("SELECT password FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(db)
            .await
            .map_err(|e| {
                error!(user.id = %user_id, error = %e, "Database error fetching user");
                AppError::from(e)
            })?
            .ok_or_else(|| {
                debug!(user.id = %user_id, "User not found for password change");
                AppError::not_found(anyhow::anyhow!("User not found"))
            })?;

        if !verify_password(&current_password, &row.password)? {
            warn!(user.id = %user_id, "Current password mismatch");
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Current password is incorrect"
            )));
        }

        let hashed = hash_password(&new_password)?;

        sqlx::query("UPDATE users SET password = $2, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .bind(&hashed)
            .execute(db)
            .await
            .map_err(|e| {
                error!(user.id = %user_id, error = %e, "Database error updating password");
                AppError::from(e)
            })?;

        info!(user.id = %user_id, "Password changed successfully");

        Ok(())
    }
}

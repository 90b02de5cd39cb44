//! Login flow.
//!
//! Unknown usernames and wrong passwords produce the same 401 message, so
//! the response never reveals which half failed.

use sqlx::PgPool;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::jwt::JwtConfig;
use crate::modules::users::model::{User, UserRole};
use crate::utils::errors::AppError;
use crate::utils::jwt::create_access_token;
use crate::utils::password::verify_password;

use super::model::{LoginRequest, LoginResponse};

pub struct AuthService;

impl AuthService {
    #[instrument(skip(db, dto, jwt_config), fields(db.operation = "SELECT", db.table = "users"))]
    pub async fn login_user(
        db: &PgPool,
        dto: LoginRequest,
        jwt_config: &JwtConfig,
    ) -> Result<LoginResponse, AppError> {
        let (Some(username), Some(password)) = (dto.username, dto.password) else {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Username and password are required"
            )));
        };

        debug!(user.username = %username, "Login attempt");

        #[derive(sqlx::FromRow)]
        struct UserWithPassword {
            id: Uuid,
            username: String,
            name: String,
            role: UserRole,
            password: String,
            created_at: chrono::DateTime<chrono::Utc>,
            updated_at: chrono::DateTime<chrono::Utc>,
        }

        let user_with_password = sqlx::query_as::<_, UserWithPassword>(
            "SELECT id, username, name, role, password, created_at, updated_at
             FROM users WHERE username = $1",
        )
        .bind(&username)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| {
            warn!(user.username = %username, "Login failed: unknown username");
            AppError::unauthorized(anyhow::anyhow!("Invalid username or password"))
        })?;

        let is_valid = verify_password(&password, &user_with_password.password)?;

        if !is_valid {
            warn!(user.username = %username, "Login failed: wrong password");
            return Err(AppError::unauthorized(anyhow::anyhow!(
                "Invalid username or password"
            )));
        }

        let token = create_access_token(
            user_with_password.id,
            &user_with_password.username,
            user_with_password.role,
            jwt_config,
        )?;

        let user = User {
            id: user_with_password.id,
            username: user_with_password.username,
            name: user_with_password.name,
            role: user_with_password.role,
            created_at: user_with_password.created_at,
            updated_at: user_with_password.updated_at,
        };

        info!(user.id = %user.id, user.username = %user.username, "Login successful");

        Ok(LoginResponse { token, user })
    }
}

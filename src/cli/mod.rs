use crate::modules::users::model::UserRole;
use crate::utils::password::hash_password;
use sqlx::PgPool;

pub mod seeder;

pub async fn create_admin_user(
    db: &PgPool,
    username: &str,
    name: &str,
    password: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let hashed_password =
        hash_password(password).map_err(|e| format!("Failed to hash password: {}", e.error))?;

    let result = sqlx::query(
        "INSERT INTO users (username, password, name, role)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (username) DO NOTHING",
    )
    .bind(username)
    .bind(hashed_password)
    .bind(name)
    .bind(UserRole::Admin)
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Err("User with this username already exists".into());
    }

    Ok(())
}

//! User data models and DTOs.
//!
//! # Core Types
//!
//! - [`User`] - User entity as exposed over the API (never carries the
//!   password hash)
//! - [`UserRole`] - The two system roles
//! - [`UserSummary`] - Trimmed user shape embedded in issuance responses
//!
//! # Request DTOs
//!
//! - [`CreateUserDto`] - Create a new account
//! - [`UpdateUserDto`] - Partial account update
//! - [`ChangePasswordDto`] - Change a password with current-password proof
//! - [`UserFilterParams`] - Query parameters for the user listing
//!
//! # Roles
//!
//! `ADMIN` accounts manage other accounts and cannot be deleted. `USER`
//! accounts have full access to the inventory but not to user management.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::utils::pagination::PaginationParams;
use crate::utils::serde::deserialize_optional_from_str;

/// Columns selected whenever a [`User`] row leaves the database. The
/// password column stays behind.
pub const USER_COLUMNS: &str = "id, username, name, role, created_at, updated_at";

/// Account role, stored as TEXT.
#[derive(Serialize, Deserialize, sqlx::Type, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Admin,
    User,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UserRole::Admin => "ADMIN",
            UserRole::User => "USER",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ADMIN" => Ok(UserRole::Admin),
            "USER" => Ok(UserRole::User),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// An account in the system.
#[derive(Serialize, Deserialize, FromRow, Debug, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub role: UserRole,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// The issuing user embedded in issuance responses.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
}

/// DTO for creating an account. Field presence is checked in the service
/// so the missing-field message lists all three together.
#[derive(Deserialize, Debug, Clone, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserDto {
    pub username: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub role: Option<UserRole>,
}

/// DTO for a partial account update. A password here is re-hashed; role
/// changes take effect on the user's next login token.
#[derive(Deserialize, Debug, Clone, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserDto {
    pub username: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub role: Option<UserRole>,
}

#[derive(Deserialize, Debug, Clone, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordDto {
    pub current_password: Option<String>,
    #[validate(length(min = 6, message = "New password must be at least 6 characters"))]
    pub new_password: Option<String>,
}

/// User listing filters. The search term matches username or name.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserFilterParams {
    pub search: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    pub role: Option<UserRole>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

//! Configuration modules, each loaded from environment variables.
//!
//! - [`cors`]: CORS allowed-origin configuration
//! - [`database`]: PostgreSQL connection pool initialization
//! - [`jwt`]: JWT session token configuration
//!
//! # Example
//!
//! ```ignore
//! use crate::config::jwt::JwtConfig;
//! use crate::config::database::init_db_pool;
//!
//! let jwt_config = JwtConfig::from_env();
//! let db = init_db_pool().await;
//! ```

pub mod cors;
pub mod database;
pub mod jwt;

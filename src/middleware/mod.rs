//! Middleware and extractors for authentication and authorization.
//!
//! - [`auth`]: the [`auth::AuthUser`] extractor that validates the bearer
//!   token on every protected route
//! - [`role`]: role-gating middleware for admin-only route groups
//!
//! # Authentication Flow
//!
//! 1. Client logs in and receives a JWT
//! 2. Subsequent requests carry `Authorization: Bearer <token>`
//! 3. `AuthUser` validates the token and exposes its claims
//! 4. Admin-only groups additionally pass through [`role::require_admin`]

pub mod auth;
pub mod role;

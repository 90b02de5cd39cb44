//! Utility modules shared across the API.
//!
//! - [`csv`]: CSV rendering for the export endpoints
//! - [`errors`]: Application error type and HTTP mapping
//! - [`jwt`]: JWT token creation and verification
//! - [`pagination`]: Pagination parameters and metadata
//! - [`password`]: Password hashing and verification
//! - [`response`]: The uniform JSON response envelope
//! - [`serde`]: Custom serde deserialization helpers

pub mod csv;
pub mod errors;
pub mod jwt;
pub mod pagination;
pub mod password;
pub mod response;
pub mod serde;

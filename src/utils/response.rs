use serde::Serialize;

use crate::utils::pagination::PaginationMeta;

/// Uniform JSON envelope shared by every endpoint.
///
/// Success responses carry `data` (plus `pagination` for listings); error
/// responses come from [`crate::utils::errors::AppError`] and carry only
/// `success: false` and a `message`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationMeta>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            pagination: None,
        }
    }

    pub fn ok_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
            pagination: None,
        }
    }

    pub fn paginated(data: T, pagination: PaginationMeta) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            pagination: Some(pagination),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
            pagination: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_omits_message_and_pagination() {
        let response = ApiResponse::ok(vec![1, 2, 3]);
        let serialized = serde_json::to_string(&response).unwrap();
        assert_eq!(serialized, r#"{"success":true,"data":[1,2,3]}"#);
    }

    #[test]
    fn test_message_only() {
        let response = ApiResponse::message("School deleted successfully");
        let serialized = serde_json::to_string(&response).unwrap();
        assert_eq!(
            serialized,
            r#"{"success":true,"message":"School deleted successfully"}"#
        );
    }

    #[test]
    fn test_paginated_includes_meta() {
        let response = ApiResponse::paginated(vec!["a"], PaginationMeta::new(1, 10, 1));
        let serialized = serde_json::to_string(&response).unwrap();
        assert!(serialized.contains(r#""pagination":{"page":1"#));
    }
}

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::utils::serde::deserialize_optional_i64;

/// Pagination block returned alongside every paginated listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl PaginationMeta {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        Self {
            page,
            limit,
            total,
            total_pages: (total + limit - 1) / limit,
        }
    }
}

/// Query-string pagination parameters, 1-based pages.
///
/// Both fields tolerate empty strings, which the client sends for untouched
/// filter controls.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PaginationParams {
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub page: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub limit: Option<i64>,
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: Some(1),
            limit: Some(10),
        }
    }
}

impl PaginationParams {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(10).max(1).min(100)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.limit()
    }

    pub fn meta(&self, total: i64) -> PaginationMeta {
        PaginationMeta::new(self.page(), self.limit(), total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_params_default() {
        let params = PaginationParams::default();
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), 10);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_pagination_params_custom_values() {
        let params = PaginationParams {
            page: Some(3),
            limit: Some(20),
        };
        assert_eq!(params.page(), 3);
        assert_eq!(params.limit(), 20);
        assert_eq!(params.offset(), 40);
    }

    #[test]
    fn test_pagination_params_limit_boundary_cases() {
        let test_cases = vec![
            (Some(1), 1),
            (Some(50), 50),
            (Some(100), 100),
            (Some(101), 100),
            (Some(0), 1),
            (Some(-1), 1),
            (None, 10),
        ];

        for (input, expected) in test_cases {
            let params = PaginationParams {
                page: Some(1),
                limit: input,
            };
            assert_eq!(params.limit(), expected);
        }
    }

    #[test]
    fn test_pagination_params_page_clamped_to_one() {
        let params = PaginationParams {
            page: Some(-4),
            limit: Some(10),
        };
        assert_eq!(params.page(), 1);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_pagination_params_deserialize_with_values() {
        let json = r#"{"page":"2","limit":"25"}"#;
        let params: PaginationParams = serde_json::from_str(json).unwrap();
        assert_eq!(params.page(), 2);
        assert_eq!(params.limit(), 25);
        assert_eq!(params.offset(), 25);
    }

    #[test]
    fn test_pagination_params_deserialize_empty_strings() {
        let json = r#"{"page":"","limit":""}"#;
        let params: PaginationParams = serde_json::from_str(json).unwrap();
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), 10);
    }

    #[test]
    fn test_pagination_params_deserialize_missing_fields() {
        let json = r#"{}"#;
        let params: PaginationParams = serde_json::from_str(json).unwrap();
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), 10);
    }

    #[test]
    fn test_pagination_meta_rounds_pages_up() {
        let meta = PaginationMeta::new(1, 10, 35);
        assert_eq!(meta.total_pages, 4);
    }

    #[test]
    fn test_pagination_meta_exact_division() {
        let meta = PaginationMeta::new(2, 10, 40);
        assert_eq!(meta.total_pages, 4);
    }

    #[test]
    fn test_pagination_meta_zero_total() {
        let meta = PaginationMeta::new(1, 10, 0);
        assert_eq!(meta.total_pages, 0);
    }

    #[test]
    fn test_pagination_meta_serialize_camel_case() {
        let meta = PaginationMeta::new(3, 20, 100);
        let serialized = serde_json::to_string(&meta).unwrap();
        assert!(serialized.contains(r#""page":3"#));
        assert!(serialized.contains(r#""limit":20"#));
        assert!(serialized.contains(r#""total":100"#));
        assert!(serialized.contains(r#""totalPages":5"#));
    }
}

//! The `{success, message, data, pagination}` wrapper every API response uses.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use spin_sdk::http::Response;

use crate::config::MAX_PAGE_SIZE;
use crate::core::errors::ApiError;
use crate::core::query_params::get_u32;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationInfo>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            pagination: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            pagination: None,
        }
    }

    pub fn with_pagination(mut self, pagination: PaginationInfo) -> Self {
        self.pagination = Some(pagination);
        self
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaginationInfo {
    pub current_page: u32,
    pub total_pages: u32,
    pub page_size: u32,
    pub total_items: u64,
}

/// A validated `page`/`pageSize` pair. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn from_params(params: &HashMap<String, String>, default_size: u32) -> Self {
        Self::new(
            get_u32(params, "page", 1),
            get_u32(params, "pageSize", default_size),
        )
    }

    pub fn offset(&self) -> usize {
        (self.page as usize - 1).saturating_mul(self.page_size as usize)
    }

    /// The window of `items` this page covers; empty past the end.
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = self.offset().min(items.len());
        let end = (start + self.page_size as usize).min(items.len());
        &items[start..end]
    }

    pub fn info(&self, total_items: usize) -> PaginationInfo {
        let total_items = total_items as u64;
        let size = u64::from(self.page_size);
        PaginationInfo {
            current_page: self.page,
            total_pages: total_items.div_ceil(size) as u32,
            page_size: self.page_size,
            total_items,
        }
    }
}

pub fn json_response<T: Serialize>(status: u16, envelope: &ApiResponse<T>) -> Result<Response, ApiError> {
    let body = serde_json::to_vec(envelope).map_err(|e| ApiError::InternalError(e.to_string()))?;
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(body)
        .build())
}

pub fn ok<T: Serialize>(message: &str, data: T) -> Result<Response, ApiError> {
    json_response(200, &ApiResponse::ok(message, data))
}

pub fn created<T: Serialize>(message: &str, data: T) -> Result<Response, ApiError> {
    json_response(201, &ApiResponse::ok(message, data))
}

/// Success without a payload.
pub fn done(message: &str) -> Result<Response, ApiError> {
    json_response(
        200,
        &ApiResponse::<()> {
            success: true,
            message: message.to_string(),
            data: None,
            pagination: None,
        },
    )
}

pub fn paginated<T: Serialize>(
    message: &str,
    data: Vec<T>,
    page: PageRequest,
    total_items: usize,
) -> Result<Response, ApiError> {
    json_response(
        200,
        &ApiResponse::ok(message, data).with_pagination(page.info(total_items)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_slices_stop_at_the_end() {
        let items: Vec<u32> = (1..=25).collect();
        let third = PageRequest::new(3, 10);
        assert_eq!(third.slice(&items), &[21, 22, 23, 24, 25]);
        assert!(PageRequest::new(4, 10).slice(&items).is_empty());
    }

    #[test]
    fn huge_page_numbers_are_empty() {
        let items: Vec<u32> = (1..=5).collect();
        let last = PageRequest::new(u32::MAX, MAX_PAGE_SIZE);
        assert!(last.slice(&items).is_empty());
        assert_eq!(last.info(items.len()).total_pages, 1);
    }

    #[test]
    fn page_info_rounds_total_pages_up() {
        let info = PageRequest::new(1, 10).info(25);
        assert_eq!(info.total_pages, 3);
        assert_eq!(info.total_items, 25);
        assert_eq!(PageRequest::new(1, 10).info(0).total_pages, 0);
    }

    #[test]
    fn page_size_is_clamped() {
        assert_eq!(PageRequest::new(0, 0), PageRequest::new(1, 1));
        assert_eq!(PageRequest::new(2, 500).page_size, MAX_PAGE_SIZE);
    }

    #[test]
    fn envelope_omits_missing_parts() {
        let json = serde_json::to_value(ApiResponse::<u32>::failure("nope")).unwrap();
        assert_eq!(json, serde_json::json!({"success": false, "message": "nope"}));

        let json = serde_json::to_value(
            ApiResponse::ok("ok", vec![1]).with_pagination(PageRequest::new(1, 12).info(1)),
        )
        .unwrap();
        assert_eq!(json["pagination"]["currentPage"], 1);
        assert_eq!(json["pagination"]["pageSize"], 12);
        assert_eq!(json["pagination"]["totalItems"], 1);
    }
}

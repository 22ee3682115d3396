//! API models for request and response payloads

use resolution::models::{Category, ClassificationResult, Garment, Point};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Query parameters for garment listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GarmentQuery {
    /// Page number (1-based)
    pub page: Option<u32>,
    /// Number of items per page
    pub limit: Option<u32>,
    pub category: Option<String>,
    pub color: Option<String>,
    pub brand: Option<String>,
}

impl GarmentQuery {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    /// Category filter, parsed strictly; blank means no filter
    pub fn category(&self) -> Result<Option<Category>, ApiError> {
        parse_category(self.category.as_deref())
    }
}

/// Response for garment listing with pagination
#[derive(Debug, Clone, Serialize)]
pub struct GarmentListResponse {
    pub items: Vec<Garment>,
    pub page: u32,
    pub limit: u32,
    pub total: i64,
}

/// Body of a barcode scan
#[derive(Debug, Clone, Deserialize)]
pub struct BarcodeRequest {
    pub barcode: String,
}

/// Partial garment update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateGarmentRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub color: Option<String>,
    pub brand: Option<String>,
    pub size: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkDeleteRequest {
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkDeleteResponse {
    pub deleted: u64,
}

/// Result of photo analysis as returned to the client
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeResponse {
    pub garment: Garment,
    pub analysis: ClassificationResult,
    pub bounding_poly: Vec<Point>,
    pub background_removed: bool,
}

/// Strict category parse for client input
pub fn parse_category(raw: Option<&str>) -> Result<Option<Category>, ApiError> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => value
            .parse::<Category>()
            .map(Some)
            .map_err(ApiError::from),
        None => Ok(None),
    }
}

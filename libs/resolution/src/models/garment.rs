//! Garment model and the closed category set

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ResolutionError;

/// Garment category; every stored garment carries one of these
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Top,
    Bottom,
    Dress,
    Sneakers,
    Accessories,
    Backpack,
    #[default]
    Unknown,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Top,
        Category::Bottom,
        Category::Dress,
        Category::Sneakers,
        Category::Accessories,
        Category::Backpack,
        Category::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Top => "top",
            Category::Bottom => "bottom",
            Category::Dress => "dress",
            Category::Sneakers => "sneakers",
            Category::Accessories => "accessories",
            Category::Backpack => "backpack",
            Category::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict parse: only the canonical names are accepted, never free text
impl FromStr for Category {
    type Err = ResolutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| ResolutionError::Validation(format!("unknown garment category: {s}")))
    }
}

/// Canonical garment entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Garment {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub category: Category,
    pub color: String,
    pub labels: Vec<String>,
    pub brand: Option<String>,
    pub size: Option<String>,
    pub image_url: Option<String>,
    pub barcode: Option<String>,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Unsaved garment candidate with its identifier already assigned
#[derive(Debug, Clone, PartialEq)]
pub struct NewGarment {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub category: Category,
    pub color: String,
    pub labels: Vec<String>,
    pub brand: Option<String>,
    pub size: Option<String>,
    pub image_url: Option<String>,
    pub barcode: Option<String>,
    pub is_verified: bool,
}

impl NewGarment {
    /// Manual-entry candidate: unknown category and color, not verified
    pub fn new(owner_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            name: name.into(),
            category: Category::Unknown,
            color: "unknown".to_string(),
            labels: Vec::new(),
            brand: None,
            size: None,
            image_url: None,
            barcode: None,
            is_verified: false,
        }
    }
}

/// Product record returned by the barcode catalog
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProductRecord {
    pub barcode: String,
    pub title: String,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub color: Option<String>,
    pub size: Option<String>,
    pub images: Vec<String>,
}

//! Image analysis inputs and the classification derived from them

use serde::{Deserialize, Serialize};

use crate::color::{self, ColorName};
use crate::models::Category;

/// Free-text label with the analyzer's confidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub text: String,
    pub confidence: f32,
}

impl Label {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// 8-bit RGB triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Upper-case `#RRGGBB`
    pub fn hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Dominant color with its relative weight in `0..=1`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorCandidate {
    pub rgb: Rgb,
    pub weight: f32,
}

impl ColorCandidate {
    pub fn new(rgb: Rgb, weight: f32) -> Self {
        Self { rgb, weight }
    }
}

/// Vertex of an object outline, normalized to `0..=1` of the image size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// Raw output of the vision collaborator
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisionAnalysis {
    pub labels: Vec<Label>,
    pub colors: Vec<ColorCandidate>,
    /// Outline of the most prominent object; empty when none was found
    pub bounding_poly: Vec<Point>,
}

/// Per-image classification; never persisted directly
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub labels: Vec<Label>,
    pub category: Category,
    pub colors: Vec<ColorCandidate>,
}

impl ClassificationResult {
    /// Highest-weighted color; the earliest entry wins a tie
    pub fn representative(&self) -> Option<&ColorCandidate> {
        self.colors.iter().fold(None, |best, candidate| match best {
            Some(current) if current.weight >= candidate.weight => Some(current),
            _ => Some(candidate),
        })
    }

    pub fn color_name(&self) -> ColorName {
        self.representative()
            .map(|candidate| color::name_for(candidate.rgb))
            .unwrap_or(ColorName::Unknown)
    }

    pub fn label_texts(&self) -> Vec<String> {
        self.labels.iter().map(|label| label.text.clone()).collect()
    }
}

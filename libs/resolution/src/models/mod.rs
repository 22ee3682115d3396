//! Canonical entities and the ephemeral payloads they are derived from

pub mod classification;
pub mod garment;
pub mod user;

// Re-export for convenience
pub use classification::{ClassificationResult, ColorCandidate, Label, Point, Rgb, VisionAnalysis};
pub use garment::{Category, Garment, NewGarment, ProductRecord};
pub use user::{LinkedProviders, NewUser, ProviderKind, ProviderProfile, User};

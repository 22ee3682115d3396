//! Adapters for the external services garment ingestion depends on

pub mod background;
pub mod barcode;
pub mod storage;
pub mod vision;

pub use background::BackgroundRemovalClient;
pub use barcode::BarcodeLookupClient;
pub use storage::{S3Storage, StorageConfig};
pub use vision::{GoogleVision, VisionConfig};

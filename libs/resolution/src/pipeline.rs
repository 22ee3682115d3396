//! Garment ingestion pipeline
//!
//! Drives a photo or a barcode through the external collaborators into a
//! stored garment. Each collaborator call is bounded by its timeout. Only
//! background removal may fail softly; every other failure aborts the run.
//! Nothing is rolled back, so an upload followed by a failed insert leaves an
//! orphaned object behind.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::classifier::LabelClassifier;
use crate::error::{Collaborator, ResolutionError, ResolutionResult};
use crate::models::{ClassificationResult, Garment, NewGarment, Point};
use crate::normalizer::{Normalizer, normalize_classification};
use crate::ports::{
    BackgroundRemover, BarcodeCatalog, CollaboratorTimeouts, GarmentStore, ObjectStorage,
    VisionAnalyzer, bounded,
};
use crate::resolver::GarmentResolver;
use crate::taxonomy::Taxonomy;

const DEFAULT_FILENAME: &str = "garment.png";

/// External services the pipeline talks to
#[derive(Clone)]
pub struct Collaborators {
    pub vision: Arc<dyn VisionAnalyzer>,
    pub background: Arc<dyn BackgroundRemover>,
    pub storage: Arc<dyn ObjectStorage>,
    pub catalog: Arc<dyn BarcodeCatalog>,
    pub garments: Arc<dyn GarmentStore>,
}

/// Image bytes as received from the client
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub bytes: Vec<u8>,
    pub filename: Option<String>,
}

impl PhotoUpload {
    pub fn new(bytes: Vec<u8>, filename: Option<String>) -> Self {
        Self { bytes, filename }
    }
}

/// Result of analyzing a photo
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzedGarment {
    pub garment: Garment,
    pub analysis: ClassificationResult,
    /// Outline of the garment in the photo, as reported by vision analysis
    pub bounding_poly: Vec<Point>,
    /// False when background removal failed and the original was stored
    pub background_removed: bool,
}

#[derive(Clone)]
pub struct IngestionPipeline {
    collaborators: Collaborators,
    classifier: LabelClassifier,
    normalizer: Normalizer,
    resolver: GarmentResolver,
    timeouts: CollaboratorTimeouts,
}

impl IngestionPipeline {
    pub fn new(
        collaborators: Collaborators,
        vision_taxonomy: Arc<Taxonomy>,
        catalog_taxonomy: Arc<Taxonomy>,
        timeouts: CollaboratorTimeouts,
    ) -> Self {
        let resolver = GarmentResolver::new(collaborators.garments.clone());
        Self {
            collaborators,
            classifier: LabelClassifier::new(vision_taxonomy),
            normalizer: Normalizer::new(catalog_taxonomy),
            resolver,
            timeouts,
        }
    }

    /// Classify a photo, store it, and persist the resulting garment
    pub async fn analyze_photo(
        &self,
        owner_id: Uuid,
        upload: PhotoUpload,
    ) -> ResolutionResult<AnalyzedGarment> {
        if upload.bytes.is_empty() {
            return Err(ResolutionError::Validation("image is empty".to_string()));
        }

        let analysis = bounded(
            Collaborator::Vision,
            self.timeouts.vision,
            self.collaborators.vision.analyze(&upload.bytes),
        )
        .await?;
        let classification = self
            .classifier
            .classify_image(&analysis.labels, &analysis.colors);

        let stripped = bounded(
            Collaborator::BackgroundRemoval,
            self.timeouts.background_removal,
            self.collaborators.background.strip_background(&upload.bytes),
        )
        .await;
        let (image, background_removed) = match stripped {
            Ok(stripped) if !stripped.is_empty() => (stripped, true),
            Ok(_) => {
                warn!(%owner_id, "Background removal returned no bytes; keeping original image");
                (upload.bytes, false)
            }
            Err(e) => {
                warn!(%owner_id, "Background removal failed, keeping original image: {}", e);
                (upload.bytes, false)
            }
        };

        let key = storage_key(owner_id, upload.filename.as_deref(), Utc::now());
        let image_url = self.upload(image, &key).await?;

        let candidate = normalize_classification(&classification, owner_id, image_url);
        let garment = self.persist(candidate, &key).await?;

        Ok(AnalyzedGarment {
            garment,
            analysis: classification,
            bounding_poly: analysis.bounding_poly,
            background_removed,
        })
    }

    /// Look a barcode up in the product catalog and persist the product
    pub async fn scan_barcode(&self, owner_id: Uuid, barcode: &str) -> ResolutionResult<Garment> {
        let barcode = validate_barcode(barcode)?;

        let record = bounded(
            Collaborator::BarcodeCatalog,
            self.timeouts.barcode_catalog,
            self.collaborators.catalog.lookup(barcode),
        )
        .await?;

        let mut candidate = self.normalizer.normalize_product(record, owner_id);
        // the catalog may echo a reformatted code; keep what was scanned
        candidate.barcode = Some(barcode.to_string());

        self.resolver.resolve_garment(candidate).await
    }

    /// Persist a manually entered garment, optionally with a photo
    ///
    /// Manual entries are never verified, whatever the candidate says.
    pub async fn add_manual(
        &self,
        owner_id: Uuid,
        mut candidate: NewGarment,
        photo: Option<PhotoUpload>,
    ) -> ResolutionResult<Garment> {
        if candidate.name.trim().is_empty() {
            return Err(ResolutionError::Validation("garment name is required".to_string()));
        }
        if let Some(barcode) = candidate.barcode.take() {
            candidate.barcode = Some(validate_barcode(&barcode)?.to_string());
        }

        candidate.owner_id = owner_id;
        candidate.is_verified = false;

        match photo {
            Some(photo) => {
                if photo.bytes.is_empty() {
                    return Err(ResolutionError::Validation("image is empty".to_string()));
                }
                let key = storage_key(owner_id, photo.filename.as_deref(), Utc::now());
                candidate.image_url = Some(self.upload(photo.bytes, &key).await?);
                self.persist(candidate, &key).await
            }
            None => self.resolver.resolve_garment(candidate).await,
        }
    }

    /// Upload a replacement image and return its URL
    pub async fn store_image(&self, owner_id: Uuid, upload: PhotoUpload) -> ResolutionResult<String> {
        if upload.bytes.is_empty() {
            return Err(ResolutionError::Validation("image is empty".to_string()));
        }
        let key = storage_key(owner_id, upload.filename.as_deref(), Utc::now());
        self.upload(upload.bytes, &key).await
    }

    async fn upload(&self, bytes: Vec<u8>, key: &str) -> ResolutionResult<String> {
        let content_type = sniff_content_type(&bytes);
        let url = bounded(
            Collaborator::ObjectStorage,
            self.timeouts.object_storage,
            self.collaborators.storage.put(bytes, key, content_type),
        )
        .await?;

        info!(key, content_type, "Uploaded garment image");
        Ok(url)
    }

    async fn persist(&self, candidate: NewGarment, key: &str) -> ResolutionResult<Garment> {
        self.resolver.resolve_garment(candidate).await.map_err(|e| {
            warn!(key, "Garment insert failed after upload; stored object is orphaned: {}", e);
            e
        })
    }
}

/// Trimmed barcode if it is 6 to 14 ASCII digits
pub fn validate_barcode(barcode: &str) -> ResolutionResult<&str> {
    let barcode = barcode.trim();
    if (6..=14).contains(&barcode.len()) && barcode.bytes().all(|b| b.is_ascii_digit()) {
        Ok(barcode)
    } else {
        Err(ResolutionError::Validation(format!(
            "barcode must be 6 to 14 digits, got {barcode:?}"
        )))
    }
}

/// Object key for an uploaded garment image
///
/// `garments/users/<owner>/<unix-millis>-<file name>`, where the file name is
/// reduced to its last path segment and to `[A-Za-z0-9._-]`.
pub fn storage_key(owner_id: Uuid, filename: Option<&str>, now: DateTime<Utc>) -> String {
    let filename = filename
        .map(sanitize_filename)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string());

    format!(
        "garments/users/{}/{}-{}",
        owner_id,
        now.timestamp_millis(),
        filename
    )
}

fn sanitize_filename(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.chars().all(|c| c == '_') {
        String::new()
    } else {
        cleaned.to_string()
    }
}

/// Content type from the leading magic bytes
pub fn sniff_content_type(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        "image/png"
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else {
        "application/octet-stream"
    }
}

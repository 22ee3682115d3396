//! Photo and barcode ingestion against fake collaborators

mod common;

use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use common::{
    BackgroundBehavior, FakeBackground, FakeCatalog, FakeStorage, FakeVision, InMemoryGarmentStore,
};
use resolution::error::{Collaborator, ProviderError, ResolutionError, StoreError};
use resolution::models::{
    Category, ColorCandidate, Label, NewGarment, Point, ProductRecord, Rgb, VisionAnalysis,
};
use resolution::pipeline::{Collaborators, IngestionPipeline, PhotoUpload};
use resolution::ports::CollaboratorTimeouts;
use resolution::taxonomy::Taxonomy;

const PNG: &[u8] = b"\x89PNG\r\n\x1a\noriginal-pixels";
const STRIPPED: &[u8] = b"\x89PNG\r\n\x1a\nstripped-pixels";

struct Harness {
    pipeline: IngestionPipeline,
    storage: Arc<FakeStorage>,
    garments: Arc<InMemoryGarmentStore>,
}

fn harness(vision: FakeVision, background: BackgroundBehavior, catalog: FakeCatalog) -> Harness {
    let storage = Arc::new(FakeStorage::default());
    let garments = Arc::new(InMemoryGarmentStore::default());

    let collaborators = Collaborators {
        vision: Arc::new(vision),
        background: Arc::new(FakeBackground {
            behavior: background,
        }),
        storage: storage.clone(),
        catalog: Arc::new(catalog),
        garments: garments.clone(),
    };

    let timeouts = CollaboratorTimeouts {
        background_removal: Duration::from_secs(2),
        ..CollaboratorTimeouts::default()
    };

    Harness {
        pipeline: IngestionPipeline::new(
            collaborators,
            Arc::new(Taxonomy::vision()),
            Arc::new(Taxonomy::catalog()),
            timeouts,
        ),
        storage,
        garments,
    }
}

fn jacket_analysis() -> VisionAnalysis {
    VisionAnalysis {
        labels: vec![Label::new("denim jacket", 0.9), Label::new("backpack", 0.95)],
        colors: vec![
            ColorCandidate::new(Rgb::new(0, 0, 200), 0.6),
            ColorCandidate::new(Rgb::new(255, 255, 255), 0.2),
        ],
        bounding_poly: vec![
            Point { x: 0.1, y: 0.2 },
            Point { x: 0.9, y: 0.2 },
            Point { x: 0.9, y: 0.95 },
            Point { x: 0.1, y: 0.95 },
        ],
    }
}

fn levis() -> ProductRecord {
    ProductRecord {
        barcode: "0123456789012".to_string(),
        title: "Levi's 501 Original Jeans".to_string(),
        brand: Some("Levi's".to_string()),
        category: Some("Apparel & Accessories > Clothing > Pants".to_string()),
        color: Some("Dark Stonewash".to_string()),
        size: Some("32x32".to_string()),
        images: vec!["https://images.example/501.jpg".to_string()],
    }
}

fn photo() -> PhotoUpload {
    PhotoUpload::new(PNG.to_vec(), Some("jacket.png".to_string()))
}

#[tokio::test]
async fn photo_becomes_a_verified_classified_garment() {
    let h = harness(
        FakeVision::returning(jacket_analysis()),
        BackgroundBehavior::Strip(STRIPPED.to_vec()),
        FakeCatalog::default(),
    );
    let owner = Uuid::new_v4();

    let analyzed = h.pipeline.analyze_photo(owner, photo()).await.unwrap();

    assert!(analyzed.background_removed);
    assert_eq!(analyzed.bounding_poly.len(), 4);
    assert_eq!(analyzed.bounding_poly[2], Point { x: 0.9, y: 0.95 });
    assert_eq!(analyzed.analysis.category, Category::Top);
    assert_eq!(analyzed.garment.category, Category::Top);
    assert_eq!(analyzed.garment.name, "blue top");
    assert_eq!(analyzed.garment.color, "blue");
    assert_eq!(analyzed.garment.labels, vec!["denim jacket", "backpack"]);
    assert!(analyzed.garment.is_verified);
    assert_eq!(analyzed.garment.owner_id, owner);

    let objects = h.storage.objects();
    assert_eq!(objects.len(), 1);
    let (key, bytes, content_type) = &objects[0];
    assert!(key.starts_with(&format!("garments/users/{owner}/")));
    assert!(key.ends_with("-jacket.png"));
    assert_eq!(bytes.as_slice(), STRIPPED);
    assert_eq!(content_type, "image/png");
    assert_eq!(
        analyzed.garment.image_url,
        Some(format!("https://storage.test/{key}"))
    );
}

#[tokio::test]
async fn background_removal_failure_uploads_the_original_bytes() {
    let h = harness(
        FakeVision::returning(jacket_analysis()),
        BackgroundBehavior::Fail,
        FakeCatalog::default(),
    );

    let analyzed = h.pipeline.analyze_photo(Uuid::new_v4(), photo()).await.unwrap();

    assert!(!analyzed.background_removed);
    let objects = h.storage.objects();
    assert_eq!(objects[0].1.as_slice(), PNG);
    assert_eq!(
        analyzed.garment.image_url,
        Some(format!("https://storage.test/{}", objects[0].0))
    );
}

#[tokio::test(start_paused = true)]
async fn background_removal_timeout_also_falls_back() {
    let h = harness(
        FakeVision::returning(jacket_analysis()),
        BackgroundBehavior::Hang,
        FakeCatalog::default(),
    );

    let analyzed = h.pipeline.analyze_photo(Uuid::new_v4(), photo()).await.unwrap();

    assert!(!analyzed.background_removed);
    assert_eq!(h.storage.objects()[0].1.as_slice(), PNG);
}

#[tokio::test]
async fn vision_failure_aborts_before_any_upload() {
    let h = harness(
        FakeVision::failing(ProviderError::upstream(Collaborator::Vision, "quota exceeded")),
        BackgroundBehavior::Strip(STRIPPED.to_vec()),
        FakeCatalog::default(),
    );

    let err = h
        .pipeline
        .analyze_photo(Uuid::new_v4(), photo())
        .await
        .unwrap_err();

    match err {
        ResolutionError::Provider(provider) => {
            assert_eq!(provider.collaborator(), Collaborator::Vision)
        }
        other => panic!("expected provider error, got {other:?}"),
    }
    assert!(h.storage.objects().is_empty());
    assert!(h.garments.all().is_empty());
}

#[tokio::test]
async fn empty_image_is_a_validation_error() {
    let h = harness(
        FakeVision::returning(jacket_analysis()),
        BackgroundBehavior::Fail,
        FakeCatalog::default(),
    );

    let err = h
        .pipeline
        .analyze_photo(Uuid::new_v4(), PhotoUpload::new(Vec::new(), None))
        .await
        .unwrap_err();
    assert!(matches!(err, ResolutionError::Validation(_)));
}

#[tokio::test]
async fn failed_insert_leaves_the_upload_in_place() {
    let h = harness(
        FakeVision::returning(jacket_analysis()),
        BackgroundBehavior::Strip(STRIPPED.to_vec()),
        FakeCatalog::default(),
    );
    h.garments
        .fail_next_with(StoreError::Backend("connection reset".to_string()));

    let err = h
        .pipeline
        .analyze_photo(Uuid::new_v4(), photo())
        .await
        .unwrap_err();

    assert!(matches!(err, ResolutionError::Persistence(_)));
    assert_eq!(h.storage.objects().len(), 1);
}

#[tokio::test]
async fn unrecognized_labels_yield_unknown_category() {
    let analysis = VisionAnalysis {
        labels: vec![Label::new("Font", 0.8)],
        ..Default::default()
    };
    let h = harness(
        FakeVision::returning(analysis),
        BackgroundBehavior::Strip(STRIPPED.to_vec()),
        FakeCatalog::default(),
    );

    let analyzed = h.pipeline.analyze_photo(Uuid::new_v4(), photo()).await.unwrap();
    assert_eq!(analyzed.garment.category, Category::Unknown);
    assert_eq!(analyzed.garment.name, "unknown unknown");
}

#[tokio::test]
async fn barcode_scan_stores_a_verified_catalog_product() {
    let h = harness(
        FakeVision::returning(VisionAnalysis::default()),
        BackgroundBehavior::Fail,
        FakeCatalog {
            products: vec![levis()],
        },
    );
    let owner = Uuid::new_v4();

    let garment = h.pipeline.scan_barcode(owner, " 0123456789012 ").await.unwrap();

    assert!(garment.is_verified);
    assert_eq!(garment.category, Category::Bottom);
    assert_eq!(garment.name, "Levi's 501 Original Jeans");
    assert_eq!(garment.brand.as_deref(), Some("Levi's"));
    assert_eq!(garment.size.as_deref(), Some("32x32"));
    assert_eq!(garment.color, "Dark Stonewash");
    assert_eq!(garment.barcode.as_deref(), Some("0123456789012"));
    assert_eq!(garment.image_url.as_deref(), Some("https://images.example/501.jpg"));
    assert_eq!(garment.owner_id, owner);
}

#[tokio::test]
async fn scanning_the_same_barcode_twice_conflicts() {
    let h = harness(
        FakeVision::returning(VisionAnalysis::default()),
        BackgroundBehavior::Fail,
        FakeCatalog {
            products: vec![levis()],
        },
    );
    let owner = Uuid::new_v4();

    h.pipeline.scan_barcode(owner, "0123456789012").await.unwrap();
    let err = h
        .pipeline
        .scan_barcode(owner, "0123456789012")
        .await
        .unwrap_err();

    assert!(matches!(err, ResolutionError::Conflict(_)));
    assert_eq!(h.garments.all().len(), 1);
}

#[tokio::test]
async fn unknown_or_malformed_barcodes_abort() {
    let h = harness(
        FakeVision::returning(VisionAnalysis::default()),
        BackgroundBehavior::Fail,
        FakeCatalog::default(),
    );

    let missing = h
        .pipeline
        .scan_barcode(Uuid::new_v4(), "9999999999999")
        .await
        .unwrap_err();
    assert!(matches!(
        missing,
        ResolutionError::Provider(ProviderError::NotFound { .. })
    ));

    let malformed = h
        .pipeline
        .scan_barcode(Uuid::new_v4(), "abc")
        .await
        .unwrap_err();
    assert!(matches!(malformed, ResolutionError::Validation(_)));
    assert!(h.garments.all().is_empty());
}

#[tokio::test]
async fn manual_garments_are_never_verified() {
    let h = harness(
        FakeVision::returning(VisionAnalysis::default()),
        BackgroundBehavior::Fail,
        FakeCatalog::default(),
    );
    let owner = Uuid::new_v4();

    let mut candidate = NewGarment::new(Uuid::nil(), "Grey hoodie");
    candidate.is_verified = true;
    let garment = h.pipeline.add_manual(owner, candidate, None).await.unwrap();

    assert!(!garment.is_verified);
    assert_eq!(garment.owner_id, owner);
    assert!(garment.image_url.is_none());

    let with_photo = h
        .pipeline
        .add_manual(owner, NewGarment::new(owner, "Scarf"), Some(photo()))
        .await
        .unwrap();
    assert!(!with_photo.is_verified);
    assert!(with_photo.image_url.is_some());
    assert_eq!(h.storage.objects().len(), 1);
}

#[tokio::test]
async fn manual_garment_needs_a_name() {
    let h = harness(
        FakeVision::returning(VisionAnalysis::default()),
        BackgroundBehavior::Fail,
        FakeCatalog::default(),
    );

    let err = h
        .pipeline
        .add_manual(Uuid::new_v4(), NewGarment::new(Uuid::nil(), "  "), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ResolutionError::Validation(_)));
}

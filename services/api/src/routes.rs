//! API service routes

use std::collections::HashMap;

use axum::{
    Extension, Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use resolution::{
    PhotoUpload,
    models::{Category, NewGarment},
};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    middleware::{AuthUser, auth_middleware},
    models::{
        AnalyzeResponse, BarcodeRequest, BulkDeleteRequest, BulkDeleteResponse,
        GarmentListResponse, GarmentQuery, UpdateGarmentRequest, parse_category,
    },
    repositories::{GarmentChanges, GarmentFilter},
    state::AppState,
};

/// Uploads are phone photos; anything above this is rejected before parsing
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

const ANALYZE_IMAGE_FIELD: &str = "image";
const GARMENT_IMAGE_FIELD: &str = "garment_image";

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/garments", post(add_garment).get(list_garments))
        .route("/garments/analyze", post(analyze_garment))
        .route("/garments/barcode", post(scan_barcode))
        .route("/garments/barcode/:barcode", get(find_by_barcode))
        .route("/garments/bulk-delete", post(bulk_delete))
        .route(
            "/garments/:id",
            get(get_garment).patch(update_garment).delete(delete_garment),
        )
        .route("/garments/:id/image", put(replace_image))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "api-service"
    }))
}

/// Classify a photo and store it as a new garment
pub async fn analyze_garment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let form = read_form(multipart, ANALYZE_IMAGE_FIELD).await?;
    let image = form
        .image
        .ok_or_else(|| ApiError::BadRequest("No image provided".to_string()))?;

    let analyzed = state.pipeline.analyze_photo(user.id, image).await?;
    info!(
        garment_id = %analyzed.garment.id,
        category = %analyzed.garment.category,
        background_removed = analyzed.background_removed,
        "Garment created from photo"
    );

    let response = AnalyzeResponse {
        garment: analyzed.garment,
        analysis: analyzed.analysis,
        bounding_poly: analyzed.bounding_poly,
        background_removed: analyzed.background_removed,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// Look a barcode up in the product catalog and store the product
pub async fn scan_barcode(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<BarcodeRequest>,
) -> ApiResult<impl IntoResponse> {
    let garment = state.pipeline.scan_barcode(user.id, &payload.barcode).await?;
    info!(garment_id = %garment.id, "Garment created from barcode");
    Ok((StatusCode::CREATED, Json(garment)))
}

/// Manually add a garment, optionally with a photo
pub async fn add_garment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let mut form = read_form(multipart, GARMENT_IMAGE_FIELD).await?;

    let name = form.take("name").unwrap_or_default();
    let mut candidate = NewGarment::new(user.id, name);
    candidate.category = parse_category(form.fields.get("category").map(String::as_str))?
        .unwrap_or(Category::Unknown);
    if let Some(color) = form.take("color") {
        candidate.color = color;
    }
    candidate.brand = form.take("brand");
    candidate.size = form.take("size");
    candidate.barcode = form.take("barcode");

    let garment = state
        .pipeline
        .add_manual(user.id, candidate, form.image)
        .await?;

    Ok((StatusCode::CREATED, Json(garment)))
}

/// Get a garment by ID
pub async fn get_garment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let garment = state
        .garments
        .get(user.id, id)
        .await?
        .ok_or_else(ApiError::garment_not_found)?;

    Ok(Json(garment))
}

pub async fn find_by_barcode(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(barcode): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let garment = state
        .garments
        .find_by_barcode(user.id, barcode.trim())
        .await?
        .ok_or_else(ApiError::garment_not_found)?;

    Ok(Json(garment))
}

/// List garments with pagination and filtering
pub async fn list_garments(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<GarmentQuery>,
) -> ApiResult<impl IntoResponse> {
    let filter = GarmentFilter {
        category: query.category()?,
        color: non_blank(query.color.clone()),
        brand: non_blank(query.brand.clone()),
    };
    let page = query.page();
    let limit = query.limit();

    let (items, total) = state.garments.filter(user.id, &filter, page, limit).await?;

    Ok(Json(GarmentListResponse {
        items,
        page,
        limit,
        total,
    }))
}

/// Partially update a garment
pub async fn update_garment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateGarmentRequest>,
) -> ApiResult<impl IntoResponse> {
    let changes = GarmentChanges {
        category: parse_category(payload.category.as_deref())?,
        name: non_blank(payload.name),
        color: non_blank(payload.color),
        brand: non_blank(payload.brand),
        size: non_blank(payload.size),
    };
    if changes.is_empty() {
        return Err(ApiError::BadRequest("No changes provided".to_string()));
    }

    let garment = state
        .garments
        .update(user.id, id, &changes)
        .await?
        .ok_or_else(ApiError::garment_not_found)?;

    Ok(Json(garment))
}

/// Upload a new image for an existing garment
pub async fn replace_image(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let form = read_form(multipart, GARMENT_IMAGE_FIELD).await?;
    let image = form
        .image
        .ok_or_else(|| ApiError::BadRequest("No image provided".to_string()))?;

    // avoid uploading for a garment that is not there
    if state.garments.get(user.id, id).await?.is_none() {
        return Err(ApiError::garment_not_found());
    }

    let image_url = state.pipeline.store_image(user.id, image).await?;
    let garment = state
        .garments
        .update_image(user.id, id, &image_url)
        .await?
        .ok_or_else(ApiError::garment_not_found)?;

    Ok(Json(garment))
}

pub async fn delete_garment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    if !state.garments.delete(user.id, id).await? {
        return Err(ApiError::garment_not_found());
    }

    Ok(Json(json!({"message": "Garment deleted"})))
}

pub async fn bulk_delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<BulkDeleteRequest>,
) -> ApiResult<impl IntoResponse> {
    let deleted = state.garments.delete_many(user.id, &payload.ids).await?;
    Ok(Json(BulkDeleteResponse { deleted }))
}

/// Text fields plus the image part of a multipart form
#[derive(Debug, Default)]
struct GarmentForm {
    fields: HashMap<String, String>,
    image: Option<PhotoUpload>,
}

impl GarmentForm {
    fn take(&mut self, name: &str) -> Option<String> {
        non_blank(self.fields.remove(name))
    }
}

async fn read_form(mut multipart: Multipart, image_field: &str) -> ApiResult<GarmentForm> {
    let mut form = GarmentForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if name == image_field {
            let filename = field.file_name().map(str::to_string);
            let bytes = field.bytes().await?;
            form.image = Some(PhotoUpload::new(bytes.to_vec(), filename));
        } else {
            let value = field.text().await?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

//! Google Cloud Vision label, color and object detection over the REST API

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{info, warn};

use resolution::error::{Collaborator, ProviderError};
use resolution::models::{ColorCandidate, Label, Point, Rgb, VisionAnalysis};
use resolution::ports::VisionAnalyzer;

const VISION_ANNOTATE_URL: &str = "https://vision.googleapis.com/v1/images:annotate";
const MAX_LABELS: u32 = 10;
const MAX_COLORS: u32 = 10;
const MAX_OBJECTS: u32 = 5;

#[derive(Debug, Clone)]
pub struct VisionConfig {
    pub api_key: Option<String>,
    pub endpoint: String,
}

impl VisionConfig {
    /// Create a new VisionConfig from environment variables
    ///
    /// # Environment Variables
    /// - `GOOGLE_VISION_API_KEY`: API key; analysis fails upstream without it
    /// - `GOOGLE_VISION_URL` (default: the public annotate endpoint)
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("GOOGLE_VISION_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            endpoint: std::env::var("GOOGLE_VISION_URL")
                .unwrap_or_else(|_| VISION_ANNOTATE_URL.to_string()),
        }
    }
}

pub struct GoogleVision {
    http: reqwest::Client,
    config: VisionConfig,
}

impl GoogleVision {
    pub fn new(config: VisionConfig, timeout: Duration) -> anyhow::Result<Self> {
        if config.api_key.is_none() {
            warn!("GOOGLE_VISION_API_KEY not set; photo analysis will fail");
        }
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl VisionAnalyzer for GoogleVision {
    async fn analyze(&self, image: &[u8]) -> Result<VisionAnalysis, ProviderError> {
        let api_key = self.config.api_key.as_deref().ok_or_else(|| {
            ProviderError::upstream(Collaborator::Vision, "GOOGLE_VISION_API_KEY is not configured")
        })?;

        let body = json!({
            "requests": [{
                "image": { "content": STANDARD.encode(image) },
                "features": [
                    { "type": "LABEL_DETECTION", "maxResults": MAX_LABELS },
                    { "type": "IMAGE_PROPERTIES", "maxResults": MAX_COLORS },
                    { "type": "OBJECT_LOCALIZATION", "maxResults": MAX_OBJECTS },
                ],
            }],
        });

        let response = self
            .http
            .post(&self.config.endpoint)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::upstream(Collaborator::Vision, e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::upstream(Collaborator::Vision, e))?;

        if !status.is_success() {
            return Err(ProviderError::upstream(
                Collaborator::Vision,
                format!("annotate request failed: {status}"),
            ));
        }

        let analysis = parse_annotation(&text)?;
        info!(
            labels = analysis.labels.len(),
            colors = analysis.colors.len(),
            outlined = !analysis.bounding_poly.is_empty(),
            "Vision analysis complete"
        );
        Ok(analysis)
    }
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<ImageAnnotation>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageAnnotation {
    #[serde(default)]
    label_annotations: Vec<LabelAnnotation>,
    image_properties_annotation: Option<ImageProperties>,
    #[serde(default)]
    localized_object_annotations: Vec<LocalizedObject>,
    error: Option<AnnotationError>,
}

/// Objects arrive sorted by score, best first
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocalizedObject {
    #[serde(default)]
    bounding_poly: BoundingPoly,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BoundingPoly {
    #[serde(default)]
    normalized_vertices: Vec<NormalizedVertex>,
}

/// Coordinates are omitted from the JSON when zero
#[derive(Debug, Deserialize)]
struct NormalizedVertex {
    #[serde(default)]
    x: f32,
    #[serde(default)]
    y: f32,
}

#[derive(Debug, Deserialize)]
struct LabelAnnotation {
    description: String,
    #[serde(default)]
    score: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageProperties {
    dominant_colors: Option<DominantColors>,
}

#[derive(Debug, Deserialize)]
struct DominantColors {
    #[serde(default)]
    colors: Vec<ColorInfo>,
}

#[derive(Debug, Deserialize)]
struct ColorInfo {
    color: ColorValue,
    #[serde(default)]
    score: f32,
}

/// Channels are omitted from the JSON when zero
#[derive(Debug, Deserialize)]
struct ColorValue {
    #[serde(default)]
    red: f32,
    #[serde(default)]
    green: f32,
    #[serde(default)]
    blue: f32,
}

#[derive(Debug, Deserialize)]
struct AnnotationError {
    message: String,
}

/// Decode an `images:annotate` response body
pub fn parse_annotation(body: &str) -> Result<VisionAnalysis, ProviderError> {
    let response: AnnotateResponse = serde_json::from_str(body).map_err(|e| {
        ProviderError::upstream(Collaborator::Vision, format!("malformed annotate response: {e}"))
    })?;

    let annotation = response.responses.into_iter().next().unwrap_or_default();
    if let Some(error) = annotation.error {
        return Err(ProviderError::upstream(Collaborator::Vision, error.message));
    }

    let labels = annotation
        .label_annotations
        .into_iter()
        .map(|label| Label::new(label.description, label.score))
        .collect();

    let colors = annotation
        .image_properties_annotation
        .and_then(|properties| properties.dominant_colors)
        .map(|dominant| {
            dominant
                .colors
                .into_iter()
                .map(|info| ColorCandidate::new(to_rgb(&info.color), info.score))
                .collect()
        })
        .unwrap_or_default();

    let bounding_poly = annotation
        .localized_object_annotations
        .into_iter()
        .next()
        .map(|object| {
            object
                .bounding_poly
                .normalized_vertices
                .into_iter()
                .map(|vertex| Point {
                    x: vertex.x,
                    y: vertex.y,
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(VisionAnalysis {
        labels,
        colors,
        bounding_poly,
    })
}

fn to_rgb(color: &ColorValue) -> Rgb {
    let channel = |value: f32| value.round().clamp(0.0, 255.0) as u8;
    Rgb::new(channel(color.red), channel(color.green), channel(color.blue))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &str = r#"{
        "responses": [{
            "labelAnnotations": [
                {"mid": "/m/01n4qj", "description": "Denim jacket", "score": 0.93},
                {"mid": "/m/09j2d", "description": "Clothing", "score": 0.91}
            ],
            "imagePropertiesAnnotation": {
                "dominantColors": {
                    "colors": [
                        {"color": {"red": 30, "green": 60, "blue": 120}, "score": 0.6, "pixelFraction": 0.4},
                        {"color": {"green": 255}, "score": 0.1, "pixelFraction": 0.05}
                    ]
                }
            }
        }]
    }"#;

    #[test]
    fn parses_labels_and_colors() {
        let analysis = parse_annotation(RESPONSE).unwrap();

        assert_eq!(analysis.labels.len(), 2);
        assert_eq!(analysis.labels[0].text, "Denim jacket");
        assert!((analysis.labels[0].confidence - 0.93).abs() < f32::EPSILON);

        assert_eq!(analysis.colors[0].rgb, Rgb::new(30, 60, 120));
        assert_eq!(analysis.colors[1].rgb, Rgb::new(0, 255, 0));
        assert!(analysis.bounding_poly.is_empty());
    }

    #[test]
    fn outline_comes_from_the_best_localized_object() {
        let body = r#"{
            "responses": [{
                "localizedObjectAnnotations": [
                    {
                        "name": "Jacket",
                        "score": 0.88,
                        "boundingPoly": {"normalizedVertices": [
                            {"x": 0.12, "y": 0.05}, {"x": 0.87, "y": 0.05},
                            {"x": 0.87, "y": 0.97}, {"y": 0.97}
                        ]}
                    },
                    {
                        "name": "Person",
                        "score": 0.61,
                        "boundingPoly": {"normalizedVertices": [{"x": 0.5, "y": 0.5}]}
                    }
                ]
            }]
        }"#;

        let analysis = parse_annotation(body).unwrap();
        assert_eq!(analysis.bounding_poly.len(), 4);
        assert_eq!(analysis.bounding_poly[0], Point { x: 0.12, y: 0.05 });
        assert_eq!(analysis.bounding_poly[3], Point { x: 0.0, y: 0.97 });
    }

    #[test]
    fn empty_response_is_an_empty_analysis() {
        let analysis = parse_annotation(r#"{"responses": [{}]}"#).unwrap();
        assert!(analysis.labels.is_empty());
        assert!(analysis.colors.is_empty());
    }

    #[test]
    fn per_image_errors_are_upstream_failures() {
        let err = parse_annotation(
            r#"{"responses": [{"error": {"code": 3, "message": "Bad image data."}}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ProviderError::Upstream { .. }));
        assert_eq!(err.to_string(), "vision analysis failed: Bad image data.");
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_annotation("<html>").is_err());
    }
}

//! Client for the background removal HTTP service

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use tracing::{debug, info};

use resolution::error::{Collaborator, ProviderError};
use resolution::pipeline::sniff_content_type;
use resolution::ports::BackgroundRemover;

const DEFAULT_BACKGROUND_REMOVAL_URL: &str =
    "http://background-removal-service:8000/remove-background";

/// The service reads the image from this multipart field
const FILE_FIELD: &str = "file";

/// File name matching the sniffed image type
fn file_name_for(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => "garment.png",
        "image/jpeg" => "garment.jpg",
        "image/webp" => "garment.webp",
        _ => "garment.bin",
    }
}

pub struct BackgroundRemovalClient {
    http: reqwest::Client,
    url: String,
}

impl BackgroundRemovalClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }

    /// Reads `BACKGROUND_REMOVAL_URL`
    pub fn from_env(timeout: Duration) -> anyhow::Result<Self> {
        let url = std::env::var("BACKGROUND_REMOVAL_URL")
            .unwrap_or_else(|_| DEFAULT_BACKGROUND_REMOVAL_URL.to_string());
        info!("Background removal service at {}", url);
        Self::new(url, timeout)
    }
}

#[async_trait]
impl BackgroundRemover for BackgroundRemovalClient {
    async fn strip_background(&self, image: &[u8]) -> Result<Vec<u8>, ProviderError> {
        let content_type = sniff_content_type(image);
        let part = Part::bytes(image.to_vec())
            .file_name(file_name_for(content_type))
            .mime_str(content_type)
            .map_err(|e| ProviderError::upstream(Collaborator::BackgroundRemoval, e))?;
        let form = Form::new().part(FILE_FIELD, part);

        let response = self
            .http
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ProviderError::upstream(Collaborator::BackgroundRemoval, e))?;

        if !response.status().is_success() {
            return Err(ProviderError::upstream(
                Collaborator::BackgroundRemoval,
                format!("service answered {}", response.status()),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::upstream(Collaborator::BackgroundRemoval, e))?;

        debug!(input = image.len(), output = bytes.len(), "Background removed");
        Ok(bytes.to_vec())
    }
}

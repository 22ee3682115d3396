//! Barcode Lookup product catalog client

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

use resolution::error::{Collaborator, ProviderError};
use resolution::models::ProductRecord;
use resolution::ports::BarcodeCatalog;

const BARCODE_LOOKUP_URL: &str = "https://api.barcodelookup.com/v3/products";

pub struct BarcodeLookupClient {
    http: reqwest::Client,
    api_key: Option<String>,
    url: String,
}

impl BarcodeLookupClient {
    pub fn new(api_key: Option<String>, url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_key,
            url: url.into(),
        })
    }

    /// Reads `BARCODELOOKUP_API_KEY` and optionally `BARCODELOOKUP_URL`
    pub fn from_env(timeout: Duration) -> anyhow::Result<Self> {
        let api_key = std::env::var("BARCODELOOKUP_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());
        if api_key.is_none() {
            warn!("BARCODELOOKUP_API_KEY not set; barcode scans will fail");
        }
        let url = std::env::var("BARCODELOOKUP_URL").unwrap_or_else(|_| BARCODE_LOOKUP_URL.to_string());
        Self::new(api_key, url, timeout)
    }
}

#[async_trait]
impl BarcodeCatalog for BarcodeLookupClient {
    async fn lookup(&self, barcode: &str) -> Result<ProductRecord, ProviderError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ProviderError::upstream(
                Collaborator::BarcodeCatalog,
                "BARCODELOOKUP_API_KEY is not configured",
            )
        })?;

        info!("Looking up barcode {}", barcode);

        let response = self
            .http
            .get(&self.url)
            .query(&[("barcode", barcode), ("key", api_key)])
            .send()
            .await
            .map_err(|e| ProviderError::upstream(Collaborator::BarcodeCatalog, e))?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                return Err(ProviderError::not_found(Collaborator::BarcodeCatalog, barcode));
            }
            status if !status.is_success() => {
                return Err(ProviderError::upstream(
                    Collaborator::BarcodeCatalog,
                    format!("lookup failed: {status}"),
                ));
            }
            _ => {}
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::upstream(Collaborator::BarcodeCatalog, e))?;

        parse_products(barcode, &body)
    }
}

#[derive(Debug, Deserialize)]
struct ProductsResponse {
    #[serde(default)]
    products: Vec<Product>,
}

#[derive(Debug, Deserialize)]
struct Product {
    #[serde(default)]
    barcode_number: Option<String>,
    #[serde(default)]
    title: String,
    brand: Option<String>,
    category: Option<String>,
    color: Option<String>,
    size: Option<String>,
    #[serde(default)]
    images: Vec<String>,
}

/// Decode a products response; the first product wins
pub fn parse_products(barcode: &str, body: &str) -> Result<ProductRecord, ProviderError> {
    let response: ProductsResponse = serde_json::from_str(body).map_err(|e| {
        ProviderError::upstream(
            Collaborator::BarcodeCatalog,
            format!("malformed products response: {e}"),
        )
    })?;

    let product = response
        .products
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::not_found(Collaborator::BarcodeCatalog, barcode))?;

    Ok(ProductRecord {
        barcode: non_blank(product.barcode_number).unwrap_or_else(|| barcode.to_string()),
        title: product.title.trim().to_string(),
        brand: non_blank(product.brand),
        category: non_blank(product.category),
        color: non_blank(product.color),
        size: non_blank(product.size),
        images: product.images,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

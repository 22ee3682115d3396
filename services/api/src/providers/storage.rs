//! S3 object storage for garment images

use async_trait::async_trait;
use aws_sdk_s3::{Client, error::DisplayErrorContext, primitives::ByteStream};
use tracing::{error, info};

use resolution::error::{Collaborator, ProviderError};
use resolution::ports::ObjectStorage;

#[derive(Debug, Clone, PartialEq)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: String,
}

impl StorageConfig {
    /// Create a new StorageConfig from environment variables
    ///
    /// # Environment Variables
    /// - `AWS_BUCKET_NAME` (default: wardrobe-garments)
    /// - `AWS_REGION` (default: us-east-1)
    pub fn from_env() -> Self {
        Self {
            bucket: std::env::var("AWS_BUCKET_NAME")
                .unwrap_or_else(|_| "wardrobe-garments".to_string()),
            region: std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
        }
    }

    /// Virtual-hosted style URL of an object
    pub fn object_url(&self, key: &str) -> String {
        format!(
            "https://{}.s3.{}.amazonaws.com/{}",
            self.bucket, self.region, key
        )
    }
}

#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    config: StorageConfig,
}

impl S3Storage {
    pub fn new(client: Client, config: StorageConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn put(
        &self,
        bytes: Vec<u8>,
        key: &str,
        content_type: &str,
    ) -> Result<String, ProviderError> {
        info!("Uploading {} bytes to S3: {}", bytes.len(), key);

        self.client
            .put_object()
            .bucket(&self.config.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                error!("S3 upload of {} failed: {}", key, DisplayErrorContext(&e));
                ProviderError::upstream(Collaborator::ObjectStorage, DisplayErrorContext(&e))
            })?;

        Ok(self.config.object_url(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_urls_are_virtual_hosted() {
        let config = StorageConfig {
            bucket: "closet".to_string(),
            region: "eu-west-1".to_string(),
        };
        assert_eq!(
            config.object_url("garments/users/42/1700000000000-shirt.png"),
            "https://closet.s3.eu-west-1.amazonaws.com/garments/users/42/1700000000000-shirt.png"
        );
    }
}

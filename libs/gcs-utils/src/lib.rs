/// Shared Google Cloud Storage utilities for Phototeca services
///
/// Provides a unified GCS client over the JSON API for bucket listing,
/// object download, and object metadata, to prevent duplication across
/// services.
use std::sync::Arc;
use std::time::Duration;

use gcp_auth::TokenProvider;
use reqwest::Client;
use thiserror::Error;

pub mod config;
pub mod operations;

pub use config::GcsConfig;
pub use operations::ObjectInfo;

/// OAuth scope for read-only storage access
const STORAGE_SCOPES: &[&str] = &["https://www.googleapis.com/auth/devstorage.read_only"];

/// GCS client error types
#[derive(Error, Debug)]
pub enum GcsError {
    #[error("failed to get storage access token: {0}")]
    Auth(#[from] gcp_auth::Error),

    #[error("storage request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("storage API error ({status}): {message}")]
    Api {
        status: reqwest::StatusCode,
        message: String,
    },
}

/// Shared GCS client wrapper
#[derive(Clone)]
pub struct GcsClient {
    pub(crate) client: Client,
    token_provider: Arc<dyn TokenProvider>,
    pub(crate) config: GcsConfig,
}

impl GcsClient {
    /// Create a new GCS client for a bucket
    pub fn new(token_provider: Arc<dyn TokenProvider>, config: GcsConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            token_provider,
            config,
        }
    }

    /// Get GCS configuration
    pub fn config(&self) -> &GcsConfig {
        &self.config
    }

    /// Get a bearer token for storage requests
    pub(crate) async fn access_token(&self) -> Result<String, GcsError> {
        let token = self.token_provider.token(STORAGE_SCOPES).await?;
        Ok(token.as_str().to_string())
    }

    /// Health check for bucket connectivity and permissions
    pub async fn health_check(&self) -> Result<(), GcsError> {
        let token = self.access_token().await?;
        let response = self
            .client
            .get(self.config.bucket_url())
            .bearer_auth(&token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GcsError::Api { status, message });
        }

        Ok(())
    }
}

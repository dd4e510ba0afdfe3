/// GCS configuration shared across services
use serde::{Deserialize, Serialize};

const DEFAULT_ENDPOINT: &str = "https://storage.googleapis.com";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcsConfig {
    /// GCS bucket name
    pub bucket: String,
    /// API endpoint, overridable for emulators
    pub endpoint: String,
}

impl GcsConfig {
    /// Configuration for a bucket on the public GCS endpoint
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    /// Override the API endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// URL of the bucket resource
    pub fn bucket_url(&self) -> String {
        format!("{}/storage/v1/b/{}", self.endpoint, self.bucket)
    }

    /// URL of the object listing for the bucket
    pub fn objects_url(&self) -> String {
        format!("{}/o", self.bucket_url())
    }

    /// URL of a single object resource
    pub fn object_url(&self, name: &str) -> String {
        format!("{}/o/{}", self.bucket_url(), urlencoding::encode(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_objects_url() {
        let config = GcsConfig::new("test-bucket");
        assert_eq!(
            config.objects_url(),
            "https://storage.googleapis.com/storage/v1/b/test-bucket/o"
        );
    }

    #[test]
    fn test_object_url_encodes_name() {
        let config = GcsConfig::new("test-bucket");
        let url = config.object_url("photos/2024/beach day.jpg");
        assert_eq!(
            url,
            "https://storage.googleapis.com/storage/v1/b/test-bucket/o/photos%2F2024%2Fbeach%20day.jpg"
        );
    }

    #[test]
    fn test_custom_endpoint() {
        let config = GcsConfig::new("test-bucket").with_endpoint("http://localhost:4443");
        assert_eq!(
            config.bucket_url(),
            "http://localhost:4443/storage/v1/b/test-bucket"
        );
    }
}

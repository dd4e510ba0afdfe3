/// GCS operations for object listing, download, and metadata
use serde::Deserialize;
use tracing::debug;

use crate::{GcsClient, GcsError};

/// Basic attributes of a stored object
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectInfo {
    /// Full object name, including any folder prefix
    pub name: String,
    pub content_type: Option<String>,
    /// Object size in bytes (the JSON API serializes it as a string)
    pub size: Option<String>,
    pub updated: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListObjectsResponse {
    #[serde(default)]
    items: Vec<ObjectInfo>,
    next_page_token: Option<String>,
}

impl GcsClient {
    /// List objects under a prefix, following page tokens to exhaustion
    pub async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectInfo>, GcsError> {
        let token = self.access_token().await?;
        let mut objects = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(self.config.objects_url())
                .bearer_auth(&token)
                .query(&[
                    ("prefix", prefix),
                    ("fields", "items(name,contentType,size,updated),nextPageToken"),
                ]);
            if let Some(ref cursor) = page_token {
                request = request.query(&[("pageToken", cursor.as_str())]);
            }

            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(GcsError::Api { status, message });
            }

            let page: ListObjectsResponse = response.json().await?;
            objects.extend(page.items);

            match page.next_page_token {
                Some(cursor) => page_token = Some(cursor),
                None => break,
            }
        }

        debug!(
            bucket = %self.config.bucket,
            prefix = %prefix,
            count = objects.len(),
            "Listed bucket objects"
        );

        Ok(objects)
    }

    /// Download the full content of an object
    pub async fn download_object(&self, name: &str) -> Result<Vec<u8>, GcsError> {
        let token = self.access_token().await?;
        let response = self
            .client
            .get(self.config.object_url(name))
            .bearer_auth(&token)
            .query(&[("alt", "media")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GcsError::Api { status, message });
        }

        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_listing_page() {
        let body = r#"{
            "items": [
                {"name": "photos/cat.jpg", "contentType": "image/jpeg", "size": "52341", "updated": "2024-05-01T10:00:00Z"},
                {"name": "photos/notes.txt", "contentType": "text/plain", "size": "120", "updated": "2024-05-02T08:30:00Z"}
            ],
            "nextPageToken": "CgZwaG90b3M="
        }"#;

        let page: ListObjectsResponse = serde_json::from_str(body).unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].name, "photos/cat.jpg");
        assert_eq!(page.items[0].content_type.as_deref(), Some("image/jpeg"));
        assert_eq!(page.next_page_token.as_deref(), Some("CgZwaG90b3M="));
    }

    #[test]
    fn test_parse_empty_listing() {
        let page: ListObjectsResponse = serde_json::from_str("{}").unwrap();
        assert!(page.items.is_empty());
        assert!(page.next_page_token.is_none());
    }
}

//! Firestore-backed metadata store
//!
//! Records are keyed by the image's base file name and written whole: a
//! run either creates a full record or deletes one, never patches fields.
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use gcp_auth::TokenProvider;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

const FIRESTORE_API_URL: &str = "https://firestore.googleapis.com/v1";
const FIRESTORE_API_SCOPES: &[&str] = &["https://www.googleapis.com/auth/datastore"];
const LIST_PAGE_SIZE: &str = "300";

/// A full metadata record for one stored image
#[derive(Debug, Clone, PartialEq)]
pub struct ImageMetadata {
    /// Record key, the image's base file name
    pub file_id: String,
    /// Full object name in the bucket, including the folder prefix
    pub file_name: String,
    /// Tags in the model's native language
    pub tags_en: Vec<String>,
    /// Tags translated into the configured target language
    pub tags_pt: Vec<String>,
    pub processed_at: DateTime<Utc>,
}

// ============================================
// Wire types
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
enum FirestoreValue {
    StringValue(String),
    TimestampValue(String),
    ArrayValue(ArrayValue),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ArrayValue {
    #[serde(default)]
    values: Vec<FirestoreValue>,
}

#[derive(Debug, Serialize)]
struct WriteDocument {
    fields: BTreeMap<String, FirestoreValue>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct ListDocumentsResponse {
    documents: Vec<DocumentRef>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct DocumentRef {
    name: String,
}

impl ImageMetadata {
    fn to_fields(&self) -> BTreeMap<String, FirestoreValue> {
        let mut fields = BTreeMap::new();
        fields.insert(
            "file_id".to_string(),
            FirestoreValue::StringValue(self.file_id.clone()),
        );
        fields.insert(
            "file_name".to_string(),
            FirestoreValue::StringValue(self.file_name.clone()),
        );
        fields.insert("tags_en".to_string(), string_array(&self.tags_en));
        fields.insert("tags_pt".to_string(), string_array(&self.tags_pt));
        fields.insert(
            "processed_at".to_string(),
            FirestoreValue::TimestampValue(
                self.processed_at
                    .to_rfc3339_opts(SecondsFormat::Micros, true),
            ),
        );
        fields
    }
}

fn string_array(values: &[String]) -> FirestoreValue {
    FirestoreValue::ArrayValue(ArrayValue {
        values: values
            .iter()
            .cloned()
            .map(FirestoreValue::StringValue)
            .collect(),
    })
}

/// Last path segment of a Firestore document resource name
fn document_id(resource_name: &str) -> &str {
    resource_name
        .rsplit('/')
        .next()
        .unwrap_or(resource_name)
}

/// Firestore REST client scoped to one collection
pub struct FirestoreClient {
    client: Client,
    token_provider: Arc<dyn TokenProvider>,
    project_id: String,
    database: String,
    collection: String,
}

impl FirestoreClient {
    /// Create a new Firestore client
    pub fn new(
        token_provider: Arc<dyn TokenProvider>,
        project_id: String,
        database: String,
        collection: String,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            token_provider,
            project_id,
            database,
            collection,
        }
    }

    fn collection_url(&self) -> String {
        format!(
            "{}/projects/{}/databases/{}/documents/{}",
            FIRESTORE_API_URL, self.project_id, self.database, self.collection
        )
    }

    fn document_url(&self, file_id: &str) -> String {
        format!(
            "{}/{}",
            self.collection_url(),
            urlencoding::encode(file_id)
        )
    }

    async fn access_token(&self) -> Result<String> {
        let token = self
            .token_provider
            .token(FIRESTORE_API_SCOPES)
            .await
            .context("Failed to get access token")?;
        Ok(token.as_str().to_string())
    }

    /// List the keys of all existing metadata records
    pub async fn list_keys(&self) -> Result<HashSet<String>> {
        let token = self.access_token().await?;
        let mut keys = HashSet::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(self.collection_url())
                .bearer_auth(&token)
                .query(&[
                    ("pageSize", LIST_PAGE_SIZE),
                    ("mask.fieldPaths", "__name__"),
                ]);
            if let Some(ref cursor) = page_token {
                request = request.query(&[("pageToken", cursor.as_str())]);
            }

            let response = request
                .send()
                .await
                .context("Failed to call Firestore list API")?;

            let status = response.status();
            if !status.is_success() {
                let error_text = response.text().await.unwrap_or_default();
                anyhow::bail!("Firestore list error ({}): {}", status, error_text);
            }

            let page: ListDocumentsResponse = response
                .json()
                .await
                .context("Failed to parse Firestore list response")?;

            keys.extend(
                page.documents
                    .iter()
                    .map(|doc| document_id(&doc.name).to_string()),
            );

            match page.next_page_token {
                Some(cursor) => page_token = Some(cursor),
                None => break,
            }
        }

        debug!(
            collection = %self.collection,
            count = keys.len(),
            "Listed metadata record keys"
        );

        Ok(keys)
    }

    /// Create or replace the record for an image
    pub async fn upsert(&self, record: &ImageMetadata) -> Result<()> {
        let token = self.access_token().await?;
        let body = WriteDocument {
            fields: record.to_fields(),
        };

        let response = self
            .client
            .patch(self.document_url(&record.file_id))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .context("Failed to call Firestore write API")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Firestore write error ({}): {}", status, error_text);
        }

        debug!(file_id = %record.file_id, "Metadata record saved");
        Ok(())
    }

    /// Delete the record for an image
    pub async fn delete(&self, file_id: &str) -> Result<()> {
        let token = self.access_token().await?;
        let response = self
            .client
            .delete(self.document_url(file_id))
            .bearer_auth(&token)
            .send()
            .await
            .context("Failed to call Firestore delete API")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Firestore delete error ({}): {}", status, error_text);
        }

        debug!(file_id = %file_id, "Metadata record deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_record() -> ImageMetadata {
        ImageMetadata {
            file_id: "cat.jpg".to_string(),
            file_name: "photos/cat.jpg".to_string(),
            tags_en: vec!["cat".to_string(), "sofa".to_string()],
            tags_pt: vec!["gato".to_string(), "sofá".to_string()],
            processed_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_record_to_fields_wire_format() {
        let json = serde_json::to_value(WriteDocument {
            fields: sample_record().to_fields(),
        })
        .unwrap();

        assert_eq!(json["fields"]["file_id"]["stringValue"], "cat.jpg");
        assert_eq!(json["fields"]["file_name"]["stringValue"], "photos/cat.jpg");
        assert_eq!(
            json["fields"]["tags_en"]["arrayValue"]["values"][1]["stringValue"],
            "sofa"
        );
        assert_eq!(
            json["fields"]["tags_pt"]["arrayValue"]["values"][0]["stringValue"],
            "gato"
        );
        assert_eq!(
            json["fields"]["processed_at"]["timestampValue"],
            "2024-05-01T12:30:00.000000Z"
        );
    }

    #[test]
    fn test_empty_tags_serialize_as_empty_array() {
        let mut record = sample_record();
        record.tags_en.clear();
        let json = serde_json::to_value(WriteDocument {
            fields: record.to_fields(),
        })
        .unwrap();
        assert!(json["fields"]["tags_en"]["arrayValue"]["values"]
            .as_array()
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_document_id_from_resource_name() {
        assert_eq!(
            document_id(
                "projects/archive/databases/(default)/documents/images/cat.jpg"
            ),
            "cat.jpg"
        );
        assert_eq!(document_id("cat.jpg"), "cat.jpg");
    }

    #[test]
    fn test_parse_list_page() {
        let body = r#"{
            "documents": [
                {"name": "projects/p/databases/(default)/documents/images/a.jpg"},
                {"name": "projects/p/databases/(default)/documents/images/b.png"}
            ],
            "nextPageToken": "AFTOR"
        }"#;
        let page: ListDocumentsResponse = serde_json::from_str(body).unwrap();
        let keys: Vec<&str> = page.documents.iter().map(|d| document_id(&d.name)).collect();
        assert_eq!(keys, vec!["a.jpg", "b.png"]);
        assert_eq!(page.next_page_token.as_deref(), Some("AFTOR"));
    }

    #[test]
    fn test_parse_empty_collection() {
        let page: ListDocumentsResponse = serde_json::from_str("{}").unwrap();
        assert!(page.documents.is_empty());
        assert!(page.next_page_token.is_none());
    }
}

//! Gemini API integration for image description
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use gcp_auth::TokenProvider;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const GEMINI_API_SCOPES: &[&str] = &["https://www.googleapis.com/auth/cloud-platform"];

/// Authentication mode for the Gemini API
#[derive(Clone)]
pub enum AuthMode {
    /// Use API key authentication
    ApiKey(String),
    /// Use OAuth credentials (service account or Workload Identity)
    Credentials(Arc<dyn TokenProvider>),
}

impl fmt::Debug for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMode::ApiKey(_) => write!(f, "ApiKey"),
            AuthMode::Credentials(_) => write!(f, "Credentials"),
        }
    }
}

/// Gemini generateContent client
pub struct GeminiClient {
    client: Client,
    auth_mode: AuthMode,
    model: String,
    prompt: String,
}

// ============================================
// Request types
// ============================================

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    /// Base64-encoded image bytes
    data: String,
}

// ============================================
// Response types
// ============================================

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct GenerateContentResponse {
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct CandidateContent {
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(auth_mode: AuthMode, model: String, prompt: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            auth_mode,
            model,
            prompt,
        }
    }

    /// Get an access token for credential-based authentication
    async fn get_access_token(&self, provider: &Arc<dyn TokenProvider>) -> Result<String> {
        let token = provider
            .token(GEMINI_API_SCOPES)
            .await
            .context("Failed to get access token")?;
        Ok(token.as_str().to_string())
    }

    /// Describe an image with the configured prompt
    ///
    /// # Arguments
    /// * `image` - Raw image bytes
    /// * `mime_type` - MIME type of the image (e.g. `image/jpeg`)
    ///
    /// # Returns
    /// The model's text response (a comma-separated tag list for the
    /// default prompt)
    pub async fn describe_image(&self, image: &[u8], mime_type: &str) -> Result<String> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part {
                        text: Some(self.prompt.clone()),
                        inline_data: None,
                    },
                    Part {
                        text: None,
                        inline_data: Some(InlineData {
                            mime_type: mime_type.to_string(),
                            data: BASE64.encode(image),
                        }),
                    },
                ],
            }],
        };

        let url = format!("{}/{}:generateContent", GEMINI_API_URL, self.model);
        let start = std::time::Instant::now();

        // Build request based on auth mode
        let response = match &self.auth_mode {
            AuthMode::ApiKey(api_key) => {
                let url = format!("{}?key={}", url, api_key);
                self.client
                    .post(&url)
                    .json(&request)
                    .send()
                    .await
                    .context("Failed to call Gemini API")?
            }
            AuthMode::Credentials(provider) => {
                let token = self.get_access_token(provider).await?;
                self.client
                    .post(&url)
                    .bearer_auth(&token)
                    .json(&request)
                    .send()
                    .await
                    .context("Failed to call Gemini API")?
            }
        };

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(status = %status, error = %error_text, "Gemini API request failed");
            anyhow::bail!("Gemini API error ({}): {}", status, error_text);
        }

        let generate_response: GenerateContentResponse = response
            .json()
            .await
            .context("Failed to parse Gemini API response")?;

        let elapsed = start.elapsed();
        debug!(elapsed_ms = elapsed.as_millis(), "Gemini API response received");

        let text = extract_text(&generate_response)?;

        info!(
            model = %self.model,
            chars = text.len(),
            elapsed_ms = elapsed.as_millis(),
            "Image description complete"
        );

        Ok(text)
    }

    /// Check if authentication is configured
    pub fn is_configured(&self) -> bool {
        match &self.auth_mode {
            AuthMode::ApiKey(key) => !key.is_empty(),
            AuthMode::Credentials(_) => true,
        }
    }

    /// Get the current auth mode
    pub fn auth_mode(&self) -> &AuthMode {
        &self.auth_mode
    }

    /// Get the configured model name
    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Pull the candidate text out of a generateContent response
fn extract_text(response: &GenerateContentResponse) -> Result<String> {
    if let Some(feedback) = &response.prompt_feedback {
        if let Some(reason) = &feedback.block_reason {
            anyhow::bail!("Gemini blocked the request: {}", reason);
        }
    }

    let candidate = response
        .candidates
        .first()
        .ok_or_else(|| anyhow::anyhow!("Gemini returned no candidates"))?;

    let text: String = candidate
        .content
        .as_ref()
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|part| part.text.as_deref())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        anyhow::bail!(
            "Gemini returned an empty response (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        );
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_not_configured() {
        let client = GeminiClient::new(
            AuthMode::ApiKey(String::new()),
            "gemini-1.5-flash".to_string(),
            "Describe this image.".to_string(),
        );
        assert!(!client.is_configured());
    }

    #[test]
    fn test_client_configured() {
        let client = GeminiClient::new(
            AuthMode::ApiKey("test-api-key".to_string()),
            "gemini-1.5-flash".to_string(),
            "Describe this image.".to_string(),
        );
        assert!(client.is_configured());
    }

    #[test]
    fn test_extract_text() {
        let body = r#"{
            "candidates": [{
                "content": {
                    "parts": [{"text": "beach, sunset"}, {"text": ", palm tree"}],
                    "role": "model"
                },
                "finishReason": "STOP"
            }]
        }"#;
        let response: GenerateContentResponse = serde_json::from_str(body).unwrap();
        assert_eq!(extract_text(&response).unwrap(), "beach, sunset, palm tree");
    }

    #[test]
    fn test_extract_text_no_candidates() {
        let response: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(extract_text(&response).is_err());
    }

    #[test]
    fn test_extract_text_blocked() {
        let body = r#"{
            "candidates": [],
            "promptFeedback": {"blockReason": "SAFETY"}
        }"#;
        let response: GenerateContentResponse = serde_json::from_str(body).unwrap();
        let err = extract_text(&response).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_extract_text_empty_parts() {
        let body = r#"{
            "candidates": [{"content": {"parts": []}, "finishReason": "MAX_TOKENS"}]
        }"#;
        let response: GenerateContentResponse = serde_json::from_str(body).unwrap();
        let err = extract_text(&response).unwrap_err();
        assert!(err.to_string().contains("MAX_TOKENS"));
    }

    #[test]
    fn test_request_serialization_uses_camel_case() {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: None,
                    inline_data: Some(InlineData {
                        mime_type: "image/png".to_string(),
                        data: "aGVsbG8=".to_string(),
                    }),
                }],
            }],
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("inlineData"));
        assert!(json.contains("mimeType"));
        assert!(!json.contains("\"text\""));
    }
}

//! Cloud Translation API integration for tag translation
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use gcp_auth::TokenProvider;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

const TRANSLATE_API_URL: &str = "https://translation.googleapis.com/language/translate/v2";
const TRANSLATE_API_SCOPES: &[&str] = &["https://www.googleapis.com/auth/cloud-translation"];

/// Cloud Translation v2 client
pub struct TranslateClient {
    client: Client,
    token_provider: Arc<dyn TokenProvider>,
    target_language: String,
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a [String],
    target: &'a str,
    format: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    data: TranslationList,
}

#[derive(Debug, Deserialize)]
struct TranslationList {
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Translation {
    translated_text: String,
}

impl TranslateClient {
    /// Create a new translation client
    pub fn new(token_provider: Arc<dyn TokenProvider>, target_language: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            token_provider,
            target_language,
        }
    }

    /// Translate a batch of texts into the target language, preserving order
    ///
    /// Empty input short-circuits to an empty output without a remote call.
    pub async fn translate(&self, texts: &[String]) -> Result<Vec<String>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let token = self
            .token_provider
            .token(TRANSLATE_API_SCOPES)
            .await
            .context("Failed to get access token")?;

        let request = TranslateRequest {
            q: texts,
            target: &self.target_language,
            format: "text",
        };

        let response = self
            .client
            .post(TRANSLATE_API_URL)
            .bearer_auth(token.as_str())
            .json(&request)
            .send()
            .await
            .context("Failed to call Translation API")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(status = %status, error = %error_text, "Translation API request failed");
            anyhow::bail!("Translation API error ({}): {}", status, error_text);
        }

        let translate_response: TranslateResponse = response
            .json()
            .await
            .context("Failed to parse Translation API response")?;

        let translated = collect_translations(translate_response, texts.len())?;

        debug!(
            count = translated.len(),
            target = %self.target_language,
            "Batch translated"
        );

        Ok(translated)
    }

    /// Get the configured target language
    pub fn target_language(&self) -> &str {
        &self.target_language
    }
}

/// Flatten the response, enforcing the one-output-per-input contract
fn collect_translations(response: TranslateResponse, expected: usize) -> Result<Vec<String>> {
    let translated: Vec<String> = response
        .data
        .translations
        .into_iter()
        .map(|t| t.translated_text)
        .collect();

    if translated.len() != expected {
        anyhow::bail!(
            "Translation API returned {} translations for {} inputs",
            translated.len(),
            expected
        );
    }

    Ok(translated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_response() -> TranslateResponse {
        let body = r#"{
            "data": {
                "translations": [
                    {"translatedText": "praia"},
                    {"translatedText": "pôr do sol"}
                ]
            }
        }"#;
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_collect_translations_preserves_order() {
        let translated = collect_translations(sample_response(), 2).unwrap();
        assert_eq!(translated, vec!["praia", "pôr do sol"]);
    }

    #[test]
    fn test_collect_translations_length_mismatch() {
        let err = collect_translations(sample_response(), 3).unwrap_err();
        assert!(err.to_string().contains("2 translations for 3 inputs"));
    }
}

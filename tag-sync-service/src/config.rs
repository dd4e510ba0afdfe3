//! Configuration for the tag sync service
use std::path::PathBuf;

use serde::Deserialize;

/// Main configuration struct, loaded from environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Path to a Google service account key file
    #[serde(default)]
    pub google_application_credentials: Option<PathBuf>,

    /// Use Application Default Credentials instead of a key file
    #[serde(default)]
    pub use_adc: bool,

    /// Bucket holding the photo archive
    pub bucket_name: String,

    /// Folder prefix inside the bucket, empty for the bucket root
    #[serde(default)]
    pub bucket_folder_path: String,

    /// Firestore database id
    #[serde(default = "default_firestore_database")]
    pub firestore_database: String,

    /// Firestore collection holding the metadata records
    #[serde(default = "default_firestore_collection")]
    pub firestore_collection: String,

    /// Gemini model used for tagging
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,

    /// Gemini API key (optional, uses the service credentials if not set)
    #[serde(default)]
    pub gemini_api_key: String,

    /// Prompt sent alongside each image
    #[serde(default = "default_gemini_prompt")]
    pub gemini_prompt: String,

    /// Language the tags are translated into
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Rate limit for tagging calls (requests per second, 0 = unlimited)
    #[serde(default)]
    pub rate_limit_rps: u32,
}

fn default_firestore_database() -> String {
    "(default)".to_string()
}

fn default_firestore_collection() -> String {
    "images".to_string()
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_gemini_prompt() -> String {
    "Analyze this image and provide a list of descriptive tags in English, \
     separated by commas. Focus on objects, scenes, and key attributes. \
     Return only the tags, nothing else."
        .to_string()
}

fn default_target_language() -> String {
    "pt".to_string()
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }
}

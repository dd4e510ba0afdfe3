//! Tag sync service - keeps photo metadata in step with the archive bucket
//!
//! This service provides:
//! - Bucket enumeration of archived images
//! - Descriptive tag generation through the Gemini API
//! - Tag translation through the Cloud Translation API
//! - Firestore persistence of full metadata records
//! - A single-pass reconciliation job tying the four together

pub mod config;
pub mod jobs;
pub mod providers;
pub mod services;
pub mod stores;

pub use config::Config;
pub use jobs::{SyncJob, SyncStats};
pub use providers::{AuthMode, GeminiClient, TranslateClient};
pub use services::{base_name, is_image, mime_type, parse_tags};
pub use stores::{FirestoreClient, ImageMetadata};

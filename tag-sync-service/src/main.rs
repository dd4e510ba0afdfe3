//! Tag Sync Service - Main entry point
//!
//! One-shot reconciliation between the photo archive bucket and the
//! metadata collection: new images are tagged with Gemini, the tags are
//! translated, and a full record is saved; records whose image was removed
//! from the bucket are deleted. Designed to run as a CronJob.

use anyhow::Result;
use gcp_credentials::CredentialSource;
use gcs_utils::{GcsClient, GcsConfig};
use tag_sync_service::{
    AuthMode, Config, FirestoreClient, GeminiClient, SyncJob, TranslateClient,
};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tag_sync_service=debug,gcs_utils=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    info!(
        "Configuration loaded: bucket={}, model={}, target_language={}",
        config.bucket_name, config.gemini_model, config.target_language
    );

    // Resolve Google credentials
    let source = CredentialSource::resolve(
        config.google_application_credentials.clone(),
        config.use_adc,
    )?;
    let provider = source.token_provider().await?;
    let project_id = gcp_credentials::project_id(&provider).await?;
    info!("Google credentials initialized for project {}", project_id);

    // Storage client, checked up front so permission problems fail fast
    let storage = GcsClient::new(provider.clone(), GcsConfig::new(&config.bucket_name));
    storage.health_check().await.map_err(|e| {
        error!("Bucket {} is not accessible: {}", config.bucket_name, e);
        anyhow::anyhow!("Storage error: {}", e)
    })?;

    // Tagging client
    let auth_mode = if config.gemini_api_key.is_empty() {
        AuthMode::Credentials(provider.clone())
    } else {
        info!("Using API key for the Gemini API");
        AuthMode::ApiKey(config.gemini_api_key.clone())
    };
    let gemini = GeminiClient::new(
        auth_mode,
        config.gemini_model.clone(),
        config.gemini_prompt.clone(),
    );
    info!(
        "Gemini client initialized (model: {}, auth: {:?})",
        gemini.model(),
        gemini.auth_mode()
    );

    // Translation and metadata store clients
    let translator = TranslateClient::new(provider.clone(), config.target_language.clone());
    info!(
        "Translation client initialized (target: {})",
        translator.target_language()
    );
    let store = FirestoreClient::new(
        provider,
        project_id,
        config.firestore_database.clone(),
        config.firestore_collection.clone(),
    );

    // Run the reconciliation pass
    let job = SyncJob::new(storage, gemini, translator, store, config);
    let stats = job.run().await.map_err(|e| {
        error!("Sync failed: {}", e);
        anyhow::anyhow!("Sync error: {}", e)
    })?;

    info!(
        "Sync completed: images={}, records_before={}, added={}, removed={}, errors={}",
        stats.storage_images, stats.existing_records, stats.added, stats.removed, stats.errors
    );

    if stats.errors > 0 {
        warn!(
            "Sync completed with {} item errors out of {} images",
            stats.errors, stats.storage_images
        );
    }

    Ok(())
}

//! Metadata synchronization job
//!
//! Reconciles the metadata collection with the bucket in a single pass:
//! records whose backing object is gone are deleted, images without a
//! record are tagged, translated, and saved. Per-item failures are counted
//! and skipped so one bad image cannot stall the whole pass.
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use gcs_utils::{GcsClient, ObjectInfo};
use tracing::{debug, error, info};

use crate::config::Config;
use crate::providers::{GeminiClient, TranslateClient};
use crate::services::{base_name, is_image, mime_type, parse_tags};
use crate::stores::{FirestoreClient, ImageMetadata};

/// One-shot reconciliation job over the bucket and the metadata store
pub struct SyncJob {
    storage: GcsClient,
    gemini: GeminiClient,
    translator: TranslateClient,
    store: FirestoreClient,
    config: Config,
}

/// Statistics from a sync run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Image objects found in the bucket
    pub storage_images: u64,
    /// Metadata records found before the pass
    pub existing_records: u64,
    /// Records created this pass
    pub added: u64,
    /// Stale records deleted this pass
    pub removed: u64,
    /// Items skipped because of a per-item failure
    pub errors: u64,
}

impl SyncJob {
    /// Create a new sync job
    pub fn new(
        storage: GcsClient,
        gemini: GeminiClient,
        translator: TranslateClient,
        store: FirestoreClient,
        config: Config,
    ) -> Self {
        Self {
            storage,
            gemini,
            translator,
            store,
            config,
        }
    }

    /// Run one reconciliation pass
    ///
    /// Fails only when either enumeration fails; per-item errors are
    /// logged, counted in the stats, and retried naturally on the next
    /// pass because no record is written for them.
    pub async fn run(&self) -> Result<SyncStats> {
        info!(
            bucket = %self.storage.config().bucket,
            prefix = %self.config.bucket_folder_path,
            "Starting metadata sync"
        );

        let objects = self
            .storage
            .list_objects(&self.config.bucket_folder_path)
            .await
            .context("Failed to list bucket objects")?;
        let images = image_objects(objects, &self.config.bucket_folder_path);

        let record_keys = self
            .store
            .list_keys()
            .await
            .context("Failed to list metadata records")?;

        let storage_keys: BTreeSet<String> = images.keys().cloned().collect();
        let (to_add, to_remove) = reconcile(&storage_keys, &record_keys);

        let mut stats = SyncStats {
            storage_images: storage_keys.len() as u64,
            existing_records: record_keys.len() as u64,
            ..SyncStats::default()
        };

        if to_remove.is_empty() {
            info!("No stale metadata records to remove");
        } else {
            info!(
                count = to_remove.len(),
                "Removing metadata for objects no longer in storage"
            );
            for file_id in &to_remove {
                match self.store.delete(file_id).await {
                    Ok(()) => {
                        stats.removed += 1;
                        debug!(file_id = %file_id, "Stale record removed");
                    }
                    Err(e) => {
                        stats.errors += 1;
                        error!(file_id = %file_id, error = %e, "Failed to remove stale record");
                    }
                }
            }
        }

        if to_add.is_empty() {
            info!("No new images to process");
        } else {
            info!(count = to_add.len(), "Processing new images");
            let total = to_add.len();
            for (position, file_id) in to_add.iter().enumerate() {
                let object = &images[file_id];
                info!(
                    item = position + 1,
                    total,
                    object = %object.name,
                    "Processing image"
                );
                match self.process_image(file_id, object).await {
                    Ok(()) => stats.added += 1,
                    Err(e) => {
                        stats.errors += 1;
                        error!(object = %object.name, error = %e, "Failed to process image");
                    }
                }

                // Rate limiting delay per tagging request
                if self.config.rate_limit_rps > 0 {
                    let delay_per_request =
                        Duration::from_millis(1000 / self.config.rate_limit_rps as u64);
                    tokio::time::sleep(delay_per_request).await;
                }
            }
        }

        info!(
            storage_images = stats.storage_images,
            existing_records = stats.existing_records,
            added = stats.added,
            removed = stats.removed,
            errors = stats.errors,
            "Metadata sync completed"
        );

        Ok(stats)
    }

    /// Tag, translate, and persist one new image
    async fn process_image(&self, file_id: &str, object: &ObjectInfo) -> Result<()> {
        let bytes = self
            .storage
            .download_object(&object.name)
            .await
            .with_context(|| format!("Failed to download {}", object.name))?;

        let mime = object
            .content_type
            .as_deref()
            .or_else(|| mime_type(&object.name))
            .unwrap_or("image/jpeg");

        let text = self
            .gemini
            .describe_image(&bytes, mime)
            .await
            .with_context(|| format!("Tag generation failed for {}", object.name))?;

        let tags_en = parse_tags(&text);
        if tags_en.is_empty() {
            anyhow::bail!("Model returned no usable tags for {}", object.name);
        }

        let tags_pt = self
            .translator
            .translate(&tags_en)
            .await
            .with_context(|| format!("Translation failed for {}", object.name))?;

        let record = ImageMetadata {
            file_id: file_id.to_string(),
            file_name: object.name.clone(),
            tags_en,
            tags_pt,
            processed_at: Utc::now(),
        };
        self.store
            .upsert(&record)
            .await
            .with_context(|| format!("Failed to save metadata for {}", object.name))?;

        debug!(
            file_id = %file_id,
            tags = record.tags_en.len(),
            "Image metadata stored"
        );

        Ok(())
    }
}

/// Index the bucket listing by base file name, keeping only image objects
/// and skipping the folder placeholder itself
fn image_objects(objects: Vec<ObjectInfo>, prefix: &str) -> BTreeMap<String, ObjectInfo> {
    objects
        .into_iter()
        .filter(|object| object.name != prefix && is_image(&object.name))
        .map(|object| (base_name(&object.name).to_string(), object))
        .collect()
}

/// Set difference in both directions: keys to add come from storage but
/// have no record, keys to remove have a record but no backing object
fn reconcile(
    storage_keys: &BTreeSet<String>,
    record_keys: &HashSet<String>,
) -> (Vec<String>, Vec<String>) {
    let to_add: Vec<String> = storage_keys
        .iter()
        .filter(|key| !record_keys.contains(*key))
        .cloned()
        .collect();

    let mut to_remove: Vec<String> = record_keys
        .iter()
        .filter(|key| !storage_keys.contains(*key))
        .cloned()
        .collect();
    to_remove.sort();

    (to_add, to_remove)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(name: &str) -> ObjectInfo {
        ObjectInfo {
            name: name.to_string(),
            content_type: None,
            size: None,
            updated: None,
        }
    }

    fn keys(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn records(values: &[&str]) -> HashSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_reconcile_in_sync_is_idempotent() {
        let (to_add, to_remove) = reconcile(
            &keys(&["a.jpg", "b.png"]),
            &records(&["a.jpg", "b.png"]),
        );
        assert!(to_add.is_empty());
        assert!(to_remove.is_empty());
    }

    #[test]
    fn test_reconcile_splits_differences() {
        let (to_add, to_remove) = reconcile(
            &keys(&["a.jpg", "b.png", "c.jpg"]),
            &records(&["b.png", "d.jpg", "e.jpg"]),
        );
        assert_eq!(to_add, vec!["a.jpg", "c.jpg"]);
        assert_eq!(to_remove, vec!["d.jpg", "e.jpg"]);
    }

    #[test]
    fn test_reconcile_empty_storage_removes_everything() {
        let (to_add, to_remove) = reconcile(&BTreeSet::new(), &records(&["a.jpg"]));
        assert!(to_add.is_empty());
        assert_eq!(to_remove, vec!["a.jpg"]);
    }

    #[test]
    fn test_image_objects_filters_and_keys_by_base_name() {
        let indexed = image_objects(
            vec![
                object("photos/"),
                object("photos/cat.jpg"),
                object("photos/readme.txt"),
                object("photos/nested/dog.png"),
            ],
            "photos/",
        );

        let names: Vec<&String> = indexed.keys().collect();
        assert_eq!(names, vec!["cat.jpg", "dog.png"]);
        assert_eq!(indexed["dog.png"].name, "photos/nested/dog.png");
    }

    #[test]
    fn test_image_objects_without_prefix() {
        let indexed = image_objects(vec![object("cat.jpg"), object("track.mp3")], "");
        assert_eq!(indexed.len(), 1);
        assert_eq!(indexed["cat.jpg"].name, "cat.jpg");
    }
}

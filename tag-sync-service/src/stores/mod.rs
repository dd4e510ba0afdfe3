//! Metadata store implementations

pub mod firestore;

pub use firestore::{FirestoreClient, ImageMetadata};

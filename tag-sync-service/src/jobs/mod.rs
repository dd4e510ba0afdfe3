//! Batch jobs

pub mod sync;

pub use sync::{SyncJob, SyncStats};

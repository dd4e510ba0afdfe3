//! Sync service business logic

pub mod images;
pub mod tags;

pub use images::{base_name, is_image, mime_type};
pub use tags::parse_tags;

//! Shared types used across the board, the pipeline, and the stores.
//!
//! These types are serialized to JSON by the CLI and must stay stable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One uploaded image, as recorded by the metadata store.
///
/// Immutable once created: the store assigns `id` and `created_at`, and a
/// change is modelled as delete + create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: i64,
    /// Id of the owning category. Always equals the id of the category
    /// whose sequence holds this record.
    pub category: String,
    /// Opaque handle into the object store (`<category>/<uuid>.<ext>`).
    pub storage_path: String,
    /// Publicly resolvable URL of the blob.
    pub url: String,
    pub created_at: DateTime<Utc>,
}

/// A board category. The set is fixed at startup; only `images` changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    /// Icon glyph shown next to the name.
    pub icon: String,
    /// Color token for the category chip.
    pub color: String,
    /// Gradient token for the category header.
    pub gradient: String,
    /// Newest first.
    #[serde(default)]
    pub images: Vec<ImageRecord>,
}

impl Category {
    pub fn new(id: &str, name: &str, icon: &str, color: &str, gradient: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            icon: icon.to_string(),
            color: color.to_string(),
            gradient: gradient.to_string(),
            images: Vec::new(),
        }
    }
}

/// A file picked by the user, before compression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    /// Declared media type, e.g. `image/jpeg`.
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Whether the declared media type is an image type.
    pub fn is_image(&self) -> bool {
        self.content_type
            .trim()
            .to_ascii_lowercase()
            .starts_with("image/")
    }
}

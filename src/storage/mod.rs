//! Remote collaborators of the image pipeline.
//!
//! Two independent stores back the board:
//!
//! | Trait | Holds | Implementations |
//! |---|---|---|
//! | [`ObjectStore`] | compressed image blobs, addressed by path | [`FsObjectStore`], [`MemoryObjectStore`] |
//! | [`MetadataStore`] | one row per image, the relational index | [`SqliteMetadataStore`], [`MemoryMetadataStore`] |
//!
//! There is no transaction spanning both. The pipeline always writes the blob
//! before the row and deletes the blob before the row, so an interrupted
//! operation can leave an orphaned blob but never a row pointing at nothing.
//!
//! The traits use native `async fn`. The board runs on a single-threaded
//! loop, so the returned futures are not required to be `Send`.

pub mod fs;
pub mod memory;
pub mod sqlite;

use crate::types::ImageRecord;
use thiserror::Error;

pub use fs::FsObjectStore;
pub use memory::{MemoryMetadataStore, MemoryObjectStore};
pub use sqlite::SqliteMetadataStore;

/// Blob put/remove failures.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid object path: {0}")]
    InvalidPath(String),
    #[error("Object store unavailable: {0}")]
    Unavailable(String),
}

/// Metadata query/insert/delete failures.
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Metadata store unavailable: {0}")]
    Unavailable(String),
}

#[allow(async_fn_in_trait)]
pub trait ObjectStore {
    /// Store `bytes` at `path`, replacing anything already there.
    async fn put(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<(), StorageError>;

    /// URL under which a stored object is publicly served. Pure; no round trip.
    fn public_url(&self, path: &str) -> String;

    /// Remove the objects at `paths`. Missing objects are not an error.
    async fn remove(&self, paths: &[String]) -> Result<(), StorageError>;
}

#[allow(async_fn_in_trait)]
pub trait MetadataStore {
    /// All records of `category`, newest first.
    async fn query(&self, category: &str) -> Result<Vec<ImageRecord>, MetadataError>;

    /// Insert a row; the store assigns `id` and `created_at`.
    async fn insert(
        &self,
        category: &str,
        storage_path: &str,
        url: &str,
    ) -> Result<ImageRecord, MetadataError>;

    /// Delete the row with `id`. Deleting a missing row succeeds.
    async fn delete_by_id(&self, id: i64) -> Result<(), MetadataError>;
}

/// Reject object paths that could escape the store's namespace.
pub(crate) fn validate_object_path(path: &str) -> Result<(), StorageError> {
    let bad = path.is_empty()
        || path.starts_with('/')
        || path.contains('\\')
        || path.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..");
    if bad {
        return Err(StorageError::InvalidPath(path.to_string()));
    }
    Ok(())
}

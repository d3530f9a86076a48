//! Metadata store backed by SQLite.
//!
//! One `images` row per uploaded image. Rows are never updated; an edit is a
//! delete followed by an insert.

use super::{MetadataError, MetadataStore};
use crate::types::ImageRecord;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, params};
use std::cell::RefCell;
use std::path::Path;

pub struct SqliteMetadataStore {
    conn: RefCell<Connection>,
}

impl SqliteMetadataStore {
    /// Open (or create) the database at `path` and make sure the schema exists.
    pub fn open(path: &Path) -> Result<Self, MetadataError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| MetadataError::Unavailable(format!("{}: {e}", parent.display())))?;
        }
        let store = Self {
            conn: RefCell::new(Connection::open(path)?),
        };
        store.init_schema()?;
        tracing::debug!(path = %path.display(), "metadata database opened");
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, MetadataError> {
        let store = Self {
            conn: RefCell::new(Connection::open_in_memory()?),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), MetadataError> {
        self.conn.borrow().execute_batch(
            "CREATE TABLE IF NOT EXISTS images (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                category        TEXT NOT NULL,
                storage_path    TEXT NOT NULL UNIQUE,
                url             TEXT NOT NULL,
                created_at      TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_images_category_created
                ON images(category, created_at DESC);",
        )?;
        Ok(())
    }

    fn row_to_record(row: &Row<'_>) -> rusqlite::Result<ImageRecord> {
        Ok(ImageRecord {
            id: row.get(0)?,
            category: row.get(1)?,
            storage_path: row.get(2)?,
            url: row.get(3)?,
            created_at: row.get::<_, DateTime<Utc>>(4)?,
        })
    }
}

impl std::fmt::Debug for SqliteMetadataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteMetadataStore").finish_non_exhaustive()
    }
}

impl MetadataStore for SqliteMetadataStore {
    async fn query(&self, category: &str) -> Result<Vec<ImageRecord>, MetadataError> {
        let conn = self.conn.borrow();
        let mut stmt = conn.prepare(
            "SELECT id, category, storage_path, url, created_at
             FROM images
             WHERE category = ?1
             ORDER BY created_at DESC, id DESC",
        )?;
        let records = stmt
            .query_map([category], Self::row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    async fn insert(
        &self,
        category: &str,
        storage_path: &str,
        url: &str,
    ) -> Result<ImageRecord, MetadataError> {
        let conn = self.conn.borrow();
        let created_at = Utc::now();
        conn.execute(
            "INSERT INTO images (category, storage_path, url, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![category, storage_path, url, created_at],
        )?;
        Ok(ImageRecord {
            id: conn.last_insert_rowid(),
            category: category.to_string(),
            storage_path: storage_path.to_string(),
            url: url.to_string(),
            created_at,
        })
    }

    async fn delete_by_id(&self, id: i64) -> Result<(), MetadataError> {
        let deleted = self
            .conn
            .borrow()
            .execute("DELETE FROM images WHERE id = ?1", params![id])?;
        if deleted == 0 {
            tracing::warn!(id, "no metadata row to delete");
        }
        Ok(())
    }
}

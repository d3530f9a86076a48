//! In-memory stores with call recording and failure injection.
//!
//! Every call yields to the scheduler once before touching state, so tests see
//! the same interleavings they would against a real network store. Failures
//! are switched on per operation and stay on until switched off.

use super::{MetadataError, MetadataStore, ObjectStore, StorageError, validate_object_path};
use crate::types::ImageRecord;
use chrono::Utc;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};

/// One recorded collaborator call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Put { path: String, content_type: String },
    Remove(Vec<String>),
    Query(String),
    Insert { category: String, storage_path: String },
    Delete(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Debug)]
pub struct MemoryObjectStore {
    base_url: String,
    objects: RefCell<BTreeMap<String, StoredObject>>,
    calls: RefCell<Vec<StoreCall>>,
    fail_puts: Cell<bool>,
    fail_removes: Cell<bool>,
}

impl MemoryObjectStore {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            objects: RefCell::default(),
            calls: RefCell::default(),
            fail_puts: Cell::new(false),
            fail_removes: Cell::new(false),
        }
    }

    pub fn fail_puts(&self, on: bool) {
        self.fail_puts.set(on);
    }

    pub fn fail_removes(&self, on: bool) {
        self.fail_removes.set(on);
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.borrow().clone()
    }

    pub fn object(&self, path: &str) -> Option<StoredObject> {
        self.objects.borrow().get(path).cloned()
    }

    pub fn paths(&self) -> Vec<String> {
        self.objects.borrow().keys().cloned().collect()
    }
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new("memory://board")
    }
}

impl ObjectStore for MemoryObjectStore {
    async fn put(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<(), StorageError> {
        tokio::task::yield_now().await;
        self.calls.borrow_mut().push(StoreCall::Put {
            path: path.to_string(),
            content_type: content_type.to_string(),
        });
        validate_object_path(path)?;
        if self.fail_puts.get() {
            return Err(StorageError::Unavailable("put rejected".to_string()));
        }
        self.objects.borrow_mut().insert(
            path.to_string(),
            StoredObject {
                bytes: bytes.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn remove(&self, paths: &[String]) -> Result<(), StorageError> {
        tokio::task::yield_now().await;
        self.calls
            .borrow_mut()
            .push(StoreCall::Remove(paths.to_vec()));
        if self.fail_removes.get() {
            return Err(StorageError::Unavailable("remove rejected".to_string()));
        }
        let mut objects = self.objects.borrow_mut();
        for path in paths {
            objects.remove(path);
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryMetadataStore {
    rows: RefCell<Vec<ImageRecord>>,
    next_id: Cell<i64>,
    calls: RefCell<Vec<StoreCall>>,
    failing_queries: RefCell<BTreeSet<String>>,
    fail_inserts: Cell<bool>,
    fail_deletes: Cell<bool>,
    misfile_inserts: RefCell<Option<String>>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make queries for `category` fail.
    pub fn fail_queries_for(&self, category: &str) {
        self.failing_queries
            .borrow_mut()
            .insert(category.to_string());
    }

    pub fn clear_query_failures(&self) {
        self.failing_queries.borrow_mut().clear();
    }

    /// File every inserted row under `category`, whatever was asked for.
    pub fn misfile_inserts_as(&self, category: &str) {
        *self.misfile_inserts.borrow_mut() = Some(category.to_string());
    }

    pub fn fail_inserts(&self, on: bool) {
        self.fail_inserts.set(on);
    }

    pub fn fail_deletes(&self, on: bool) {
        self.fail_deletes.set(on);
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.borrow().clone()
    }

    pub fn rows(&self) -> Vec<ImageRecord> {
        self.rows.borrow().clone()
    }

    /// Insert a row directly, bypassing call recording. For seeding fixtures.
    pub fn seed(&self, category: &str, storage_path: &str, url: &str) -> ImageRecord {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        let record = ImageRecord {
            id,
            category: category.to_string(),
            storage_path: storage_path.to_string(),
            url: url.to_string(),
            created_at: Utc::now(),
        };
        self.rows.borrow_mut().push(record.clone());
        record
    }
}

impl MetadataStore for MemoryMetadataStore {
    async fn query(&self, category: &str) -> Result<Vec<ImageRecord>, MetadataError> {
        tokio::task::yield_now().await;
        self.calls
            .borrow_mut()
            .push(StoreCall::Query(category.to_string()));
        if self.failing_queries.borrow().contains(category) {
            return Err(MetadataError::Unavailable(format!(
                "query for '{category}' rejected"
            )));
        }
        let mut records: Vec<ImageRecord> = self
            .rows
            .borrow()
            .iter()
            .filter(|r| r.category == category)
            .cloned()
            .collect();
        // Newest first; id breaks ties between rows inserted in the same instant.
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(records)
    }

    async fn insert(
        &self,
        category: &str,
        storage_path: &str,
        url: &str,
    ) -> Result<ImageRecord, MetadataError> {
        tokio::task::yield_now().await;
        self.calls.borrow_mut().push(StoreCall::Insert {
            category: category.to_string(),
            storage_path: storage_path.to_string(),
        });
        if self.fail_inserts.get() {
            return Err(MetadataError::Unavailable("insert rejected".to_string()));
        }
        let filed_under = self.misfile_inserts.borrow().clone();
        Ok(self.seed(
            filed_under.as_deref().unwrap_or(category),
            storage_path,
            url,
        ))
    }

    async fn delete_by_id(&self, id: i64) -> Result<(), MetadataError> {
        tokio::task::yield_now().await;
        self.calls.borrow_mut().push(StoreCall::Delete(id));
        if self.fail_deletes.get() {
            return Err(MetadataError::Unavailable("delete rejected".to_string()));
        }
        self.rows.borrow_mut().retain(|r| r.id != id);
        Ok(())
    }
}

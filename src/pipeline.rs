//! Image lifecycle: compress, store, index, and apply to the board.
//!
//! Every upload moves through these stages:
//!
//! ```text
//! Selected → Compressing → Uploading → PersistingMetadata → Visible
//!                 ↘              ↘                ↘
//!                               Failed
//! ```
//!
//! ## Ordering
//!
//! Blob first, row second, on both upload and delete. An interrupted upload
//! can leave a blob nobody references; it can never leave a row pointing at
//! a missing blob. Orphans are not cleaned up.
//!
//! ## Board updates
//!
//! The board is only touched on success, and only by swapping a whole
//! category sequence. A failure leaves every sequence as it was and raises one
//! notice. The `Result` is still handed back to the caller.
//!
//! The board lives behind `Rc<RefCell<_>>` and is never borrowed across an
//! `.await`: each operation reads the current sequence only at the moment it
//! applies its result, so interleaved deletes compose.
//!
//! ## Progress
//!
//! Stage transitions are logged and, when a sender is attached, sent as
//! [`UploadEvent`]s so a printer thread can render them as they happen.

use crate::board::Board;
use crate::imaging::{BackendError, CompressParams, ImageBackend, compress};
use crate::storage::{MetadataError, MetadataStore, ObjectStore, StorageError};
use crate::types::{ImageRecord, UploadFile};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::mpsc::Sender;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("'{0}' is not an image")]
    NotAnImage(String),
    #[error("Unknown category: {0}")]
    UnknownCategory(String),
    #[error("The board is read-only; sign in to make changes")]
    ReadOnly,
    #[error("Image #{id} belongs to '{actual}', not '{expected}'")]
    CategoryMismatch {
        id: i64,
        expected: String,
        actual: String,
    },
    #[error("Could not process image: {0}")]
    Compress(#[from] BackendError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("Compression worker failed: {0}")]
    Worker(String),
}

/// A category whose records could not be loaded.
#[derive(Error, Debug)]
#[error("Could not load category '{category}': {source}")]
pub struct FetchError {
    pub category: String,
    #[source]
    pub source: MetadataError,
}

/// Whether the caller may change the board. Derived from the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Access {
    #[default]
    Viewer,
    Editor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadStage {
    Selected,
    Compressing,
    Uploading,
    PersistingMetadata,
    Visible { id: i64, url: String },
    Failed { reason: String },
}

/// One stage transition of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadEvent {
    pub file: String,
    pub category: String,
    pub stage: UploadStage,
}

#[derive(Debug)]
pub struct BatchFailure {
    pub file: String,
    pub error: PipelineError,
}

/// Outcome of a multi-file upload, in selection order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub uploaded: Vec<ImageRecord>,
    pub failed: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied,
    /// The fetch was cancelled or superseded before it resolved.
    Discarded,
}

/// Holds the board's upload flag up while alive.
struct InFlight {
    board: Rc<RefCell<Board>>,
}

impl InFlight {
    fn enter(board: &Rc<RefCell<Board>>) -> Self {
        board.borrow_mut().begin_upload();
        Self {
            board: Rc::clone(board),
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        match self.board.try_borrow_mut() {
            Ok(mut board) => board.finish_upload(),
            Err(_) => tracing::error!("board busy while finishing upload; flag left raised"),
        }
    }
}

pub struct Pipeline<B, O, M> {
    backend: Arc<B>,
    objects: O,
    metadata: M,
    board: Rc<RefCell<Board>>,
    params: CompressParams,
    access: Access,
    events: Option<Sender<UploadEvent>>,
}

impl<B, O, M> Pipeline<B, O, M>
where
    B: ImageBackend + 'static,
    O: ObjectStore,
    M: MetadataStore,
{
    pub fn new(backend: B, objects: O, metadata: M, board: Rc<RefCell<Board>>) -> Self {
        Self {
            backend: Arc::new(backend),
            objects,
            metadata,
            board,
            params: CompressParams::default(),
            access: Access::default(),
            events: None,
        }
    }

    pub fn with_params(mut self, params: CompressParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    pub fn with_events(mut self, events: Sender<UploadEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn set_access(&mut self, access: Access) {
        self.access = access;
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn board(&self) -> &Rc<RefCell<Board>> {
        &self.board
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn objects(&self) -> &O {
        &self.objects
    }

    pub fn metadata(&self) -> &M {
        &self.metadata
    }

    // =========================================================================
    // Upload
    // =========================================================================

    /// Compress `file`, store it, index it, and put it at the front of
    /// `category`.
    ///
    /// A file whose declared type is not `image/*` is rejected before any
    /// collaborator is called and without touching the board.
    pub async fn upload(
        &self,
        category: &str,
        file: UploadFile,
    ) -> Result<ImageRecord, PipelineError> {
        self.check_editable(category)?;
        ensure_image(&file)?;
        self.board.borrow_mut().clear_transient_notice();
        self.upload_one(category, file).await
    }

    /// Upload several files one after another.
    ///
    /// A failed file is reported and the batch moves on, so the uploaded
    /// records always come out in selection order. The upload flag stays up
    /// for the whole batch.
    pub async fn upload_batch(
        &self,
        category: &str,
        files: Vec<UploadFile>,
    ) -> Result<BatchReport, PipelineError> {
        self.check_editable(category)?;
        self.board.borrow_mut().clear_transient_notice();
        let _in_flight = InFlight::enter(&self.board);

        let mut report = BatchReport::default();
        for file in files {
            let name = file.name.clone();
            match self.upload_one(category, file).await {
                Ok(record) => report.uploaded.push(record),
                Err(error) => report.failed.push(BatchFailure { file: name, error }),
            }
        }

        tracing::info!(
            category,
            uploaded = report.uploaded.len(),
            failed = report.failed.len(),
            "batch finished"
        );
        Ok(report)
    }

    async fn upload_one(
        &self,
        category: &str,
        file: UploadFile,
    ) -> Result<ImageRecord, PipelineError> {
        ensure_image(&file)?;

        let _in_flight = InFlight::enter(&self.board);
        let name = file.name.clone();
        self.emit(&name, category, UploadStage::Selected);

        match self.store_and_index(&name, category, file.bytes).await {
            Ok(record) => {
                self.swap_in(category, |board| board.with_prepended(category, record.clone()));
                tracing::info!(category, id = record.id, path = %record.storage_path, "image uploaded");
                self.emit(
                    &name,
                    category,
                    UploadStage::Visible {
                        id: record.id,
                        url: record.url.clone(),
                    },
                );
                Ok(record)
            }
            Err(error) => {
                tracing::warn!(category, file = %name, %error, "upload failed");
                self.board
                    .borrow_mut()
                    .raise(format!("Could not upload {name}: {error}"));
                self.emit(
                    &name,
                    category,
                    UploadStage::Failed {
                        reason: error.to_string(),
                    },
                );
                Err(error)
            }
        }
    }

    async fn store_and_index(
        &self,
        name: &str,
        category: &str,
        bytes: Vec<u8>,
    ) -> Result<ImageRecord, PipelineError> {
        self.emit(name, category, UploadStage::Compressing);
        let backend = Arc::clone(&self.backend);
        let params = self.params;
        let compressed =
            tokio::task::spawn_blocking(move || compress(&*backend, &bytes, &params))
                .await
                .map_err(|e| PipelineError::Worker(e.to_string()))??;

        let path = format!("{category}/{}.{}", Uuid::new_v4(), compressed.extension());

        self.emit(name, category, UploadStage::Uploading);
        self.objects
            .put(&path, &compressed.bytes, compressed.content_type())
            .await?;
        let url = self.objects.public_url(&path);

        self.emit(name, category, UploadStage::PersistingMetadata);
        let record = self.metadata.insert(category, &path, &url).await?;
        ensure_filed_under(category, &record)?;
        Ok(record)
    }

    // =========================================================================
    // Remove
    // =========================================================================

    /// Delete the blob, then the row; only then drop `record` from `category`.
    ///
    /// A record filed under another category is rejected before any
    /// collaborator is called.
    pub async fn remove(&self, category: &str, record: &ImageRecord) -> Result<(), PipelineError> {
        self.check_editable(category)?;
        ensure_filed_under(category, record)?;
        self.board.borrow_mut().clear_transient_notice();

        match self.delete_remote(record).await {
            Ok(()) => {
                self.swap_in(category, |board| board.without(category, record.id));
                tracing::info!(category, id = record.id, "image removed");
                Ok(())
            }
            Err(error) => {
                tracing::warn!(category, id = record.id, %error, "remove failed");
                self.board
                    .borrow_mut()
                    .raise(format!("Could not delete image: {error}"));
                Err(error)
            }
        }
    }

    async fn delete_remote(&self, record: &ImageRecord) -> Result<(), PipelineError> {
        self.objects
            .remove(std::slice::from_ref(&record.storage_path))
            .await?;
        self.metadata.delete_by_id(record.id).await?;
        Ok(())
    }

    // =========================================================================
    // Fetch
    // =========================================================================

    /// Load every board category.
    pub async fn fetch_board(&self) -> Result<FetchOutcome, PipelineError> {
        let ids = self.board.borrow().category_ids();
        self.fetch_all(&ids).await
    }

    /// Re-hydrate `category_ids` from the metadata store, newest first.
    ///
    /// All or nothing: if any query fails, every category ends up empty and
    /// one sticky notice is raised. If the fetch is cancelled through
    /// [`Board::cancel_fetch`] before it resolves, its result is discarded.
    pub async fn fetch_all(&self, category_ids: &[String]) -> Result<FetchOutcome, PipelineError> {
        {
            let board = self.board.borrow();
            if let Some(unknown) = category_ids.iter().find(|id| board.category(id).is_none()) {
                return Err(PipelineError::UnknownCategory(unknown.clone()));
            }
        }

        let ticket = self.board.borrow_mut().begin_fetch();
        let result = self.query_all(category_ids).await;

        let mut board = self.board.borrow_mut();
        match result {
            Ok(sequences) => {
                let count: usize = sequences.iter().map(|(_, images)| images.len()).sum();
                if board.apply_fetch(ticket, Ok(sequences)) {
                    tracing::info!(categories = category_ids.len(), images = count, "board loaded");
                    Ok(FetchOutcome::Applied)
                } else {
                    Ok(FetchOutcome::Discarded)
                }
            }
            Err(error) => {
                tracing::warn!(category = %error.category, error = %error.source, "board load failed");
                if board.apply_fetch(ticket, Err(format!("Could not load the board: {error}"))) {
                    Err(error.into())
                } else {
                    Ok(FetchOutcome::Discarded)
                }
            }
        }
    }

    async fn query_all(
        &self,
        category_ids: &[String],
    ) -> Result<Vec<(String, Vec<ImageRecord>)>, FetchError> {
        let mut sequences = Vec::with_capacity(category_ids.len());
        for id in category_ids {
            let records = self
                .metadata
                .query(id)
                .await
                .map_err(|source| FetchError {
                    category: id.clone(),
                    source,
                })?;
            sequences.push((id.clone(), records));
        }
        Ok(sequences)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn check_editable(&self, category: &str) -> Result<(), PipelineError> {
        if self.access != Access::Editor {
            return Err(PipelineError::ReadOnly);
        }
        if self.board.borrow().category(category).is_none() {
            return Err(PipelineError::UnknownCategory(category.to_string()));
        }
        Ok(())
    }

    /// Build the next sequence of `category` from the current board and swap
    /// it in.
    fn swap_in(&self, category: &str, next: impl FnOnce(&Board) -> Option<Vec<ImageRecord>>) {
        let mut board = self.board.borrow_mut();
        let applied = next(&*board).is_some_and(|images| board.replace_images(category, images));
        if !applied {
            tracing::warn!(category, "board sequence not updated");
        }
    }

    fn emit(&self, file: &str, category: &str, stage: UploadStage) {
        tracing::debug!(file, category, stage = ?stage, "upload stage");
        if let Some(events) = &self.events {
            // The printer may have gone away; progress is best effort.
            let _ = events.send(UploadEvent {
                file: file.to_string(),
                category: category.to_string(),
                stage,
            });
        }
    }
}

fn ensure_image(file: &UploadFile) -> Result<(), PipelineError> {
    if file.is_image() {
        Ok(())
    } else {
        tracing::debug!(file = %file.name, content_type = %file.content_type, "not an image");
        Err(PipelineError::NotAnImage(file.name.clone()))
    }
}

fn ensure_filed_under(category: &str, record: &ImageRecord) -> Result<(), PipelineError> {
    if record.category == category {
        Ok(())
    } else {
        Err(PipelineError::CategoryMismatch {
            id: record.id,
            expected: category.to_string(),
            actual: record.category.clone(),
        })
    }
}

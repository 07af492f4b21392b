//! Collaborator ports the task pipeline is written against.
//!
//! Every implementation maps its own failures into [`BatchError`] at the call
//! site; nothing raw crosses these traits.

use std::path::{Path, PathBuf};

use crate::error::BatchResult;
use crate::model::{
    AttributeQuery, AttributeRecord, ExportDocument, TaskQuery, TaskRecord, TaskUpdate,
    UploadRequest,
};

/// Task registry abstraction.
pub trait TaskRegistry: Send + Sync {
    /// Fetch the task to process.
    ///
    /// An empty answer is `TaskNotFound`, not a transport failure.
    fn fetch_task(&self, query: &TaskQuery) -> BatchResult<TaskRecord>;

    /// Record a status change on the task.
    fn update_task(&self, update: &TaskUpdate) -> BatchResult<()>;
}

/// Facility attribute lookup by spatial id.
pub trait AttributeService: Send + Sync {
    fn fetch_attributes(&self, query: &AttributeQuery) -> BatchResult<Vec<AttributeRecord>>;
}

/// Local result files.
pub trait ArtifactSink: Send + Sync {
    /// Write the result document as JSON.
    fn write_result(&self, document: &ExportDocument, path: &Path) -> BatchResult<()>;

    /// Compress `source` into a single-entry archive at `target`.
    fn compress(&self, source: &Path, target: &Path) -> BatchResult<PathBuf>;

    /// Delete files; a missing file is not an error.
    fn delete(&self, paths: &[&Path]) -> BatchResult<()>;
}

/// Storage upload of the compressed result.
pub trait Uploader: Send + Sync {
    /// Returns the location the archive was stored at.
    fn upload(&self, request: &UploadRequest) -> BatchResult<String>;
}

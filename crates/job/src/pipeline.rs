//! The task pipeline: fetch, transform, persist, upload, report.
//!
//! No branching of its own. Every collaborator failure is already a taxonomy
//! error and is propagated as-is; the retry executor and the flow controller
//! decide what happens next.

use std::sync::Arc;

use chrono::Local;
use tracing::info;

use ufbatch_core::model::{AttributeQuery, ExportDocument, TaskQuery, TaskUpdate, UploadRequest};
use ufbatch_core::{
    ArtifactSink, AttributeService, JobContext, StepError, TaskRegistry, Uploader, flatten_sids,
};
use ufbatch_observability::measure_latency;

/// Collaborators the job runs against.
#[derive(Clone)]
pub struct Collaborators {
    pub registry: Arc<dyn TaskRegistry>,
    pub attributes: Arc<dyn AttributeService>,
    pub artifacts: Arc<dyn ArtifactSink>,
    pub uploader: Arc<dyn Uploader>,
}

pub struct TaskPipeline {
    collaborators: Collaborators,
}

impl TaskPipeline {
    pub fn new(collaborators: Collaborators) -> Self {
        Self { collaborators }
    }

    /// Run once; returns the upload location recorded on the task.
    pub fn run(&self, ctx: &JobContext) -> Result<String, StepError> {
        let c = &self.collaborators;

        let task_id = ctx.task_id()?;

        let task = c.registry.fetch_task(&TaskQuery::for_task(&task_id))?;
        c.registry
            .update_task(&TaskUpdate::in_progress(&task_id, Local::now()))?;

        let flattened = measure_latency("flattenSids", || flatten_sids(&task.request.sid_list))?;

        let query = AttributeQuery::flat_search(&task, flattened);
        let records = measure_latency("callSidAttribute", || c.attributes.fetch_attributes(&query))?;

        let paths = ctx.artifacts().ok_or_else(|| {
            StepError::unclassified(anyhow::anyhow!(
                "no artifact paths derived for task {task_id}"
            ))
        })?;

        let archive = measure_latency("createFile", || {
            c.artifacts
                .write_result(&ExportDocument::from_records(&records), &paths.json)?;
            c.artifacts.compress(&paths.json, &paths.zip)
        })?;

        let location = measure_latency("callFileToS3", || {
            c.uploader.upload(&UploadRequest {
                archive_path: archive,
                task_id: task_id.to_string(),
                servicer_id: task.servicer_id.clone(),
            })
        })?;

        c.registry
            .update_task(&TaskUpdate::complete(&task_id, location.clone()))?;

        info!(
            task_id = %task_id,
            facilities = records.len(),
            location = %location,
            "task exported"
        );
        Ok(location)
    }
}

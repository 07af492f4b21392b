//! Error registration and cleanup steps.

use tracing::{debug, info};

use ufbatch_core::model::TaskUpdate;
use ufbatch_core::{ArtifactSink, BatchResult, JobContext, TaskRegistry};

pub const JOB_NAME: &str = "getUndergroundFacilityJob";
pub const TASK_STEP: &str = "getUndergroundFacilityStep";
pub const REGISTER_GENERIC_ERROR_STEP: &str = "registGenericErrorStep";
pub const REGISTER_EXCLUSIVE_ERROR_STEP: &str = "registExclusiveErrorStep";
pub const DELETE_FILES_STEP: &str = "deleteFilesStep";

/// Mark the task as failed, attaching the detail the classifier left in the
/// context. One call, never retried.
pub fn register_error(registry: &dyn TaskRegistry, ctx: &JobContext) -> BatchResult<()> {
    let task_id = ctx.task_id()?;
    let detail = ctx.registry_detail();
    registry.update_task(&TaskUpdate::error(&task_id, detail))?;
    info!(task_id = %task_id, error_detail = detail, "task marked as failed");
    Ok(())
}

/// Remove the intermediate JSON and ZIP files. Missing files are fine.
pub fn delete_files(artifacts: &dyn ArtifactSink, ctx: &JobContext) -> BatchResult<()> {
    match ctx.artifacts() {
        Some(paths) => artifacts.delete(&[paths.json.as_path(), paths.zip.as_path()]),
        None => {
            debug!("no artifact paths for this run, nothing to delete");
            Ok(())
        }
    }
}

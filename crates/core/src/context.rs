//! Job-scoped state.

use std::path::{Path, PathBuf};

use crate::error::BatchError;
use crate::id::{RunId, TaskId};
use crate::outcome::StepOutcome;
use crate::params::JobParameters;

const FILE_SUFFIX: &str = "_location";
const JSON_EXTENSION: &str = "json";
const ZIP_EXTENSION: &str = "zip";

/// Intermediate files of one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub json: PathBuf,
    pub zip: PathBuf,
}

impl ArtifactPaths {
    pub fn for_task(export_dir: &Path, task_id: &TaskId) -> Self {
        let stem = format!("{task_id}{FILE_SUFFIX}");
        Self {
            json: export_dir.join(format!("{stem}.{JSON_EXTENSION}")),
            zip: export_dir.join(format!("{stem}.{ZIP_EXTENSION}")),
        }
    }
}

/// State of a single job execution.
///
/// Built at job start, owned by the flow controller, dropped at job end.
#[derive(Debug, Clone)]
pub struct JobContext {
    run_id: RunId,
    params: JobParameters,
    artifacts: Option<ArtifactPaths>,
    outcome: Option<StepOutcome>,
}

impl JobContext {
    /// Artifact paths are only derived for a usable task id; without one the
    /// job abends before anything is written.
    pub fn new(params: JobParameters, export_dir: impl AsRef<Path>) -> Self {
        let artifacts = params
            .validate()
            .ok()
            .map(|id| ArtifactPaths::for_task(export_dir.as_ref(), &id));

        Self {
            run_id: RunId::new(),
            params,
            artifacts,
            outcome: None,
        }
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn params(&self) -> &JobParameters {
        &self.params
    }

    pub fn task_id(&self) -> Result<TaskId, BatchError> {
        self.params.validate()
    }

    pub fn artifacts(&self) -> Option<&ArtifactPaths> {
        self.artifacts.as_ref()
    }

    pub fn record_outcome(&mut self, outcome: StepOutcome) {
        self.outcome = Some(outcome);
    }

    pub fn outcome(&self) -> Option<&StepOutcome> {
        self.outcome.as_ref()
    }

    /// Detail left by the classifier; empty when none was recorded.
    pub fn registry_detail(&self) -> &str {
        self.outcome
            .as_ref()
            .and_then(StepOutcome::registry_detail)
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_artifact_paths_from_task_id() {
        let ctx = JobContext::new(JobParameters::new(Some("T-9".into())), "/tmp/export");
        let paths = ctx.artifacts().unwrap();
        assert_eq!(paths.json, PathBuf::from("/tmp/export/T-9_location.json"));
        assert_eq!(paths.zip, PathBuf::from("/tmp/export/T-9_location.zip"));
    }

    #[test]
    fn no_artifacts_without_task_id() {
        let ctx = JobContext::new(JobParameters::default(), "/tmp/export");
        assert!(ctx.artifacts().is_none());
        assert!(ctx.task_id().is_err());
    }

    #[test]
    fn registry_detail_follows_recorded_outcome() {
        let mut ctx = JobContext::new(JobParameters::new(Some("T-9".into())), "/tmp");
        assert_eq!(ctx.registry_detail(), "");

        ctx.record_outcome(StepOutcome::ExclusiveError {
            registry_detail: "DataLocked".into(),
        });
        assert_eq!(ctx.registry_detail(), "DataLocked");

        ctx.record_outcome(StepOutcome::Abend);
        assert_eq!(ctx.registry_detail(), "");
    }
}

//! Output task registry.

use reqwest::{StatusCode, Url};
use reqwest::header::ACCEPT;

use ufbatch_core::error::MSG_INTERNAL_API_ERROR;
use ufbatch_core::model::{TaskList, TaskQuery, TaskRecord, TaskUpdate};
use ufbatch_core::{BatchError, BatchResult, TaskRegistry};

use super::{CommonApi, is_error_status, read_error};

const TASK_ID_PLACEHOLDER: &str = "{taskId}";

impl CommonApi {
    /// Update URL for one task. The id fills the `{taskId}` segment and is
    /// percent-encoded as a single path segment.
    fn task_url(&self, task_id: &str) -> BatchResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| BatchError::task_registry(format!("invalid base url: {e}")))?;

        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                BatchError::task_registry(format!("{} cannot carry a path", self.base_url))
            })?;
            segments.pop_if_empty();
            for segment in self
                .settings
                .put_output_tasks_path
                .split('/')
                .filter(|s| !s.is_empty())
            {
                if segment == TASK_ID_PLACEHOLDER {
                    segments.push(task_id);
                } else {
                    segments.push(segment);
                }
            }
        }

        Ok(url)
    }
}

impl TaskRegistry for CommonApi {
    fn fetch_task(&self, query: &TaskQuery) -> BatchResult<TaskRecord> {
        let response = self
            .http
            .get(self.url(&self.settings.output_tasks_path))
            .query(query)
            .header(ACCEPT, "application/json")
            .send()
            .map_err(|e| BatchError::task_registry(e.to_string()))?;

        if is_error_status(&response) {
            read_error(response).map_err(BatchError::task_registry)?;
            return Err(BatchError::task_registry(MSG_INTERNAL_API_ERROR));
        }

        let list: TaskList = response
            .json()
            .map_err(|e| BatchError::task_registry(e.to_string()))?;
        list.into_single()
    }

    fn update_task(&self, update: &TaskUpdate) -> BatchResult<()> {
        let response = self
            .http
            .put(self.task_url(&update.task_id)?)
            .header(ACCEPT, "application/json")
            .json(update)
            .send()
            .map_err(|e| BatchError::task_registry(e.to_string()))?;

        if response.status() != StatusCode::NO_CONTENT {
            tracing::debug!(
                task_id = %update.task_id,
                status = response.status().as_u16(),
                "task update not acknowledged"
            );
            return Err(BatchError::task_registry(MSG_INTERNAL_API_ERROR));
        }
        Ok(())
    }
}

//! Job input parameters and their validation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::BatchError;
use crate::id::TaskId;

/// Raw parameters supplied at process start.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobParameters {
    pub task_id: Option<String>,
}

impl JobParameters {
    pub fn new(task_id: Option<String>) -> Self {
        Self { task_id }
    }

    /// Validate before any collaborator is called.
    ///
    /// A missing or empty task id yields `InvalidParameter` naming the field.
    pub fn validate(&self) -> Result<TaskId, BatchError> {
        let mut violations = BTreeMap::new();

        match self.task_id.as_deref() {
            Some(id) if !id.is_empty() => {}
            other => {
                violations.insert("taskId".to_string(), other.map(str::to_string));
            }
        }

        if !violations.is_empty() {
            return Err(BatchError::invalid_parameter(&violations));
        }

        Ok(TaskId::new_unchecked(self.task_id.clone().unwrap_or_default()))
    }

    /// Parameters rendered for the job-start log line.
    pub fn describe(&self) -> String {
        format!("taskId={}", self.task_id.as_deref().unwrap_or("null"))
    }
}

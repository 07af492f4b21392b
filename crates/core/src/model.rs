//! Data exchanged with the collaborators, and the result document.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::BatchError;
use crate::id::TaskId;

/// Process class this batch registers under in the task registry.
pub const PROCESS_CLASS: &str = "01";

/// Format of `taskStartDate` in registry updates.
pub const TASK_START_DATE_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Registry lookup request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQuery {
    pub task_id: String,
    pub process_class: String,
}

impl TaskQuery {
    pub fn for_task(task_id: &TaskId) -> Self {
        Self {
            task_id: task_id.to_string(),
            process_class: PROCESS_CLASS.to_string(),
        }
    }
}

/// Registry lookup response. The registry answers with a list even though the
/// batch asks for a single task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskList {
    #[serde(default)]
    pub task_list: Vec<TaskRecord>,
}

impl TaskList {
    /// First task of the list; an empty list means the id is unknown.
    pub fn into_single(self) -> Result<TaskRecord, BatchError> {
        self.task_list
            .into_iter()
            .next()
            .ok_or_else(BatchError::task_not_found)
    }
}

/// One output task as stored in the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    #[serde(default)]
    pub servicer_id: String,
    #[serde(default)]
    pub request: TaskRequest,
}

/// What the task asks the batch to export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRequest {
    #[serde(default)]
    pub sid_list: Vec<String>,
    #[serde(default)]
    pub infra_company_id_list: Vec<String>,
    #[serde(default)]
    pub return_zoom_level: Option<i32>,
    #[serde(default)]
    pub update_date: Option<String>,
}

/// Status codes understood by the task registry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    InProgress,
    Complete,
    Error,
}

impl TaskStatus {
    pub fn code(&self) -> &'static str {
        match self {
            TaskStatus::InProgress => "1",
            TaskStatus::Complete => "2",
            TaskStatus::Error => "9",
        }
    }
}

impl Serialize for TaskStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

/// Registry status update. `task_id` goes into the request path, not the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    #[serde(skip)]
    pub task_id: String,
    pub task_status: TaskStatus,
    pub file_url: Option<String>,
    pub task_start_date: Option<String>,
    pub error_detail: Option<String>,
}

impl TaskUpdate {
    fn new(task_id: &TaskId, task_status: TaskStatus) -> Self {
        Self {
            task_id: task_id.to_string(),
            task_status,
            file_url: None,
            task_start_date: None,
            error_detail: None,
        }
    }

    pub fn in_progress(task_id: &TaskId, started_at: DateTime<Local>) -> Self {
        Self {
            task_start_date: Some(started_at.format(TASK_START_DATE_FORMAT).to_string()),
            ..Self::new(task_id, TaskStatus::InProgress)
        }
    }

    pub fn complete(task_id: &TaskId, file_url: impl Into<String>) -> Self {
        Self {
            file_url: Some(file_url.into()),
            ..Self::new(task_id, TaskStatus::Complete)
        }
    }

    pub fn error(task_id: &TaskId, error_detail: impl Into<String>) -> Self {
        Self {
            error_detail: Some(error_detail.into()),
            ..Self::new(task_id, TaskStatus::Error)
        }
    }
}

/// Attribute service request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeQuery {
    pub sid_list: Vec<String>,
    pub is_flat_search: bool,
    pub servicer_id: String,
    pub infra_company_id_list: Vec<String>,
    pub update_time: Option<String>,
    pub return_zoom_level: Option<i32>,
    pub is_batch_process: bool,
}

impl AttributeQuery {
    /// Flat, batch-originated search for the given (already flattened) ids.
    pub fn flat_search(task: &TaskRecord, flattened_sids: Vec<String>) -> Self {
        Self {
            sid_list: flattened_sids,
            is_flat_search: true,
            servicer_id: task.servicer_id.clone(),
            infra_company_id_list: task.request.infra_company_id_list.clone(),
            update_time: task.request.update_date.clone(),
            return_zoom_level: task.request.return_zoom_level,
            is_batch_process: true,
        }
    }
}

/// Attribute service response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeList {
    #[serde(default)]
    pub sid_attribute_list: Vec<AttributeRecord>,
}

/// One facility with the spatial ids it occupies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeRecord {
    #[serde(default)]
    pub infra_company_id: Option<String>,
    #[serde(default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub object_id: Option<String>,
    #[serde(default)]
    pub facility_classification_name: Option<String>,
    #[serde(
        default,
        deserialize_with = "facility_attribute::deserialize",
        serialize_with = "facility_attribute::serialize"
    )]
    pub facility_attribute: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub sid_list: Vec<String>,
}

/// Error body returned by every collaborator API on a non-2xx status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

/// Upload request for the compressed result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub archive_path: PathBuf,
    pub task_id: String,
    pub servicer_id: String,
}

/// Result file written by the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportDocument {
    #[serde(rename = "isFacilityExist")]
    pub is_facility_exist: bool,
    #[serde(rename = "facilitySidList")]
    pub facility_sid_list: Vec<FacilityEntry>,
}

impl ExportDocument {
    pub fn from_records(records: &[AttributeRecord]) -> Self {
        Self {
            is_facility_exist: !records.is_empty(),
            facility_sid_list: records.iter().map(FacilityEntry::from).collect(),
        }
    }
}

/// Facility entry of the result file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityEntry {
    pub infra_company_id: Option<String>,
    pub data_type: Option<String>,
    pub object_id: Option<String>,
    pub object_name: Option<String>,
    #[serde(serialize_with = "facility_attribute::serialize")]
    pub facility_attribute: Option<BTreeMap<String, String>>,
    pub sid_list: Vec<String>,
}

impl From<&AttributeRecord> for FacilityEntry {
    fn from(source: &AttributeRecord) -> Self {
        Self {
            infra_company_id: source.infra_company_id.clone(),
            data_type: source.data_type.clone(),
            object_id: source.object_id.clone(),
            object_name: source.facility_classification_name.clone(),
            facility_attribute: source.facility_attribute.clone(),
            sid_list: source.sid_list.clone(),
        }
    }
}

/// The attribute service sends facility attributes either as an object or as
/// `""` when there are none; the result file mirrors that convention.
mod facility_attribute {
    use std::collections::BTreeMap;

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<BTreeMap<String, String>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(None),
            Value::String(s) if s.is_empty() => Ok(None),
            Value::Object(map) => Ok(Some(
                map.into_iter()
                    .map(|(k, v)| {
                        let v = match v {
                            Value::String(s) => s,
                            other => other.to_string(),
                        };
                        (k, v)
                    })
                    .collect(),
            )),
            other => Err(D::Error::custom(format!(
                "facilityAttribute must be an object or an empty string, got {other}"
            ))),
        }
    }

    pub fn serialize<S>(value: &Option<BTreeMap<String, String>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(map) => serializer.collect_map(map),
            None => serializer.serialize_str(""),
        }
    }
}

//! Batch error taxonomy.
//!
//! Every failure the task pipeline can raise is one of the [`BatchError`]
//! causes below. Each cause sits on two fixed axes:
//!
//! - [`RetryClass`]: whether the retry executor may re-run the operation
//! - [`Severity`]: whether the failure is a contention/out-of-range condition on
//!   the remote resource (`Exclusive`) or anything else (`Generic`)
//!
//! Both axes are derived by exhaustive `match`, so a new cause does not compile
//! until it has been placed on both.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// Registry detail used when an internal step fails for a reason the caller
/// should not see verbatim.
pub const MSG_INTERNAL_ERROR: &str = "An error occurred during internal processing.";

/// Log detail used when a collaborator API answers with an error status.
pub const MSG_INTERNAL_API_ERROR: &str = "An error occurred while calling an internal API.";

/// Log detail for a task id unknown to the registry.
pub const MSG_TASK_NOT_FOUND: &str = "The specified task ID does not exist.";

/// Log detail for a locked attribute resource.
pub const MSG_DATA_LOCKED: &str = "Facility data is being updated";

/// Log detail for an attribute request outside the maintained data range.
pub const MSG_DATA_OUT_OF_RANGE: &str = "Outside the data coverage range";

/// Result type used by collaborators and the task pipeline.
pub type BatchResult<T> = Result<T, BatchError>;

/// Retry axis of the taxonomy.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RetryClass {
    Retryable,
    NonRetryable,
}

/// Severity axis of the taxonomy.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Severity {
    Generic,
    Exclusive,
}

/// The two diagnostic strings every taxonomy error carries.
///
/// `registry` may be empty, which explicitly means "nothing to attach to the
/// task record".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorDetail {
    pub log: String,
    pub registry: String,
}

impl ErrorDetail {
    pub fn new(log: impl Into<String>, registry: impl Into<String>) -> Self {
        Self {
            log: log.into(),
            registry: registry.into(),
        }
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.log)
    }
}

/// Closed set of batch failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BatchError {
    /// Writing or compressing the result file failed.
    #[error("file processing failed: {0}")]
    FileProcessing(ErrorDetail),

    /// Uploading the archive failed.
    #[error("upload failed: {0}")]
    Upload(ErrorDetail),

    /// The attribute lookup failed for a reason other than lock/range.
    #[error("attribute lookup failed: {0}")]
    AttributeLookup(ErrorDetail),

    /// Reading or updating the task registry failed.
    #[error("task registry call failed: {0}")]
    TaskRegistry(ErrorDetail),

    /// The attribute resource is locked by a concurrent update.
    #[error("attribute data locked: {0}")]
    AttributeLocked(ErrorDetail),

    /// A file operation failed in a way that will not heal on retry.
    #[error("file processing failed (fatal): {0}")]
    FileProcessingFatal(ErrorDetail),

    /// The registry has no task for the requested id.
    #[error("task not found: {0}")]
    TaskNotFound(ErrorDetail),

    /// Job parameters failed validation.
    #[error("invalid parameter: {0}")]
    InvalidParameter(ErrorDetail),

    /// The attribute request is outside the maintained data range.
    #[error("attribute data out of range: {0}")]
    AttributeOutOfRange(ErrorDetail),
}

impl BatchError {
    pub fn file_processing(log: impl Into<String>) -> Self {
        Self::FileProcessing(ErrorDetail::new(log, MSG_INTERNAL_ERROR))
    }

    pub fn upload(log: impl Into<String>) -> Self {
        Self::Upload(ErrorDetail::new(log, MSG_INTERNAL_ERROR))
    }

    pub fn attribute_lookup(log: impl Into<String>) -> Self {
        Self::AttributeLookup(ErrorDetail::new(log, MSG_INTERNAL_ERROR))
    }

    pub fn task_registry(log: impl Into<String>) -> Self {
        Self::TaskRegistry(ErrorDetail::new(log, ""))
    }

    /// `remote_message` is the error text returned by the attribute service; it
    /// is what gets recorded on the task.
    pub fn attribute_locked(remote_message: impl Into<String>) -> Self {
        Self::AttributeLocked(ErrorDetail::new(MSG_DATA_LOCKED, remote_message))
    }

    pub fn file_processing_fatal(log: impl Into<String>) -> Self {
        Self::FileProcessingFatal(ErrorDetail::new(log, ""))
    }

    pub fn task_not_found() -> Self {
        Self::TaskNotFound(ErrorDetail::new(MSG_TASK_NOT_FOUND, ""))
    }

    /// Build a validation failure from the offending field names and values.
    ///
    /// A `None` value is rendered as `null`.
    pub fn invalid_parameter(violations: &BTreeMap<String, Option<String>>) -> Self {
        let keys = violations
            .keys()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(",");
        let fields = violations
            .iter()
            .map(|(k, v)| format!("{}={}", k, v.as_deref().unwrap_or("null")))
            .collect::<Vec<_>>()
            .join(",");

        Self::InvalidParameter(ErrorDetail::new(
            format!("Parameter: {keys} is invalid. [{fields}]"),
            "",
        ))
    }

    pub fn attribute_out_of_range(remote_message: impl Into<String>) -> Self {
        Self::AttributeOutOfRange(ErrorDetail::new(MSG_DATA_OUT_OF_RANGE, remote_message))
    }

    pub fn detail(&self) -> &ErrorDetail {
        match self {
            BatchError::FileProcessing(d)
            | BatchError::Upload(d)
            | BatchError::AttributeLookup(d)
            | BatchError::TaskRegistry(d)
            | BatchError::AttributeLocked(d)
            | BatchError::FileProcessingFatal(d)
            | BatchError::TaskNotFound(d)
            | BatchError::InvalidParameter(d)
            | BatchError::AttributeOutOfRange(d) => d,
        }
    }

    /// Human-diagnostic text, always logged.
    pub fn log_detail(&self) -> &str {
        &self.detail().log
    }

    /// Text attached to the task record on an error-registration path.
    pub fn registry_detail(&self) -> &str {
        &self.detail().registry
    }

    pub fn retry_class(&self) -> RetryClass {
        match self {
            BatchError::FileProcessing(_)
            | BatchError::Upload(_)
            | BatchError::AttributeLookup(_)
            | BatchError::TaskRegistry(_)
            | BatchError::AttributeLocked(_) => RetryClass::Retryable,
            BatchError::FileProcessingFatal(_)
            | BatchError::TaskNotFound(_)
            | BatchError::InvalidParameter(_)
            | BatchError::AttributeOutOfRange(_) => RetryClass::NonRetryable,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            BatchError::AttributeLocked(_) | BatchError::AttributeOutOfRange(_) => {
                Severity::Exclusive
            }
            BatchError::FileProcessing(_)
            | BatchError::Upload(_)
            | BatchError::AttributeLookup(_)
            | BatchError::TaskRegistry(_)
            | BatchError::FileProcessingFatal(_)
            | BatchError::TaskNotFound(_)
            | BatchError::InvalidParameter(_) => Severity::Generic,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.retry_class() == RetryClass::Retryable
    }
}

/// Failure of a job step: a taxonomy error, or anything else.
///
/// `Unclassified` is the fail-closed channel for failures that never went
/// through the taxonomy (including panics caught at the step boundary). It is
/// never retried and always ends the job as an abend.
#[derive(Debug, Error)]
pub enum StepError {
    #[error(transparent)]
    Batch(#[from] BatchError),

    #[error("unclassified failure: {0:#}")]
    Unclassified(anyhow::Error),
}

impl StepError {
    pub fn unclassified(err: impl Into<anyhow::Error>) -> Self {
        Self::Unclassified(err.into())
    }

    pub fn as_batch(&self) -> Option<&BatchError> {
        match self {
            StepError::Batch(e) => Some(e),
            StepError::Unclassified(_) => None,
        }
    }

    /// Only taxonomy errors of the retryable class qualify.
    pub fn is_retryable(&self) -> bool {
        self.as_batch().is_some_and(BatchError::is_retryable)
    }
}

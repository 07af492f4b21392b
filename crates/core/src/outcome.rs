//! Step outcomes and the two classifiers that read the error taxonomy.

use serde::Serialize;

use crate::error::{BatchError, Severity, StepError};

/// Exit signal of the task step.
///
/// `Abend` carries nothing; both error outcomes always carry the registry
/// detail of the originating error, possibly empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepOutcome {
    Completed,
    Abend,
    GenericError { registry_detail: String },
    ExclusiveError { registry_detail: String },
}

impl StepOutcome {
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            StepOutcome::Completed => ExitStatus::Completed,
            StepOutcome::Abend => ExitStatus::Abend,
            StepOutcome::GenericError { .. } => ExitStatus::GenericError,
            StepOutcome::ExclusiveError { .. } => ExitStatus::ExclusiveError,
        }
    }

    pub fn registry_detail(&self) -> Option<&str> {
        match self {
            StepOutcome::GenericError { registry_detail }
            | StepOutcome::ExclusiveError { registry_detail } => Some(registry_detail),
            StepOutcome::Completed | StepOutcome::Abend => None,
        }
    }
}

/// Payload-free view of [`StepOutcome`], as reported in logs.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum ExitStatus {
    Completed,
    Abend,
    GenericError,
    ExclusiveError,
}

impl ExitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitStatus::Completed => "COMPLETED",
            ExitStatus::Abend => "abendError",
            ExitStatus::GenericError => "genericError",
            ExitStatus::ExclusiveError => "exclusiveError",
        }
    }
}

impl core::fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a terminal step failure to the branch the flow takes.
pub fn classify(error: &StepError) -> StepOutcome {
    match error {
        StepError::Batch(e) => classify_batch(e),
        StepError::Unclassified(_) => StepOutcome::Abend,
    }
}

fn classify_batch(error: &BatchError) -> StepOutcome {
    let registry_detail = error.registry_detail().to_string();
    match error {
        BatchError::FileProcessing(_)
        | BatchError::Upload(_)
        | BatchError::AttributeLookup(_)
        | BatchError::TaskRegistry(_) => StepOutcome::GenericError { registry_detail },
        BatchError::AttributeLocked(_) | BatchError::AttributeOutOfRange(_) => {
            StepOutcome::ExclusiveError { registry_detail }
        }
        BatchError::FileProcessingFatal(_)
        | BatchError::TaskNotFound(_)
        | BatchError::InvalidParameter(_) => StepOutcome::Abend,
    }
}

/// Level a step failure is logged at.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Warn,
    Error,
}

/// Log line for a step failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRoute {
    pub level: LogLevel,
    pub message: String,
}

/// Decide how loudly a step failure is logged.
///
/// Independent of [`classify`]: exclusive causes are expected contention and
/// log at warn even when they end the job.
pub fn log_route(error: &StepError) -> LogRoute {
    match error {
        StepError::Batch(e) => LogRoute {
            level: match e.severity() {
                Severity::Exclusive => LogLevel::Warn,
                Severity::Generic => LogLevel::Error,
            },
            message: e.log_detail().to_string(),
        },
        StepError::Unclassified(e) => LogRoute {
            level: LogLevel::Error,
            message: format!("{e:#}"),
        },
    }
}

//! `ufbatch-core`: domain building blocks of the underground facility export batch.
//!
//! This crate contains **pure** types and decisions (no I/O): the error
//! taxonomy, outcome classification, identifier flattening, job-scoped context
//! and the collaborator ports.

pub mod context;
pub mod error;
pub mod id;
pub mod model;
pub mod outcome;
pub mod params;
pub mod ports;

pub use context::{ArtifactPaths, JobContext};
pub use error::{BatchError, BatchResult, ErrorDetail, RetryClass, Severity, StepError};
pub use id::{RunId, TaskId, flatten_sid, flatten_sids};
pub use outcome::{ExitStatus, LogLevel, LogRoute, StepOutcome, classify, log_route};
pub use params::JobParameters;
pub use ports::{ArtifactSink, AttributeService, TaskRegistry, Uploader};

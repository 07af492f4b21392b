//! The underground facility export job.
//!
//! [`FlowController`] drives the steps; [`TaskPipeline`] is the retried unit
//! of work inside the task step.

pub mod flow;
pub mod pipeline;
pub mod steps;

pub use flow::{FlowController, FlowState, JobReport, JobStatus, Signal};
pub use pipeline::{Collaborators, TaskPipeline};

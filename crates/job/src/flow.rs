//! Flow controller: an explicit state machine over the job steps.
//!
//! ```text
//! Start -> Task --Completed------------------------------> Cleanup -> End
//!               --GenericError---> RegisterGenericError ---> Cleanup -> End(Failed)
//!               --ExclusiveError-> RegisterExclusiveError -> Cleanup -> End(Failed)
//!               --Abend----------------------------------------------> End(Failed)
//! ```
//!
//! Abend is the only path that skips both registration and cleanup. Every
//! other path reaches cleanup exactly once.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use tracing::{error, info, info_span};

use ufbatch_core::{ExitStatus, JobContext, StepError, StepOutcome, classify};
use ufbatch_infra::jobs::{RetryExecutor, Sleeper, ThreadSleeper};
use ufbatch_observability::JobListener;

use crate::pipeline::{Collaborators, TaskPipeline};
use crate::steps::{
    DELETE_FILES_STEP, JOB_NAME, REGISTER_EXCLUSIVE_ERROR_STEP, REGISTER_GENERIC_ERROR_STEP,
    TASK_STEP, delete_files, register_error,
};

/// Terminal status of the job.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Completed,
    Failed,
}

impl JobStatus {
    pub fn exit_code(&self) -> u8 {
        match self {
            JobStatus::Completed => 0,
            JobStatus::Failed => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FlowState {
    Start,
    Task,
    RegisterGenericError,
    RegisterExclusiveError,
    /// `upstream` is the status the job ends with if cleanup succeeds.
    Cleanup { upstream: JobStatus },
    End(JobStatus),
}

/// What the step that just ran reports back.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Signal {
    Started,
    TaskFinished(ExitStatus),
    /// Registration ran; success or failure of the reporting call is irrelevant.
    Registered,
    Cleaned,
    CleanupFailed,
}

impl FlowState {
    /// Transition function. Any pairing not in the table fails closed.
    pub fn next(self, signal: Signal) -> FlowState {
        use FlowState::*;

        match (self, signal) {
            (Start, Signal::Started) => Task,
            (Task, Signal::TaskFinished(ExitStatus::Completed)) => Cleanup {
                upstream: JobStatus::Completed,
            },
            (Task, Signal::TaskFinished(ExitStatus::Abend)) => End(JobStatus::Failed),
            (Task, Signal::TaskFinished(ExitStatus::GenericError)) => RegisterGenericError,
            (Task, Signal::TaskFinished(ExitStatus::ExclusiveError)) => RegisterExclusiveError,
            (RegisterGenericError | RegisterExclusiveError, Signal::Registered) => Cleanup {
                upstream: JobStatus::Failed,
            },
            (Cleanup { upstream }, Signal::Cleaned) => End(upstream),
            (Cleanup { .. }, Signal::CleanupFailed) => End(JobStatus::Failed),
            (End(status), _) => End(status),
            (state, signal) => {
                error!(?state, ?signal, "unexpected flow transition");
                End(JobStatus::Failed)
            }
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, FlowState::End(_))
    }
}

/// Summary of one job execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub status: JobStatus,
    /// Outcome of the task step (the branch taken).
    pub outcome: StepOutcome,
    /// Steps in the order they ran.
    pub steps: Vec<&'static str>,
    pub elapsed: Duration,
}

pub struct FlowController<S: Sleeper = ThreadSleeper> {
    collaborators: Collaborators,
    pipeline: TaskPipeline,
    executor: RetryExecutor<S>,
}

impl<S: Sleeper> FlowController<S> {
    pub fn new(collaborators: Collaborators, executor: RetryExecutor<S>) -> Self {
        Self {
            pipeline: TaskPipeline::new(collaborators.clone()),
            collaborators,
            executor: executor.with_name(TASK_STEP),
        }
    }

    /// Run the job to a terminal state.
    pub fn run(&self, ctx: &mut JobContext) -> JobReport {
        let span = info_span!("job", job = JOB_NAME, run_id = %ctx.run_id());
        let _guard = span.enter();

        let mut listener = JobListener::new(JOB_NAME);
        listener.before_job(ctx.run_id(), &ctx.params().describe());

        let mut steps = Vec::new();
        let mut outcome = StepOutcome::Abend;
        let mut state = FlowState::Start.next(Signal::Started);

        while !state.is_terminal() {
            let signal = match state {
                FlowState::Task => {
                    steps.push(TASK_STEP);
                    outcome = self.run_task(ctx, &listener);
                    ctx.record_outcome(outcome.clone());
                    Signal::TaskFinished(outcome.exit_status())
                }
                FlowState::RegisterGenericError => {
                    steps.push(REGISTER_GENERIC_ERROR_STEP);
                    self.run_registration(REGISTER_GENERIC_ERROR_STEP, ctx, &listener)
                }
                FlowState::RegisterExclusiveError => {
                    steps.push(REGISTER_EXCLUSIVE_ERROR_STEP);
                    self.run_registration(REGISTER_EXCLUSIVE_ERROR_STEP, ctx, &listener)
                }
                FlowState::Cleanup { .. } => {
                    steps.push(DELETE_FILES_STEP);
                    self.run_cleanup(ctx, &listener)
                }
                FlowState::Start | FlowState::End(_) => Signal::Started,
            };
            state = state.next(signal);
        }

        let status = match state {
            FlowState::End(status) => status,
            _ => JobStatus::Failed,
        };
        let elapsed = listener.after_job(status.as_str());

        JobReport {
            status,
            outcome,
            steps,
            elapsed,
        }
    }

    /// Task step under the retry executor. A panic anywhere inside is an
    /// unclassified failure.
    fn run_task(&self, ctx: &JobContext, listener: &JobListener) -> StepOutcome {
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.executor.execute(|| self.pipeline.run(ctx))
        }))
        .unwrap_or_else(|payload| {
            Err(StepError::unclassified(anyhow::anyhow!(
                "task step panicked: {}",
                panic_message(payload.as_ref())
            )))
        });

        match result {
            Ok(location) => {
                info!(step = TASK_STEP, location = %location, "step completed");
                StepOutcome::Completed
            }
            Err(err) => {
                listener.after_step_failed(TASK_STEP, &err);
                let outcome = classify(&err);
                info!(
                    step = TASK_STEP,
                    exit_status = %outcome.exit_status(),
                    "step failed"
                );
                outcome
            }
        }
    }

    fn run_registration(
        &self,
        step: &'static str,
        ctx: &JobContext,
        listener: &JobListener,
    ) -> Signal {
        if let Err(err) = register_error(self.collaborators.registry.as_ref(), ctx) {
            listener.after_step_failed(step, &err.into());
        }
        Signal::Registered
    }

    fn run_cleanup(&self, ctx: &JobContext, listener: &JobListener) -> Signal {
        match delete_files(self.collaborators.artifacts.as_ref(), ctx) {
            Ok(()) => Signal::Cleaned,
            Err(err) => {
                listener.after_step_failed(DELETE_FILES_STEP, &err.into());
                Signal::CleanupFailed
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_task_goes_to_cleanup_then_completes() {
        let s = FlowState::Start.next(Signal::Started);
        assert_eq!(s, FlowState::Task);
        let s = s.next(Signal::TaskFinished(ExitStatus::Completed));
        assert_eq!(
            s,
            FlowState::Cleanup {
                upstream: JobStatus::Completed
            }
        );
        assert_eq!(s.next(Signal::Cleaned), FlowState::End(JobStatus::Completed));
    }

    #[test]
    fn abend_ends_without_cleanup() {
        assert_eq!(
            FlowState::Task.next(Signal::TaskFinished(ExitStatus::Abend)),
            FlowState::End(JobStatus::Failed)
        );
    }

    #[test]
    fn error_branches_register_then_clean_up_and_fail() {
        for (exit, register) in [
            (ExitStatus::GenericError, FlowState::RegisterGenericError),
            (ExitStatus::ExclusiveError, FlowState::RegisterExclusiveError),
        ] {
            let s = FlowState::Task.next(Signal::TaskFinished(exit));
            assert_eq!(s, register);
            let s = s.next(Signal::Registered);
            assert_eq!(
                s,
                FlowState::Cleanup {
                    upstream: JobStatus::Failed
                }
            );
            assert_eq!(s.next(Signal::Cleaned), FlowState::End(JobStatus::Failed));
        }
    }

    #[test]
    fn cleanup_failure_fails_a_completed_job() {
        let s = FlowState::Cleanup {
            upstream: JobStatus::Completed,
        };
        assert_eq!(s.next(Signal::CleanupFailed), FlowState::End(JobStatus::Failed));
    }

    #[test]
    fn unexpected_signal_fails_closed() {
        assert_eq!(
            FlowState::Task.next(Signal::Cleaned),
            FlowState::End(JobStatus::Failed)
        );
        assert_eq!(
            FlowState::End(JobStatus::Completed).next(Signal::CleanupFailed),
            FlowState::End(JobStatus::Completed)
        );
    }

    #[test]
    fn exit_codes() {
        assert_eq!(JobStatus::Completed.exit_code(), 0);
        assert_eq!(JobStatus::Failed.exit_code(), 1);
    }

    #[test]
    fn panic_messages_are_extracted() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}

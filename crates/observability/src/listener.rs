//! Job and step lifecycle logging.

use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use ufbatch_core::{LogLevel, RunId, StepError, log_route};

/// Name the batch announces itself with at boot.
pub const PROJECT_NAME: &str = "ufbatch";

/// Emits the lifecycle log lines of one job execution.
#[derive(Debug)]
pub struct JobListener {
    job_name: String,
    started: Option<Instant>,
}

impl JobListener {
    pub fn new(job_name: impl Into<String>) -> Self {
        Self {
            job_name: job_name.into(),
            started: None,
        }
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    pub fn on_boot(&self) {
        info!("{PROJECT_NAME} started");
    }

    pub fn before_job(&mut self, run_id: RunId, parameters: &str) {
        self.started = Some(Instant::now());
        info!(
            job = %self.job_name,
            run_id = %run_id,
            "job {} started with parameters [{parameters}]",
            self.job_name
        );
    }

    /// Log a failed step. Exclusive causes are warnings, everything else an
    /// error.
    pub fn after_step_failed(&self, step: &str, failure: &StepError) {
        let route = log_route(failure);
        match route.level {
            LogLevel::Warn => warn!(step, error = %failure, "{}", route.message),
            LogLevel::Error => error!(step, error = %failure, "{}", route.message),
        }
    }

    /// Log job completion; returns the elapsed time since [`before_job`].
    ///
    /// [`before_job`]: JobListener::before_job
    pub fn after_job(&self, status: &str) -> Duration {
        let elapsed = self.started.map(|s| s.elapsed()).unwrap_or_default();
        info!(
            job = %self.job_name,
            status,
            elapsed_ms = elapsed.as_millis() as u64,
            "job {} finished in {} ms",
            self.job_name,
            elapsed.as_millis()
        );
        elapsed
    }
}

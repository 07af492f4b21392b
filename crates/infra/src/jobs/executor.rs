//! Bounded retry executor.

use tracing::{debug, warn};

use ufbatch_core::StepError;

use super::types::{RetryPolicy, Sleeper, ThreadSleeper};

/// Runs an operation, re-invoking it on retryable failures.
///
/// - success returns immediately
/// - a non-retryable or unclassified failure is returned after one invocation
/// - a retryable failure is retried until `max_attempts` invocations have been
///   made, waiting the policy's backoff in between; the last failure is returned
pub struct RetryExecutor<S: Sleeper = ThreadSleeper> {
    name: String,
    policy: RetryPolicy,
    sleeper: S,
}

impl RetryExecutor<ThreadSleeper> {
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_sleeper(policy, ThreadSleeper)
    }
}

impl<S: Sleeper> RetryExecutor<S> {
    pub fn with_sleeper(policy: RetryPolicy, sleeper: S) -> Self {
        Self {
            name: "retry-executor".to_string(),
            policy,
            sleeper,
        }
    }

    /// Name used in log lines.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn execute<T, F>(&self, mut operation: F) -> Result<T, StepError>
    where
        F: FnMut() -> Result<T, StepError>,
    {
        let mut failed_attempts: u32 = 0;

        loop {
            match operation() {
                Ok(value) => {
                    if failed_attempts > 0 {
                        debug!(
                            executor = %self.name,
                            attempt = failed_attempts + 1,
                            "operation succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(err) if !err.is_retryable() => {
                    debug!(executor = %self.name, error = %err, "non-retryable failure");
                    return Err(err);
                }
                Err(err) => {
                    failed_attempts += 1;

                    if !self.policy.should_retry(failed_attempts) {
                        warn!(
                            executor = %self.name,
                            attempts = failed_attempts,
                            error = %err,
                            "retries exhausted"
                        );
                        return Err(err);
                    }

                    let delay = self.policy.delay_for_attempt(failed_attempts);
                    warn!(
                        executor = %self.name,
                        attempt = failed_attempts,
                        max_attempts = self.policy.max_attempts,
                        ?delay,
                        error = %err,
                        "retryable failure, backing off"
                    );
                    self.sleeper.sleep(delay);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use ufbatch_core::BatchError;

    #[derive(Default)]
    struct RecordingSleeper {
        waits: Mutex<Vec<Duration>>,
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) {
            self.waits.lock().unwrap().push(duration);
        }
    }

    fn executor() -> (RetryExecutor<Arc<RecordingSleeper>>, Arc<RecordingSleeper>) {
        let sleeper = Arc::new(RecordingSleeper::default());
        (
            RetryExecutor::with_sleeper(RetryPolicy::default(), sleeper.clone()),
            sleeper,
        )
    }

    #[test]
    fn success_is_returned_without_waiting() {
        let (executor, sleeper) = executor();
        let calls = Cell::new(0);

        let out = executor.execute(|| {
            calls.set(calls.get() + 1);
            Ok::<_, StepError>(42)
        });

        assert_eq!(out.unwrap(), 42);
        assert_eq!(calls.get(), 1);
        assert!(sleeper.waits.lock().unwrap().is_empty());
    }

    #[test]
    fn retryable_failure_runs_max_attempts_times() {
        let (executor, sleeper) = executor();
        let calls = Cell::new(0);

        let err = executor
            .execute(|| -> Result<(), StepError> {
                calls.set(calls.get() + 1);
                Err(BatchError::upload(format!("reset #{}", calls.get())).into())
            })
            .unwrap_err();

        assert_eq!(calls.get(), 3);
        assert_eq!(
            *sleeper.waits.lock().unwrap(),
            vec![Duration::from_millis(60_000); 2]
        );
        // the last failure is the one surfaced
        assert_eq!(err.as_batch().unwrap().log_detail(), "reset #3");
    }

    #[test]
    fn non_retryable_failure_runs_once() {
        let (executor, sleeper) = executor();
        let calls = Cell::new(0);

        let err = executor
            .execute(|| -> Result<(), StepError> {
                calls.set(calls.get() + 1);
                Err(BatchError::attribute_out_of_range("InvalidDataRange").into())
            })
            .unwrap_err();

        assert_eq!(calls.get(), 1);
        assert!(sleeper.waits.lock().unwrap().is_empty());
        assert!(matches!(
            err.as_batch(),
            Some(BatchError::AttributeOutOfRange(_))
        ));
    }

    #[test]
    fn unclassified_failure_runs_once() {
        let (executor, _) = executor();
        let calls = Cell::new(0);

        let err = executor
            .execute(|| -> Result<(), StepError> {
                calls.set(calls.get() + 1);
                Err(StepError::unclassified(anyhow::anyhow!("unexpected")))
            })
            .unwrap_err();

        assert_eq!(calls.get(), 1);
        assert!(err.as_batch().is_none());
    }

    #[test]
    fn recovers_on_last_attempt() {
        let (executor, sleeper) = executor();
        let calls = Cell::new(0);

        let out = executor.execute(|| {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(BatchError::attribute_locked("DataLocked").into())
            } else {
                Ok("done")
            }
        });

        assert_eq!(out.unwrap(), "done");
        assert_eq!(calls.get(), 3);
        assert_eq!(sleeper.waits.lock().unwrap().len(), 2);
    }

    #[test]
    fn retryable_then_non_retryable_stops_immediately() {
        let (executor, sleeper) = executor();
        let calls = Cell::new(0);

        let err = executor
            .execute(|| -> Result<(), StepError> {
                calls.set(calls.get() + 1);
                if calls.get() == 1 {
                    Err(BatchError::task_registry("503").into())
                } else {
                    Err(BatchError::task_not_found().into())
                }
            })
            .unwrap_err();

        assert_eq!(calls.get(), 2);
        assert_eq!(sleeper.waits.lock().unwrap().len(), 1);
        assert!(matches!(err.as_batch(), Some(BatchError::TaskNotFound(_))));
    }

    #[test]
    fn backoff_beyond_u64_millis_reaches_the_sleeper_intact() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let executor =
            RetryExecutor::with_sleeper(RetryPolicy::fixed(2, Duration::MAX), sleeper.clone());

        let _ = executor.execute(|| -> Result<(), StepError> {
            Err(BatchError::upload("reset").into())
        });

        assert_eq!(*sleeper.waits.lock().unwrap(), vec![Duration::MAX]);
    }
}

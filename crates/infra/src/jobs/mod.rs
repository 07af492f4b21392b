//! Synchronous retry execution.
//!
//! ## Components
//!
//! - `RetryPolicy`: attempt budget and fixed backoff
//! - `Sleeper`: the blocking wait between attempts (replaceable in tests)
//! - `RetryExecutor`: runs an operation under a policy, retrying only
//!   retryable taxonomy errors

pub mod executor;
pub mod types;

pub use executor::RetryExecutor;
pub use types::{RetryPolicy, Sleeper, ThreadSleeper};

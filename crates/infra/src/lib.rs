//! Infrastructure layer: retry execution, configuration, HTTP collaborators and
//! local artifacts.

pub mod artifacts;
pub mod clients;
pub mod config;
pub mod jobs;

pub use artifacts::LocalArtifactSink;
pub use clients::{ClientError, CommonApi};
pub use config::{ConfigError, Settings};
pub use jobs::{RetryExecutor, RetryPolicy, Sleeper, ThreadSleeper};

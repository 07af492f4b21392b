//! Tracing, lifecycle logging and latency measurement (shared setup).

/// Initialize process-wide observability (tracing/logging).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

pub mod latency;
pub mod listener;

/// Tracing configuration (filters, layers).
pub mod tracing;

pub use latency::measure_latency;
pub use listener::JobListener;

//! Wall-clock latency of a named operation.

use std::time::{Duration, Instant};

/// Run `f` and log how long it took as `"<target> took <ms> ms"`.
///
/// Milliseconds are truncated to one decimal place.
pub fn measure_latency<R>(target: &str, f: impl FnOnce() -> R) -> R {
    let started = Instant::now();
    let result = f();
    let elapsed = started.elapsed();
    tracing::info!(
        target_name = target,
        latency_ms = elapsed.as_secs_f64() * 1_000.0,
        "{target} took {} ms",
        format_latency(elapsed)
    );
    result
}

pub fn format_latency(elapsed: Duration) -> String {
    let tenths = elapsed.as_nanos() / 100_000;
    format!("{}.{}", tenths / 10, tenths % 10)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_to_one_decimal() {
        assert_eq!(format_latency(Duration::from_micros(1_299)), "1.2");
        assert_eq!(format_latency(Duration::from_micros(999)), "0.9");
        assert_eq!(format_latency(Duration::ZERO), "0.0");
        assert_eq!(format_latency(Duration::from_millis(60_000)), "60000.0");
    }

    #[test]
    fn returns_the_wrapped_result() {
        let out: Result<u32, String> = measure_latency("flattenSids", || Ok(7));
        assert_eq!(out, Ok(7));
    }
}

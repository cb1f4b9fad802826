//! Metric recording helpers.
//!
//! Thin wrappers over the `metrics` facade so call sites stay one-liners;
//! the Prometheus recorder is installed in `server::start` and exposed at
//! `/metrics`.

use std::time::Instant;

/// Count a finished request per endpoint and status code.
pub fn record_request(endpoint: &'static str, status: u16) {
    metrics::counter!(
        "riptide_requests_total",
        "endpoint" => endpoint,
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record request duration per endpoint.
pub fn record_duration(endpoint: &'static str, start: Instant) {
    metrics::histogram!("riptide_request_duration_seconds", "endpoint" => endpoint)
        .record(start.elapsed().as_secs_f64());
}

/// A cache lookup answered from a fresh entry.
pub fn record_cache_hit(endpoint: &'static str) {
    metrics::counter!("riptide_cache_hits_total", "endpoint" => endpoint).increment(1);
}

/// A cache lookup that had to wait on a load.
pub fn record_cache_miss(endpoint: &'static str) {
    metrics::counter!("riptide_cache_misses_total", "endpoint" => endpoint).increment(1);
}

/// A reload source failed against its origin.
pub fn record_origin_error() {
    metrics::counter!("riptide_origin_errors_total").increment(1);
}

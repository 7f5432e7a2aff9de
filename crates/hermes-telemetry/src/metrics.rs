//! Metric names and recording helpers.
//!
//! Hermes records through the `metrics` facade only. No exporter is installed
//! here; a host that wants Prometheus (or anything else) installs its own
//! recorder, and until then every call below is a no-op.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `hermes_dispatch_total` | Counter | `operation`, `status` | Dispatched requests |
//! | `hermes_dispatch_duration_seconds` | Histogram | `operation` | Dispatch latency |
//! | `hermes_breaker_transitions_total` | Counter | `state` | Breaker open/close transitions |
//! | `hermes_breaker_rejections_total` | Counter | - | Calls failed fast by an open breaker |
//! | `hermes_client_requests_total` | Counter | `verb`, `status` | Outbound client calls |

use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};

/// Dispatched request counter.
pub const DISPATCH_TOTAL: &str = "hermes_dispatch_total";

/// Dispatch latency histogram.
pub const DISPATCH_DURATION: &str = "hermes_dispatch_duration_seconds";

/// Breaker transition counter.
pub const BREAKER_TRANSITIONS: &str = "hermes_breaker_transitions_total";

/// Breaker fail-fast counter.
pub const BREAKER_REJECTIONS: &str = "hermes_breaker_rejections_total";

/// Outbound client call counter.
pub const CLIENT_REQUESTS: &str = "hermes_client_requests_total";

/// Registers descriptions for all standard metrics with the installed recorder.
pub fn describe_metrics() {
    describe_counter!(DISPATCH_TOTAL, "Total number of dispatched requests");
    describe_histogram!(DISPATCH_DURATION, "Dispatch duration in seconds");
    describe_counter!(
        BREAKER_TRANSITIONS,
        "Circuit breaker transitions by resulting state"
    );
    describe_counter!(
        BREAKER_REJECTIONS,
        "Calls rejected because the circuit breaker was open"
    );
    describe_counter!(CLIENT_REQUESTS, "Outbound client requests by verb and status");
}

/// Records a completed dispatch.
///
/// `operation` is the resolved business method, or `"unresolved"` when the
/// path or verb did not map to one.
pub fn record_dispatch(operation: &str, status_code: u16, duration: Duration) {
    counter!(
        DISPATCH_TOTAL,
        "operation" => operation.to_string(),
        "status" => status_code.to_string()
    )
    .increment(1);

    histogram!(
        DISPATCH_DURATION,
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Records a breaker transition into `state` (`"open"` or `"closed"`).
pub fn record_breaker_transition(state: &'static str) {
    counter!(BREAKER_TRANSITIONS, "state" => state).increment(1);
}

/// Records a call rejected by an open breaker.
pub fn record_breaker_rejection() {
    counter!(BREAKER_REJECTIONS).increment(1);
}

/// Records an outbound client call. `status` is `None` when no response arrived.
pub fn record_client_request(verb: &str, status: Option<u16>) {
    let status = status.map_or_else(|| "error".to_string(), |s| s.to_string());
    counter!(
        CLIENT_REQUESTS,
        "verb" => verb.to_string(),
        "status" => status
    )
    .increment(1);
}

//! Process-wide metric handles.
//!
//! With the `metrics` feature the binary hands a meter to
//! [`init_metric_handles`] once at startup. Without it every recording
//! function compiles to a no-op.

#[cfg(feature = "metrics")]
use opentelemetry::metrics::{Counter, Histogram, Meter, UpDownCounter};
#[cfg(feature = "metrics")]
use std::sync::OnceLock;

#[cfg(feature = "metrics")]
static REQUESTS: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static FETCHES_INFLIGHT: OnceLock<UpDownCounter<i64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static FETCH_ERRORS: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static FETCH_DURATION_MS: OnceLock<Histogram<f64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static BUFFERS_STORED: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static MEMORY_FLUSHES: OnceLock<Counter<u64>> = OnceLock::new();

#[cfg(feature = "metrics")]
pub fn init_metric_handles(meter: Meter) {
    let _ = REQUESTS.set(
        meter
            .u64_counter("requests")
            .with_description("Operations dispatched to the background worker")
            .build(),
    );

    let _ = FETCHES_INFLIGHT.set(
        meter
            .i64_up_down_counter("fetches_inflight")
            .with_description("Network fetches currently registered for cancellation")
            .build(),
    );

    let _ = FETCH_ERRORS.set(
        meter
            .u64_counter("fetch_errors")
            .with_description("Failed or cancelled fetches")
            .build(),
    );

    let _ = FETCH_DURATION_MS.set(
        meter
            .f64_histogram("fetch_duration")
            .with_unit("ms")
            .with_description("Fetch plus conversion duration")
            .build(),
    );

    let _ = BUFFERS_STORED.set(
        meter
            .u64_counter("buffers_stored")
            .with_description("Values committed to the worker store")
            .build(),
    );

    let _ = MEMORY_FLUSHES.set(
        meter
            .u64_counter("memory_flushes")
            .with_description("In-memory layer flushes")
            .build(),
    );
}

#[cfg(feature = "metrics")]
pub fn increment_requests() {
    if let Some(counter) = REQUESTS.get() {
        counter.add(1, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_requests() {}

#[cfg(feature = "metrics")]
pub fn increment_fetches_inflight() {
    if let Some(counter) = FETCHES_INFLIGHT.get() {
        counter.add(1, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_fetches_inflight() {}

#[cfg(feature = "metrics")]
pub fn decrement_fetches_inflight() {
    if let Some(counter) = FETCHES_INFLIGHT.get() {
        counter.add(-1, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn decrement_fetches_inflight() {}

#[cfg(feature = "metrics")]
pub fn increment_fetch_errors() {
    if let Some(counter) = FETCH_ERRORS.get() {
        counter.add(1, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_fetch_errors() {}

#[cfg(feature = "metrics")]
pub fn record_fetch_duration(duration_ms: f64) {
    if let Some(histogram) = FETCH_DURATION_MS.get() {
        histogram.record(duration_ms, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn record_fetch_duration(_duration_ms: f64) {}

#[cfg(feature = "metrics")]
pub fn increment_buffers_stored() {
    if let Some(counter) = BUFFERS_STORED.get() {
        counter.add(1, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_buffers_stored() {}

#[cfg(feature = "metrics")]
pub fn increment_memory_flushes() {
    if let Some(counter) = MEMORY_FLUSHES.get() {
        counter.add(1, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_memory_flushes() {}

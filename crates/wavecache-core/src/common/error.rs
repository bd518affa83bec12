//! Error types for the waveform data plane.
//!
//! This module defines the central `Error` enum shared by every layer of the
//! system, from the result table up to the dispatcher. Errors are `Clone` so a
//! single failure can be fanned out to every caller waiting on the same batch
//! lookup or pending computation.
//!
//! ## Error Classes
//! - Caller-contract errors: `MissingBaseUrl`, `InvalidTimeRange`,
//!   `MissingBuffer`, `MalformedChannelSegment`, `InvalidRequest`.
//! - Lookup misses: `NotFound` (a hard miss from a batched lookup).
//! - Cancellation: `Cancelled`, a distinguished outcome that callers must not
//!   log as a failure.
//! - Internal faults: `InvariantViolation`, `ChannelError`.
//! - Boundary failures: `Network`, `Storage`, `Serialization`.
//! - Lifecycle: `ServiceShutdown`.

/// Rejection reason carried across the thread boundary for cancelled work.
pub const CANCELLATION_REASON: &str = "Request cancelled";

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the waveform data plane.
#[derive(Clone, thiserror::Error, Debug, PartialEq)]
pub enum Error {
    /// The request configuration did not name a base URL.
    #[error("Request configuration is missing a base URL")]
    MissingBaseUrl,

    /// A time window was given with its start after its end.
    #[error("Invalid time range: start {start} is after end {end}")]
    InvalidTimeRange { start: f64, end: f64 },

    /// A batched result table lookup found nothing under `id`.
    #[error("no result found for id {id}")]
    NotFound { id: String },

    /// No sample buffer is stored under the claim check `id`.
    #[error("No waveform buffer stored for claim check {id}")]
    MissingBuffer { id: String },

    /// A channel segment (or one of its data segments) is not in claim check
    /// form.
    #[error("Malformed channel segment: {reason}")]
    MalformedChannelSegment { reason: String },

    /// Internal consistency check failed. Never retried.
    #[error("Internal invariant violated: {context}")]
    InvariantViolation { context: String },

    /// The request was cancelled before it completed.
    #[error("Request cancelled")]
    Cancelled,

    /// The remote waveform service could not be reached or answered with a
    /// failure status.
    #[error("Network error: {context}")]
    Network { context: String },

    /// The durable result store failed.
    #[error("Storage error: {context}")]
    Storage { context: String },

    /// A payload could not be encoded or decoded.
    #[error("Serialization error: {context}")]
    Serialization { context: String },

    /// Internal channel send/receive failure (e.g., closed or full channel).
    #[error("Channel error: {context}")]
    ChannelError { context: String },

    /// The worker is in the process of shutting down.
    #[error("Worker is shutting down")]
    ServiceShutdown,

    /// The request was malformed or exceeded bounds.
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },
}

impl Error {
    /// Returns `true` if this error represents a cancelled request rather than
    /// a failure.
    pub const fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Classifies a rejection reason received from the other side of the thread
/// boundary.
pub fn is_cancellation_reason(reason: &str) -> bool {
    reason == CANCELLATION_REASON
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            context: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_reason_round_trips_through_display() {
        let reason = Error::Cancelled.to_string();
        assert!(is_cancellation_reason(&reason));
        assert!(Error::Cancelled.is_cancellation());
    }

    #[test]
    fn other_errors_are_not_cancellations() {
        let err = Error::Network {
            context: "connection reset".to_string(),
        };
        assert!(!err.is_cancellation());
        assert!(!is_cancellation_reason(&err.to_string()));
    }

    #[test]
    fn not_found_names_the_missing_id() {
        let err = Error::NotFound {
            id: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "no result found for id abc");
    }
}
